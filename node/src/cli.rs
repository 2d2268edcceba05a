//! # CLI Interface
//!
//! Defines the command-line argument structure for `vault-node` using
//! `clap` derive. Every registry command runs once against the data
//! directory's store and prints its result as JSON.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use vault_registry::{Address, VaultId};

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "vault_node=info,vault_registry=info";

/// Operator host for the vault registry.
///
/// Keeps a persistent registry in a data directory and applies governor and
/// trustee operations to it.
#[derive(Parser, Debug)]
#[command(
    name = "vault-node",
    about = "Operator host for the vault registry",
    version,
    propagate_version = true
)]
pub struct VaultNodeCli {
    /// Directory holding `registry.json` and the registry store.
    #[arg(long, short = 'd', global = true, env = "VAULT_DATA_DIR", default_value = ".vault")]
    pub data_dir: PathBuf,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "VAULT_LOG", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "VAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, write the config and an empty registry.
    Init(InitArgs),
    /// Mark an address as a contract account (governor).
    RegisterContract(RegisterContractArgs),
    /// Create a vault for an asset (governor).
    CreateVault(CreateVaultArgs),
    /// Assign the trustee (governor).
    SetTrustee(SetTrusteeArgs),
    /// Overwrite a vault's deposit and withdrawal flags (governor).
    SetStatus(SetStatusArgs),
    /// Deposit into the current vault for an asset (trustee).
    Deposit(DepositArgs),
    /// Withdraw from a specific vault (trustee).
    Withdraw(WithdrawArgs),
    /// Query a vault balance or an asset's aggregate balance.
    Balance(BalanceArgs),
    /// Show a vault's record and property probes.
    Vault(VaultArgs),
    /// Print the event journal.
    Events(EventsArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for `init`.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Governor address, fixed for the registry's lifetime.
    #[arg(long)]
    pub governor: Address,

    /// Addresses to register as contract accounts. Repeatable.
    #[arg(long = "contract")]
    pub contracts: Vec<Address>,
}

/// Arguments for `register-contract`.
#[derive(Parser, Debug)]
pub struct RegisterContractArgs {
    /// Calling identity.
    #[arg(long)]
    pub caller: Address,

    /// Address of the contract account.
    pub address: Address,
}

/// Arguments for `create-vault`.
#[derive(Parser, Debug)]
pub struct CreateVaultArgs {
    /// Calling identity.
    #[arg(long)]
    pub caller: Address,

    /// Asset the vault will hold.
    #[arg(long)]
    pub asset: Address,
}

/// Arguments for `set-trustee`.
#[derive(Parser, Debug)]
pub struct SetTrusteeArgs {
    /// Calling identity.
    #[arg(long)]
    pub caller: Address,

    /// New trustee; must be a registered contract.
    #[arg(long)]
    pub trustee: Address,
}

/// Arguments for `set-status`.
#[derive(Parser, Debug)]
pub struct SetStatusArgs {
    /// Calling identity.
    #[arg(long)]
    pub caller: Address,

    /// Vault to update.
    #[arg(long)]
    pub vault: VaultId,

    /// Whether deposits are accepted.
    #[arg(long, action = clap::ArgAction::Set)]
    pub deposit: bool,

    /// Whether withdrawals are allowed.
    #[arg(long, action = clap::ArgAction::Set)]
    pub withdrawal: bool,
}

/// Arguments for `deposit`.
#[derive(Parser, Debug)]
pub struct DepositArgs {
    /// Trustee forwarding the deposit.
    #[arg(long)]
    pub trustee: Address,

    /// Asset being deposited.
    #[arg(long)]
    pub asset: Address,

    /// Depositor the funds come from.
    #[arg(long)]
    pub from: Address,

    /// Amount in the asset's smallest unit.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for `withdraw`.
#[derive(Parser, Debug)]
pub struct WithdrawArgs {
    /// Trustee forwarding the withdrawal.
    #[arg(long)]
    pub trustee: Address,

    /// Vault to withdraw from.
    #[arg(long)]
    pub vault: VaultId,

    /// Recipient of the funds.
    #[arg(long)]
    pub to: Address,

    /// Amount in the asset's smallest unit.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for `balance`. Exactly one of `--vault` or `--asset`.
#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["vault", "asset"])))]
pub struct BalanceArgs {
    /// Balance of a single vault.
    #[arg(long)]
    pub vault: Option<VaultId>,

    /// Aggregate balance over every vault for an asset.
    #[arg(long)]
    pub asset: Option<Address>,
}

/// Arguments for `vault`.
#[derive(Parser, Debug)]
pub struct VaultArgs {
    /// Vault id to inspect.
    pub id: VaultId,
}

/// Arguments for `events`.
#[derive(Parser, Debug)]
pub struct EventsArgs {
    /// First sequence number to print.
    #[arg(long, default_value_t = 0)]
    pub since: u64,
}

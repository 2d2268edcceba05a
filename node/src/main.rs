// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Registry Node
//!
//! Entry point for the `vault-node` binary. Parses CLI arguments, initializes
//! logging, loads the registry from its data directory, applies one
//! operation, persists it on success, and prints the result as JSON.

mod cli;
mod host;
mod logging;

use anyhow::{bail, Result};
use clap::Parser;
use serde_json::{json, Value};

use vault_registry::{RegistryConfig, Trustee};

use cli::{Commands, VaultNodeCli};
use host::{rejected, Host};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = VaultNodeCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    let data_dir = cli.data_dir;
    match cli.command {
        Commands::Init(args) => {
            let config = RegistryConfig {
                governor: args.governor,
                contracts: args.contracts,
            };
            let host = Host::init(&data_dir, &config)?;
            emit(json!({
                "data_dir": data_dir.display().to_string(),
                "governor": host.registry().governor(),
                "contracts": config.contracts,
            }))
        }
        Commands::RegisterContract(args) => {
            let mut host = Host::open(&data_dir)?;
            let added = host
                .registry_mut()
                .register_contract(&args.caller, args.address)
                .map_err(rejected)?;
            host.commit()?;
            let contracts: Vec<_> = host.registry().directory().contracts().collect();
            emit(json!({ "address": args.address, "added": added, "contracts": contracts }))
        }
        Commands::CreateVault(args) => {
            let mut host = Host::open(&data_dir)?;
            let id = host
                .registry_mut()
                .create_vault(&args.caller, args.asset)
                .map_err(rejected)?;
            host.commit()?;
            emit(json!({
                "vault_id": id,
                "asset": args.asset,
                "backend": host.registry().vault_backend(id),
            }))
        }
        Commands::SetTrustee(args) => {
            let mut host = Host::open(&data_dir)?;
            host.registry_mut()
                .set_trustee(&args.caller, args.trustee)
                .map_err(rejected)?;
            host.commit()?;
            emit(json!({ "trustee": args.trustee }))
        }
        Commands::SetStatus(args) => {
            let mut host = Host::open(&data_dir)?;
            host.registry_mut()
                .set_active_status(&args.caller, args.vault, args.deposit, args.withdrawal)
                .map_err(rejected)?;
            host.commit()?;
            emit(json!({
                "vault_id": args.vault,
                "deposit_active": args.deposit,
                "withdrawal_active": args.withdrawal,
            }))
        }
        Commands::Deposit(args) => {
            let mut host = Host::open(&data_dir)?;
            let receipt = Trustee::new(args.trustee)
                .deposit(host.registry_mut(), args.asset, args.from, args.amount)
                .map_err(rejected)?;
            host.commit()?;
            emit(serde_json::to_value(receipt)?)
        }
        Commands::Withdraw(args) => {
            let mut host = Host::open(&data_dir)?;
            let receipt = Trustee::new(args.trustee)
                .withdraw(host.registry_mut(), args.vault, args.to, args.amount)
                .map_err(rejected)?;
            host.commit()?;
            emit(serde_json::to_value(receipt)?)
        }
        Commands::Balance(args) => {
            let host = Host::open(&data_dir)?;
            let registry = host.registry();
            if let Some(id) = args.vault {
                let balance = registry.vault_balance(id).map_err(rejected)?;
                emit(json!({ "vault_id": id, "balance": balance }))
            } else if let Some(asset) = args.asset {
                let total = registry.asset_balance(&asset).map_err(rejected)?;
                emit(json!({
                    "asset": asset,
                    "vaults": registry.vaults_for_asset(&asset),
                    "balance": total.to_string(),
                }))
            } else {
                bail!("either --vault or --asset is required")
            }
        }
        Commands::Vault(args) => {
            let host = Host::open(&data_dir)?;
            let registry = host.registry();
            emit(json!({
                "vault_id": args.id,
                "record": registry.vault(args.id),
                "backend": registry.vault_backend(args.id),
                "deposit_active": registry.is_deposit_active(args.id),
                "withdrawal_active": registry.is_withdrawal_active(args.id),
            }))
        }
        Commands::Events(args) => {
            let host = Host::open(&data_dir)?;
            emit(serde_json::to_value(host.registry().event_log().since(args.since))?)
        }
        Commands::Version => {
            println!("vault-node {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Writes `value` to stdout as pretty JSON.
fn emit(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

//! # Vault Registry
//!
//! The authorization and accounting core. The registry owns the vault
//! table, the role pointers, the event journal and its two collaborators
//! (custody and the account directory). All mutation goes through the
//! operations below, each of which requires exactly one role.
//!
//! ## Operation Contract
//!
//! Every mutating operation checks, in order: caller role, vault existence,
//! vault activity flag, balance arithmetic. Only then does it call the
//! custody backend, and only after the backend succeeds does it commit to
//! the table and journal. A failure at any step returns before anything is
//! written, so no partial effect is ever observable.
//!
//! ## Lookup Duality
//!
//! Queries that report facts about a vault that must exist
//! ([`vault_balance`](VaultRegistry::vault_balance),
//! [`vault_asset`](VaultRegistry::vault_asset)) fail with
//! [`RegistryError::VaultNotFound`]. Plain property probes
//! ([`vault_backend`](VaultRegistry::vault_backend),
//! [`is_deposit_active`](VaultRegistry::is_deposit_active),
//! [`is_withdrawal_active`](VaultRegistry::is_withdrawal_active)) never fail
//! and return the zero address or `false` for unknown ids.

use tracing::{debug, info, warn};

use crate::accounts::{AccountDirectory, KnownAccounts};
use crate::address::{Address, AssetId};
use crate::config::{ConfigError, RegistryConfig};
use crate::custody::{CustodyBackend, InMemoryCustody};
use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventLog, EventRecord, RegistryEvent};
use crate::roles::{Role, Roles};
use crate::table::VaultTable;
use crate::vault::{Vault, VaultId};

/// The vault registry.
///
/// Generic over the custody backend `C` and the account directory `D` so
/// either can be replaced by a test double without touching registry logic.
#[derive(Debug, Clone)]
pub struct VaultRegistry<C = InMemoryCustody, D = KnownAccounts> {
    roles: Roles,
    table: VaultTable,
    events: EventLog,
    custody: C,
    directory: D,
}

impl VaultRegistry<InMemoryCustody, KnownAccounts> {
    /// Builds a registry with in-memory collaborators from a config.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config.governor,
            InMemoryCustody::new(),
            KnownAccounts::with_contracts(config.contracts.iter().copied()),
        ))
    }
}

impl<C: CustodyBackend, D: AccountDirectory> VaultRegistry<C, D> {
    /// A fresh registry with `governor` and no trustee or vaults.
    pub fn new(governor: Address, custody: C, directory: D) -> Self {
        info!(governor = %governor, "vault registry created");
        Self {
            roles: Roles::new(governor),
            table: VaultTable::new(),
            events: EventLog::new(),
            custody,
            directory,
        }
    }

    /// Reassembles a registry from persisted parts.
    pub fn from_parts(
        roles: Roles,
        table: VaultTable,
        events: EventLog,
        custody: C,
        directory: D,
    ) -> Self {
        Self {
            roles,
            table,
            events,
            custody,
            directory,
        }
    }

    // -- Governor operations ------------------------------------------------

    /// Creates a frozen, empty vault for `asset` and returns its id.
    ///
    /// The custody collaborator provisions the backend. If it fails, no id
    /// is consumed.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the governor;
    /// [`RegistryError::Custody`] if provisioning fails.
    pub fn create_vault(&mut self, caller: &Address, asset: AssetId) -> RegistryResult<VaultId> {
        self.try_create_vault(caller, asset)
            .map_err(|e| rejected("create_vault", caller, e))
    }

    fn try_create_vault(&mut self, caller: &Address, asset: AssetId) -> RegistryResult<VaultId> {
        self.roles.require(Role::Governor, caller)?;

        let id = self.table.next_id();
        let backend = self.custody.provision(&asset, id)?;
        self.table.insert(Vault::new(id, asset, backend));
        self.events.record(RegistryEvent::VaultCreated {
            vault_id: id,
            asset,
            backend,
        });

        info!(vault_id = id, asset = %asset, backend = %backend, "vault created");
        Ok(id)
    }

    /// Assigns the trustee, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the governor;
    /// [`RegistryError::TrusteeMustBeContract`] if `trustee` is not a
    /// contract account.
    pub fn set_trustee(&mut self, caller: &Address, trustee: Address) -> RegistryResult<()> {
        self.try_set_trustee(caller, trustee)
            .map_err(|e| rejected("set_trustee", caller, e))
    }

    fn try_set_trustee(&mut self, caller: &Address, trustee: Address) -> RegistryResult<()> {
        self.roles.require(Role::Governor, caller)?;
        if !self.directory.is_contract(&trustee) {
            return Err(RegistryError::TrusteeMustBeContract);
        }

        let previous = self.roles.trustee();
        self.roles.assign_trustee(trustee);
        self.events
            .record(RegistryEvent::TrusteeAssigned { previous, trustee });

        info!(trustee = %trustee, "trustee assigned");
        Ok(())
    }

    /// Overwrites both activity flags of vault `id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the governor;
    /// [`RegistryError::VaultNotFound`] if `id` does not exist.
    pub fn set_active_status(
        &mut self,
        caller: &Address,
        id: VaultId,
        deposit_active: bool,
        withdrawal_active: bool,
    ) -> RegistryResult<()> {
        self.try_set_active_status(caller, id, deposit_active, withdrawal_active)
            .map_err(|e| rejected("set_active_status", caller, e))
    }

    fn try_set_active_status(
        &mut self,
        caller: &Address,
        id: VaultId,
        deposit_active: bool,
        withdrawal_active: bool,
    ) -> RegistryResult<()> {
        self.roles.require(Role::Governor, caller)?;

        let vault = self.table.require_mut(id)?;
        vault.deposit_active = deposit_active;
        vault.withdrawal_active = withdrawal_active;
        self.events.record(RegistryEvent::VaultStatusChanged {
            vault_id: id,
            deposit_active,
            withdrawal_active,
        });

        info!(vault_id = id, deposit_active, withdrawal_active, "vault status set");
        Ok(())
    }

    // -- Trustee operations -------------------------------------------------

    /// Records a deposit into the current vault for `asset` and returns that
    /// vault's id.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the trustee;
    /// [`RegistryError::NoVaultsForAsset`] if the asset has no vaults;
    /// [`RegistryError::DepositsFrozen`] if the current vault has deposits
    /// disabled; [`RegistryError::BalanceOverflow`] or
    /// [`RegistryError::Custody`] otherwise.
    pub fn deposit_by_asset(
        &mut self,
        caller: &Address,
        asset: AssetId,
        depositor: Address,
        amount: u64,
    ) -> RegistryResult<VaultId> {
        self.try_deposit_by_asset(caller, asset, depositor, amount)
            .map_err(|e| rejected("deposit_by_asset", caller, e))
    }

    fn try_deposit_by_asset(
        &mut self,
        caller: &Address,
        asset: AssetId,
        depositor: Address,
        amount: u64,
    ) -> RegistryResult<VaultId> {
        self.roles.require(Role::Trustee, caller)?;

        let id = self.table.latest_for_asset(&asset)?;
        let vault = self.table.require(id)?;
        if !vault.deposit_active {
            return Err(RegistryError::DepositsFrozen(id));
        }
        let balance = vault.balance_after_credit(amount)?;
        let backend = vault.backend;

        self.custody.receive(&backend, &asset, &depositor, amount)?;

        self.table.require_mut(id)?.balance = balance;
        self.events.record(RegistryEvent::Deposited {
            vault_id: id,
            asset,
            depositor,
            amount,
            balance,
        });

        info!(vault_id = id, asset = %asset, depositor = %depositor, amount, balance, "deposit recorded");
        Ok(id)
    }

    /// Records a withdrawal of `amount` from vault `id` to `recipient`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the trustee;
    /// [`RegistryError::VaultNotFound`] if `id` does not exist;
    /// [`RegistryError::WithdrawalsFrozen`] if withdrawals are disabled;
    /// [`RegistryError::InsufficientVaultBalance`] if `amount` exceeds the
    /// balance; [`RegistryError::Custody`] if the backend fails.
    pub fn withdraw_by_vault_id(
        &mut self,
        caller: &Address,
        id: VaultId,
        recipient: Address,
        amount: u64,
    ) -> RegistryResult<()> {
        self.try_withdraw_by_vault_id(caller, id, recipient, amount)
            .map_err(|e| rejected("withdraw_by_vault_id", caller, e))
    }

    fn try_withdraw_by_vault_id(
        &mut self,
        caller: &Address,
        id: VaultId,
        recipient: Address,
        amount: u64,
    ) -> RegistryResult<()> {
        self.roles.require(Role::Trustee, caller)?;

        let vault = self.table.require(id)?;
        if !vault.withdrawal_active {
            return Err(RegistryError::WithdrawalsFrozen(id));
        }
        let balance = vault.balance_after_debit(amount)?;
        let (asset, backend) = (vault.asset, vault.backend);

        self.custody.release(&backend, &asset, &recipient, amount)?;

        self.table.require_mut(id)?.balance = balance;
        self.events.record(RegistryEvent::Withdrawn {
            vault_id: id,
            asset,
            recipient,
            amount,
            balance,
        });

        info!(vault_id = id, asset = %asset, recipient = %recipient, amount, balance, "withdrawal recorded");
        Ok(())
    }

    // -- Existence-checked queries ------------------------------------------

    /// Recorded balance of vault `id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::VaultNotFound`] if `id` does not exist.
    pub fn vault_balance(&self, id: VaultId) -> RegistryResult<u64> {
        self.table.require(id).map(|v| v.balance)
    }

    /// Aggregate balance over every vault for `asset`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NoVaultsForAsset`] if the asset has no vaults.
    pub fn asset_balance(&self, asset: &AssetId) -> RegistryResult<u128> {
        let total = self.table.total_for_asset(asset)?;
        debug!(asset = %asset, total = %total, "asset balance queried");
        Ok(total)
    }

    /// The asset vault `id` holds.
    ///
    /// # Errors
    ///
    /// [`RegistryError::VaultNotFound`] if `id` does not exist.
    pub fn vault_asset(&self, id: VaultId) -> RegistryResult<AssetId> {
        self.table.require(id).map(|v| v.asset)
    }

    /// The vault deposits for `asset` are routed to.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NoVaultsForAsset`] if the asset has no vaults.
    pub fn latest_vault_for_asset(&self, asset: &AssetId) -> RegistryResult<VaultId> {
        self.table.latest_for_asset(asset)
    }

    // -- Default-returning probes -------------------------------------------

    /// Backend address of vault `id`, or the zero address if absent.
    pub fn vault_backend(&self, id: VaultId) -> Address {
        self.table.get(id).map(|v| v.backend).unwrap_or(Address::ZERO)
    }

    /// Whether vault `id` accepts deposits; `false` if absent.
    pub fn is_deposit_active(&self, id: VaultId) -> bool {
        self.table.get(id).map(|v| v.deposit_active).unwrap_or(false)
    }

    /// Whether vault `id` allows withdrawals; `false` if absent.
    pub fn is_withdrawal_active(&self, id: VaultId) -> bool {
        self.table
            .get(id)
            .map(|v| v.withdrawal_active)
            .unwrap_or(false)
    }

    // -- Introspection ------------------------------------------------------

    pub fn governor(&self) -> Address {
        self.roles.governor()
    }

    pub fn trustee(&self) -> Option<Address> {
        self.roles.trustee()
    }

    /// The full record for vault `id`, if it exists.
    pub fn vault(&self, id: VaultId) -> Option<&Vault> {
        self.table.get(id)
    }

    /// Ids of every vault for `asset`, oldest first.
    pub fn vaults_for_asset(&self, asset: &AssetId) -> &[VaultId] {
        self.table.ids_for_asset(asset)
    }

    pub fn vault_count(&self) -> usize {
        self.table.len()
    }

    pub fn table(&self) -> &VaultTable {
        &self.table
    }

    /// Committed events in order.
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}

impl<C: CustodyBackend> VaultRegistry<C, KnownAccounts> {
    /// Marks `address` as a contract account, making it eligible as
    /// trustee. Returns `false` if it already was one.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the governor.
    pub fn register_contract(&mut self, caller: &Address, address: Address) -> RegistryResult<bool> {
        self.roles
            .require(Role::Governor, caller)
            .map_err(|e| rejected("register_contract", caller, e))?;

        let added = self.directory.register_contract(address);
        if added {
            self.events
                .record(RegistryEvent::ContractRegistered { address });
            info!(address = %address, "contract registered");
        }
        Ok(added)
    }
}

fn rejected(operation: &'static str, caller: &Address, err: RegistryError) -> RegistryError {
    warn!(operation, caller = %caller, code = err.code(), "{}", err);
    err
}

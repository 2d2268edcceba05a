//! Integration tests for the vault lifecycle and balance accounting.
//!
//! These walk vaults from creation through activation, deposits and
//! withdrawals, including the multi-vault case where an older vault keeps a
//! residual balance after a newer one takes over deposits.

use vault_registry::{
    Address, AssetId, CustodyBackend, CustodyError, InMemoryCustody, KnownAccounts,
    RegistryError, Trustee, VaultId, VaultRegistry,
};

const GOVERNOR: Address = Address::new([0x01; 20]);
const TRUSTEE: Address = Address::new([0x02; 20]);
const ALICE: Address = Address::new([0x03; 20]);
const BOB: Address = Address::new([0x04; 20]);
const TOKEN_A: Address = Address::new([0xA0; 20]);
const TOKEN_B: Address = Address::new([0xB0; 20]);

fn setup() -> (VaultRegistry, Trustee) {
    let mut registry = VaultRegistry::new(
        GOVERNOR,
        InMemoryCustody::new(),
        KnownAccounts::with_contracts([TRUSTEE]),
    );
    registry.set_trustee(&GOVERNOR, TRUSTEE).unwrap();
    (registry, Trustee::new(TRUSTEE))
}

fn active_vault(registry: &mut VaultRegistry, asset: AssetId) -> VaultId {
    let id = registry.create_vault(&GOVERNOR, asset).unwrap();
    registry.set_active_status(&GOVERNOR, id, true, true).unwrap();
    id
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn freeze_activate_deposit_withdraw_scenario() {
    let (mut registry, trustee) = setup();

    let id = registry.create_vault(&GOVERNOR, TOKEN_A).unwrap();
    assert_eq!(id, 0);

    // 1. New vaults start frozen.
    assert_eq!(
        trustee.deposit(&mut registry, TOKEN_A, ALICE, 100),
        Err(RegistryError::DepositsFrozen(0))
    );

    // 2. Deposits only.
    registry.set_active_status(&GOVERNOR, 0, true, false).unwrap();
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 100).unwrap();
    assert_eq!(registry.vault_balance(0).unwrap(), 100);

    assert_eq!(
        trustee.withdraw(&mut registry, 0, ALICE, 40),
        Err(RegistryError::WithdrawalsFrozen(0))
    );

    // 3. Withdrawals too.
    registry.set_active_status(&GOVERNOR, 0, true, true).unwrap();
    trustee.withdraw(&mut registry, 0, ALICE, 40).unwrap();
    assert_eq!(registry.vault_balance(0).unwrap(), 60);
    assert_eq!(registry.asset_balance(&TOKEN_A).unwrap(), 60);
}

#[test]
fn status_is_overwritten_not_toggled() {
    let (mut registry, _) = setup();
    let id = registry.create_vault(&GOVERNOR, TOKEN_A).unwrap();

    registry.set_active_status(&GOVERNOR, id, true, false).unwrap();
    registry.set_active_status(&GOVERNOR, id, true, false).unwrap();
    assert!(registry.is_deposit_active(id));
    assert!(!registry.is_withdrawal_active(id));

    registry.set_active_status(&GOVERNOR, id, false, true).unwrap();
    assert!(!registry.is_deposit_active(id));
    assert!(registry.is_withdrawal_active(id));
}

#[test]
fn vault_identity_is_fixed() {
    let (mut registry, trustee) = setup();
    let id = active_vault(&mut registry, TOKEN_A);
    let backend = registry.vault_backend(id);

    trustee.deposit(&mut registry, TOKEN_A, ALICE, 10).unwrap();
    registry.set_active_status(&GOVERNOR, id, false, false).unwrap();

    assert_eq!(registry.vault_asset(id).unwrap(), TOKEN_A);
    assert_eq!(registry.vault_backend(id), backend);
}

// ---------------------------------------------------------------------------
// Routing and aggregation
// ---------------------------------------------------------------------------

#[test]
fn deposits_route_to_newest_vault() {
    let (mut registry, trustee) = setup();
    let old = active_vault(&mut registry, TOKEN_A);
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 300).unwrap();

    let new = active_vault(&mut registry, TOKEN_A);
    assert_eq!(registry.latest_vault_for_asset(&TOKEN_A).unwrap(), new);

    let receipt = trustee.deposit(&mut registry, TOKEN_A, BOB, 50).unwrap();
    assert_eq!(receipt.vault_id, new);
    assert_eq!(registry.vault_balance(old).unwrap(), 300);
    assert_eq!(registry.vault_balance(new).unwrap(), 50);
    assert_eq!(registry.asset_balance(&TOKEN_A).unwrap(), 350);
}

#[test]
fn frozen_newest_vault_blocks_deposits_even_if_older_is_active() {
    let (mut registry, trustee) = setup();
    active_vault(&mut registry, TOKEN_A);
    let newest = registry.create_vault(&GOVERNOR, TOKEN_A).unwrap();

    assert_eq!(
        trustee.deposit(&mut registry, TOKEN_A, ALICE, 1),
        Err(RegistryError::DepositsFrozen(newest))
    );
}

#[test]
fn residual_balance_stays_withdrawable_from_old_vault() {
    let (mut registry, trustee) = setup();
    let old = active_vault(&mut registry, TOKEN_A);
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 500).unwrap();

    let new = active_vault(&mut registry, TOKEN_A);
    trustee.deposit(&mut registry, TOKEN_A, BOB, 200).unwrap();

    trustee.withdraw(&mut registry, old, ALICE, 500).unwrap();
    assert_eq!(registry.vault_balance(old).unwrap(), 0);
    assert_eq!(registry.vault_balance(new).unwrap(), 200);
    assert_eq!(registry.asset_balance(&TOKEN_A).unwrap(), 200);
}

#[test]
fn assets_are_accounted_separately() {
    let (mut registry, trustee) = setup();
    let a = active_vault(&mut registry, TOKEN_A);
    let b = active_vault(&mut registry, TOKEN_B);

    trustee.deposit(&mut registry, TOKEN_A, ALICE, 70).unwrap();
    trustee.deposit(&mut registry, TOKEN_B, ALICE, 30).unwrap();

    assert_eq!(registry.asset_balance(&TOKEN_A).unwrap(), 70);
    assert_eq!(registry.asset_balance(&TOKEN_B).unwrap(), 30);
    assert_eq!(registry.vaults_for_asset(&TOKEN_A), &[a]);
    assert_eq!(registry.vaults_for_asset(&TOKEN_B), &[b]);
}

#[test]
fn aggregate_of_unfunded_vaults_is_zero() {
    let (mut registry, _) = setup();
    registry.create_vault(&GOVERNOR, TOKEN_A).unwrap();
    registry.create_vault(&GOVERNOR, TOKEN_A).unwrap();
    assert_eq!(registry.asset_balance(&TOKEN_A).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Balance guards
// ---------------------------------------------------------------------------

#[test]
fn withdrawal_beyond_balance_is_rejected() {
    let (mut registry, trustee) = setup();
    let id = active_vault(&mut registry, TOKEN_A);
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 100).unwrap();

    let err = trustee.withdraw(&mut registry, id, ALICE, 101).unwrap_err();
    assert_eq!(
        err,
        RegistryError::InsufficientVaultBalance {
            vault_id: id,
            balance: 100,
            requested: 101,
        }
    );
    assert_eq!(registry.vault_balance(id).unwrap(), 100);
    assert_eq!(registry.custody().held(&registry.vault_backend(id)), 100);
}

#[test]
fn withdrawal_never_touches_other_vaults() {
    let (mut registry, trustee) = setup();
    let first = active_vault(&mut registry, TOKEN_A);
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 100).unwrap();
    let second = active_vault(&mut registry, TOKEN_A);
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 100).unwrap();

    trustee.withdraw(&mut registry, second, BOB, 100).unwrap();
    assert_eq!(registry.vault_balance(first).unwrap(), 100);
    assert_eq!(
        registry.withdraw_by_vault_id(&TRUSTEE, second, BOB, 1),
        Err(RegistryError::InsufficientVaultBalance {
            vault_id: second,
            balance: 0,
            requested: 1,
        })
    );
}

#[test]
fn custody_mirrors_ledger() {
    let (mut registry, trustee) = setup();
    let ids: Vec<_> = (0..3).map(|_| active_vault(&mut registry, TOKEN_A)).collect();
    // Only the newest vault receives the deposit.
    trustee.deposit(&mut registry, TOKEN_A, ALICE, 900).unwrap();
    trustee.withdraw(&mut registry, ids[2], BOB, 250).unwrap();

    for id in ids {
        assert_eq!(
            registry.custody().held(&registry.vault_backend(id)),
            registry.vault_balance(id).unwrap()
        );
    }
}

// ---------------------------------------------------------------------------
// Custody failure
// ---------------------------------------------------------------------------

/// Custody that provisions normally but refuses every transfer.
#[derive(Debug, Default)]
struct RefusingCustody {
    inner: InMemoryCustody,
}

impl CustodyBackend for RefusingCustody {
    fn provision(&mut self, asset: &AssetId, vault_id: VaultId) -> Result<Address, CustodyError> {
        self.inner.provision(asset, vault_id)
    }

    fn receive(
        &mut self,
        _backend: &Address,
        _asset: &AssetId,
        _from: &Address,
        _amount: u64,
    ) -> Result<(), CustodyError> {
        Err(CustodyError::Rejected("transfer reverted".into()))
    }

    fn release(
        &mut self,
        _backend: &Address,
        _asset: &AssetId,
        _to: &Address,
        _amount: u64,
    ) -> Result<(), CustodyError> {
        Err(CustodyError::Rejected("transfer reverted".into()))
    }
}

#[test]
fn custody_failure_leaves_ledger_untouched() {
    let mut registry = VaultRegistry::new(
        GOVERNOR,
        RefusingCustody::default(),
        KnownAccounts::with_contracts([TRUSTEE]),
    );
    registry.set_trustee(&GOVERNOR, TRUSTEE).unwrap();
    let id = registry.create_vault(&GOVERNOR, TOKEN_A).unwrap();
    registry.set_active_status(&GOVERNOR, id, true, true).unwrap();
    let events_before = registry.events().len();

    let err = registry
        .deposit_by_asset(&TRUSTEE, TOKEN_A, ALICE, 100)
        .unwrap_err();
    assert_eq!(err.code(), "CUSTODY_FAILURE");
    assert_eq!(registry.vault_balance(id).unwrap(), 0);
    assert_eq!(registry.events().len(), events_before);
}

/// Custody whose provisioning always fails.
struct BrokenProvisioning;

impl CustodyBackend for BrokenProvisioning {
    fn provision(&mut self, _asset: &AssetId, _vault_id: VaultId) -> Result<Address, CustodyError> {
        Err(CustodyError::Rejected("deployment failed".into()))
    }

    fn receive(&mut self, _: &Address, _: &AssetId, _: &Address, _: u64) -> Result<(), CustodyError> {
        Ok(())
    }

    fn release(&mut self, _: &Address, _: &AssetId, _: &Address, _: u64) -> Result<(), CustodyError> {
        Ok(())
    }
}

#[test]
fn failed_provisioning_consumes_no_id() {
    let mut registry = VaultRegistry::new(GOVERNOR, BrokenProvisioning, KnownAccounts::new());
    assert!(matches!(
        registry.create_vault(&GOVERNOR, TOKEN_A),
        Err(RegistryError::Custody(_))
    ));
    assert_eq!(registry.vault_count(), 0);
    assert_eq!(registry.table().next_id(), 0);
    assert!(registry.vaults_for_asset(&TOKEN_A).is_empty());
}

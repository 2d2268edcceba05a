//! # Vault Records
//!
//! A [`Vault`] is one backend allocation for one asset. Its identity, asset
//! and backend address are fixed at creation; only the two activity flags
//! (governor-controlled) and the balance (trustee-driven) ever change.
//!
//! Vaults start frozen. A freshly created vault accepts neither deposits nor
//! withdrawals until the governor activates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{Address, AssetId};
use crate::error::{RegistryError, RegistryResult};

/// Monotonically assigned vault identifier. Never reused.
pub type VaultId = u64;

/// Bookkeeping entry for a single vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Unique id assigned by the registry.
    pub id: VaultId,
    /// The asset this vault holds.
    pub asset: AssetId,
    /// Address of the custody backend holding the funds.
    pub backend: Address,
    /// Whether deposits may be routed into this vault.
    pub deposit_active: bool,
    /// Whether withdrawals may be taken from this vault.
    pub withdrawal_active: bool,
    /// Net deposits minus withdrawals, in the asset's smallest unit.
    pub balance: u64,
    /// When the governor created the vault.
    pub created_at: DateTime<Utc>,
}

impl Vault {
    /// Creates a frozen, empty vault.
    pub fn new(id: VaultId, asset: AssetId, backend: Address) -> Self {
        Self {
            id,
            asset,
            backend,
            deposit_active: false,
            withdrawal_active: false,
            balance: 0,
            created_at: Utc::now(),
        }
    }

    /// Balance after crediting `amount`, without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::BalanceOverflow`] past `u64::MAX`.
    pub fn balance_after_credit(&self, amount: u64) -> RegistryResult<u64> {
        self.balance
            .checked_add(amount)
            .ok_or(RegistryError::BalanceOverflow {
                vault_id: self.id,
                balance: self.balance,
                credit: amount,
            })
    }

    /// Balance after debiting `amount`, without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InsufficientVaultBalance`] if `amount`
    /// exceeds the recorded balance.
    pub fn balance_after_debit(&self, amount: u64) -> RegistryResult<u64> {
        self.balance
            .checked_sub(amount)
            .ok_or(RegistryError::InsufficientVaultBalance {
                vault_id: self.id,
                balance: self.balance,
                requested: amount,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault_with_balance(balance: u64) -> Vault {
        let mut v = Vault::new(3, Address::new([1; 20]), Address::new([2; 20]));
        v.balance = balance;
        v
    }

    #[test]
    fn new_vault_starts_frozen_and_empty() {
        let v = Vault::new(0, Address::new([1; 20]), Address::new([2; 20]));
        assert!(!v.deposit_active);
        assert!(!v.withdrawal_active);
        assert_eq!(v.balance, 0);
    }

    #[test]
    fn credit_overflow_is_reported() {
        let v = vault_with_balance(u64::MAX - 1);
        assert_eq!(v.balance_after_credit(1).unwrap(), u64::MAX);
        assert_eq!(
            v.balance_after_credit(2),
            Err(RegistryError::BalanceOverflow {
                vault_id: 3,
                balance: u64::MAX - 1,
                credit: 2
            })
        );
    }

    #[test]
    fn debit_cannot_go_negative() {
        let v = vault_with_balance(50);
        assert_eq!(v.balance_after_debit(50).unwrap(), 0);
        assert!(matches!(
            v.balance_after_debit(51),
            Err(RegistryError::InsufficientVaultBalance {
                balance: 50,
                requested: 51,
                ..
            })
        ));
    }
}

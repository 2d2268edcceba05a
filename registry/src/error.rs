//! # Registry Errors
//!
//! Every rejection the registry can produce. Each variant has a stable
//! human-readable message (its `Display`) and a stable machine code
//! ([`RegistryError::code`]) so callers can branch on the cause.
//!
//! None of these are transient: a failed operation has applied no effects
//! and retrying it unchanged will fail the same way.

use thiserror::Error;

use crate::address::AssetId;
use crate::custody::CustodyError;
use crate::vault::VaultId;

/// Errors returned by [`VaultRegistry`](crate::registry::VaultRegistry)
/// operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The caller does not hold the role the operation requires.
    #[error("Authorization Error")]
    Unauthorized,

    /// Trustee assignment targeted an externally owned account.
    #[error("EOA not allowed")]
    TrusteeMustBeContract,

    /// The referenced vault id was never created.
    #[error("Vault not found")]
    VaultNotFound(VaultId),

    /// No vault has ever been created for the asset.
    #[error("No vaults for this token")]
    NoVaultsForAsset(AssetId),

    /// The target vault has deposits disabled.
    #[error("Deposits are frozen")]
    DepositsFrozen(VaultId),

    /// The target vault has withdrawals disabled.
    #[error("Withdrawals are frozen")]
    WithdrawalsFrozen(VaultId),

    /// A withdrawal asked for more than the vault's recorded balance.
    #[error("Insufficient vault balance: vault {vault_id} holds {balance}, requested {requested}")]
    InsufficientVaultBalance {
        /// The vault being debited.
        vault_id: VaultId,
        /// Its recorded balance.
        balance: u64,
        /// The requested withdrawal amount.
        requested: u64,
    },

    /// A deposit would push the vault balance past `u64::MAX`.
    #[error("Balance overflow: vault {vault_id} holds {balance}, credit {credit}")]
    BalanceOverflow {
        /// The vault being credited.
        vault_id: VaultId,
        /// Its recorded balance.
        balance: u64,
        /// The amount that overflowed.
        credit: u64,
    },

    /// The custody backend refused or failed the transfer.
    #[error("custody failure: {0}")]
    Custody(#[from] CustodyError),
}

impl RegistryError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Unauthorized => "AUTHORIZATION_ERROR",
            RegistryError::TrusteeMustBeContract => "TRUSTEE_MUST_BE_CONTRACT",
            RegistryError::VaultNotFound(_) => "VAULT_NOT_FOUND",
            RegistryError::NoVaultsForAsset(_) => "NO_VAULTS_FOR_ASSET",
            RegistryError::DepositsFrozen(_) => "DEPOSITS_FROZEN",
            RegistryError::WithdrawalsFrozen(_) => "WITHDRAWALS_FROZEN",
            RegistryError::InsufficientVaultBalance { .. } => "INSUFFICIENT_VAULT_BALANCE",
            RegistryError::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            RegistryError::Custody(_) => "CUSTODY_FAILURE",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    #[test]
    fn messages_are_stable() {
        assert_eq!(RegistryError::Unauthorized.to_string(), "Authorization Error");
        assert_eq!(
            RegistryError::TrusteeMustBeContract.to_string(),
            "EOA not allowed"
        );
        assert_eq!(RegistryError::VaultNotFound(9).to_string(), "Vault not found");
        assert_eq!(
            RegistryError::NoVaultsForAsset(Address::ZERO).to_string(),
            "No vaults for this token"
        );
        assert_eq!(
            RegistryError::DepositsFrozen(0).to_string(),
            "Deposits are frozen"
        );
        assert_eq!(
            RegistryError::WithdrawalsFrozen(0).to_string(),
            "Withdrawals are frozen"
        );
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            RegistryError::Unauthorized,
            RegistryError::TrusteeMustBeContract,
            RegistryError::VaultNotFound(1),
            RegistryError::NoVaultsForAsset(Address::ZERO),
            RegistryError::DepositsFrozen(1),
            RegistryError::WithdrawalsFrozen(1),
            RegistryError::InsufficientVaultBalance {
                vault_id: 1,
                balance: 0,
                requested: 1,
            },
            RegistryError::BalanceOverflow {
                vault_id: 1,
                balance: u64::MAX,
                credit: 1,
            },
            RegistryError::Custody(CustodyError::UnknownBackend(Address::ZERO)),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}

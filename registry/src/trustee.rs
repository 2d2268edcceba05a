//! # Trustee
//!
//! The trustee is the single operational actor allowed to move funds
//! through the registry. It sits behind an intake process, receives
//! deposit and withdrawal requests, and forwards them into the registry
//! with its own address as the caller. The registry never calls back.
//!
//! Each successful forward yields a [`Receipt`] the intake side can hand to
//! the depositor or recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::accounts::AccountDirectory;
use crate::address::{Address, AssetId};
use crate::custody::CustodyBackend;
use crate::error::RegistryResult;
use crate::registry::VaultRegistry;
use crate::vault::VaultId;

/// Direction of a trustee operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    Deposit,
    Withdrawal,
}

/// Proof that the registry accepted a trustee operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique receipt id.
    pub id: Uuid,
    /// Deposit or withdrawal.
    pub kind: ReceiptKind,
    /// The vault the funds moved into or out of.
    pub vault_id: VaultId,
    /// The asset moved.
    pub asset: AssetId,
    /// Depositor for deposits, recipient for withdrawals.
    pub counterparty: Address,
    /// Amount moved.
    pub amount: u64,
    /// Vault balance after the operation.
    pub vault_balance: u64,
    /// When the receipt was issued.
    pub issued_at: DateTime<Utc>,
}

/// A trustee contract bound to its own address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trustee {
    address: Address,
}

impl Trustee {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Forwards a deposit of `amount` of `asset` from `depositor`.
    ///
    /// # Errors
    ///
    /// Whatever [`VaultRegistry::deposit_by_asset`] returns.
    pub fn deposit<C: CustodyBackend, D: AccountDirectory>(
        &self,
        registry: &mut VaultRegistry<C, D>,
        asset: AssetId,
        depositor: Address,
        amount: u64,
    ) -> RegistryResult<Receipt> {
        let vault_id = registry.deposit_by_asset(&self.address, asset, depositor, amount)?;
        let vault_balance = registry.vault_balance(vault_id)?;
        let receipt = self.receipt(
            ReceiptKind::Deposit,
            vault_id,
            asset,
            depositor,
            amount,
            vault_balance,
        );
        debug!(receipt = %receipt.id, vault_id, "deposit receipt issued");
        Ok(receipt)
    }

    /// Forwards a withdrawal of `amount` from vault `vault_id` to
    /// `recipient`.
    ///
    /// # Errors
    ///
    /// Whatever [`VaultRegistry::withdraw_by_vault_id`] returns.
    pub fn withdraw<C: CustodyBackend, D: AccountDirectory>(
        &self,
        registry: &mut VaultRegistry<C, D>,
        vault_id: VaultId,
        recipient: Address,
        amount: u64,
    ) -> RegistryResult<Receipt> {
        registry.withdraw_by_vault_id(&self.address, vault_id, recipient, amount)?;
        let asset = registry.vault_asset(vault_id)?;
        let vault_balance = registry.vault_balance(vault_id)?;
        let receipt = self.receipt(
            ReceiptKind::Withdrawal,
            vault_id,
            asset,
            recipient,
            amount,
            vault_balance,
        );
        debug!(receipt = %receipt.id, vault_id, "withdrawal receipt issued");
        Ok(receipt)
    }

    fn receipt(
        &self,
        kind: ReceiptKind,
        vault_id: VaultId,
        asset: AssetId,
        counterparty: Address,
        amount: u64,
        vault_balance: u64,
    ) -> Receipt {
        Receipt {
            id: Uuid::new_v4(),
            kind,
            vault_id,
            asset,
            counterparty,
            amount,
            vault_balance,
            issued_at: Utc::now(),
        }
    }
}

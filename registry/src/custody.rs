//! # Custody Backends
//!
//! The registry only keeps books. Actual custody of funds is delegated to a
//! backend per vault, reached through the [`CustodyBackend`] trait. The
//! registry calls the backend after every ledger check has passed and
//! before it commits, so a backend failure aborts the whole operation with
//! no ledger effect.
//!
//! [`InMemoryCustody`] is the reference implementation. It derives a
//! deterministic backend address per vault and tracks holdings per backend,
//! which makes it suitable both for tests and for the persisted host.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::address::{Address, AssetId};
use crate::config::BACKEND_DERIVATION_DOMAIN;
use crate::vault::VaultId;

/// Errors raised by a custody backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustodyError {
    /// No backend exists at the given address.
    #[error("unknown custody backend {0}")]
    UnknownBackend(Address),

    /// The backend holds a different asset than the one requested.
    #[error("backend {backend} holds {held}, not {requested}")]
    AssetMismatch {
        /// Backend address.
        backend: Address,
        /// Asset the backend was provisioned for.
        held: AssetId,
        /// Asset named in the request.
        requested: AssetId,
    },

    /// The backend cannot release more than it holds.
    #[error("backend {backend} holds {available}, cannot release {requested}")]
    InsufficientHoldings {
        /// Backend address.
        backend: Address,
        /// Amount currently held.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// Holdings would overflow `u64`.
    #[error("backend {0} holdings overflow")]
    Overflow(Address),

    /// A backend is already provisioned at the derived address.
    #[error("backend {0} already provisioned")]
    AlreadyProvisioned(Address),

    /// The backend rejected the transfer for its own reasons.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Capability interface for the backends that hold vault funds.
pub trait CustodyBackend {
    /// Creates a backend for a new vault and returns its address.
    fn provision(&mut self, asset: &AssetId, vault_id: VaultId) -> Result<Address, CustodyError>;

    /// Moves `amount` of `asset` from `from` into `backend`.
    fn receive(
        &mut self,
        backend: &Address,
        asset: &AssetId,
        from: &Address,
        amount: u64,
    ) -> Result<(), CustodyError>;

    /// Moves `amount` of `asset` out of `backend` to `to`.
    fn release(
        &mut self,
        backend: &Address,
        asset: &AssetId,
        to: &Address,
        amount: u64,
    ) -> Result<(), CustodyError>;
}

/// Deterministic backend address for `(asset, vault_id)`.
pub fn derive_backend_address(asset: &AssetId, vault_id: VaultId) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(BACKEND_DERIVATION_DOMAIN);
    hasher.update(asset.as_bytes());
    hasher.update(&vault_id.to_be_bytes());
    Address::from_digest(hasher.finalize().as_bytes())
}

/// Funds held by one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Asset the backend was provisioned for.
    pub asset: AssetId,
    /// Amount currently held.
    pub amount: u64,
}

/// In-process custody: one [`Holding`] per provisioned backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryCustody {
    holdings: BTreeMap<Address, Holding>,
}

impl InMemoryCustody {
    /// Empty custody with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount held by `backend`, or 0 if it does not exist.
    pub fn held(&self, backend: &Address) -> u64 {
        self.holdings.get(backend).map(|h| h.amount).unwrap_or(0)
    }

    /// Number of provisioned backends.
    pub fn backend_count(&self) -> usize {
        self.holdings.len()
    }

    fn holding_mut(
        &mut self,
        backend: &Address,
        asset: &AssetId,
    ) -> Result<&mut Holding, CustodyError> {
        let holding = self
            .holdings
            .get_mut(backend)
            .ok_or(CustodyError::UnknownBackend(*backend))?;
        if holding.asset != *asset {
            return Err(CustodyError::AssetMismatch {
                backend: *backend,
                held: holding.asset,
                requested: *asset,
            });
        }
        Ok(holding)
    }
}

impl CustodyBackend for InMemoryCustody {
    fn provision(&mut self, asset: &AssetId, vault_id: VaultId) -> Result<Address, CustodyError> {
        let backend = derive_backend_address(asset, vault_id);
        if self.holdings.contains_key(&backend) {
            return Err(CustodyError::AlreadyProvisioned(backend));
        }
        self.holdings.insert(
            backend,
            Holding {
                asset: *asset,
                amount: 0,
            },
        );
        Ok(backend)
    }

    fn receive(
        &mut self,
        backend: &Address,
        asset: &AssetId,
        _from: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        let holding = self.holding_mut(backend, asset)?;
        holding.amount = holding
            .amount
            .checked_add(amount)
            .ok_or(CustodyError::Overflow(*backend))?;
        Ok(())
    }

    fn release(
        &mut self,
        backend: &Address,
        asset: &AssetId,
        _to: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        let holding = self.holding_mut(backend, asset)?;
        if holding.amount < amount {
            return Err(CustodyError::InsufficientHoldings {
                backend: *backend,
                available: holding.amount,
                requested: amount,
            });
        }
        holding.amount -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET: Address = Address::new([0xA1; 20]);
    const OTHER: Address = Address::new([0xB2; 20]);
    const USER: Address = Address::new([0x11; 20]);

    #[test]
    fn derivation_is_deterministic_and_distinct() {
        assert_eq!(
            derive_backend_address(&ASSET, 0),
            derive_backend_address(&ASSET, 0)
        );
        assert_ne!(
            derive_backend_address(&ASSET, 0),
            derive_backend_address(&ASSET, 1)
        );
        assert_ne!(
            derive_backend_address(&ASSET, 0),
            derive_backend_address(&OTHER, 0)
        );
        assert!(!derive_backend_address(&ASSET, 0).is_zero());
    }

    #[test]
    fn receive_and_release_track_holdings() {
        let mut custody = InMemoryCustody::new();
        let backend = custody.provision(&ASSET, 0).unwrap();
        custody.receive(&backend, &ASSET, &USER, 100).unwrap();
        custody.release(&backend, &ASSET, &USER, 30).unwrap();
        assert_eq!(custody.held(&backend), 70);
    }

    #[test]
    fn release_beyond_holdings_fails() {
        let mut custody = InMemoryCustody::new();
        let backend = custody.provision(&ASSET, 0).unwrap();
        custody.receive(&backend, &ASSET, &USER, 10).unwrap();
        let err = custody.release(&backend, &ASSET, &USER, 11).unwrap_err();
        assert!(matches!(err, CustodyError::InsufficientHoldings { .. }));
        assert_eq!(custody.held(&backend), 10);
    }

    #[test]
    fn wrong_asset_is_rejected() {
        let mut custody = InMemoryCustody::new();
        let backend = custody.provision(&ASSET, 0).unwrap();
        let err = custody.receive(&backend, &OTHER, &USER, 1).unwrap_err();
        assert!(matches!(err, CustodyError::AssetMismatch { .. }));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut custody = InMemoryCustody::new();
        let err = custody
            .receive(&Address::new([9; 20]), &ASSET, &USER, 1)
            .unwrap_err();
        assert_eq!(err, CustodyError::UnknownBackend(Address::new([9; 20])));
    }

    #[test]
    fn double_provision_is_rejected() {
        let mut custody = InMemoryCustody::new();
        custody.provision(&ASSET, 4).unwrap();
        assert!(matches!(
            custody.provision(&ASSET, 4),
            Err(CustodyError::AlreadyProvisioned(_))
        ));
        assert_eq!(custody.backend_count(), 1);
    }
}

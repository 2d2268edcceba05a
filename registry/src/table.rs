//! # Vault Table
//!
//! Storage for vault records and the per-asset index.
//!
//! Lookups come in two flavors that share this storage: [`VaultTable::get`]
//! returns `Option` and lets callers fall back to a default, while
//! [`VaultTable::require`] turns absence into
//! [`RegistryError::VaultNotFound`]. The registry builds its
//! default-returning getters on the first and its existence-checked
//! operations on the second, so neither can mask the other.
//!
//! The per-asset index keeps ids in creation order. The last entry is the
//! asset's *current* vault, exposed via [`VaultTable::latest_for_asset`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::AssetId;
use crate::config::FIRST_VAULT_ID;
use crate::error::{RegistryError, RegistryResult};
use crate::vault::{Vault, VaultId};

/// Vault records plus the asset index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultTable {
    vaults: BTreeMap<VaultId, Vault>,
    by_asset: BTreeMap<AssetId, Vec<VaultId>>,
    next_id: VaultId,
}

impl VaultTable {
    /// Empty table; the first vault gets [`FIRST_VAULT_ID`].
    pub fn new() -> Self {
        Self {
            vaults: BTreeMap::new(),
            by_asset: BTreeMap::new(),
            next_id: FIRST_VAULT_ID,
        }
    }

    /// Rebuilds a table from persisted parts.
    ///
    /// `next_id` is raised past the highest stored id so ids are never
    /// reused even if the counter was lost.
    pub fn from_parts(
        vaults: BTreeMap<VaultId, Vault>,
        by_asset: BTreeMap<AssetId, Vec<VaultId>>,
        next_id: VaultId,
    ) -> Self {
        let floor = vaults.keys().next_back().map(|id| id + 1).unwrap_or(0);
        Self {
            vaults,
            by_asset,
            next_id: next_id.max(floor),
        }
    }

    /// The id the next inserted vault will receive.
    pub fn next_id(&self) -> VaultId {
        self.next_id
    }

    /// Inserts a vault built for [`next_id`](Self::next_id) and advances
    /// the counter.
    pub(crate) fn insert(&mut self, vault: Vault) -> VaultId {
        debug_assert_eq!(vault.id, self.next_id);
        let id = vault.id;
        self.by_asset.entry(vault.asset).or_default().push(id);
        self.vaults.insert(id, vault);
        self.next_id = id + 1;
        id
    }

    /// The vault with `id`, if it exists.
    pub fn get(&self, id: VaultId) -> Option<&Vault> {
        self.vaults.get(&id)
    }

    /// The vault with `id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::VaultNotFound`] if `id` was never created.
    pub fn require(&self, id: VaultId) -> RegistryResult<&Vault> {
        self.vaults.get(&id).ok_or(RegistryError::VaultNotFound(id))
    }

    pub(crate) fn require_mut(&mut self, id: VaultId) -> RegistryResult<&mut Vault> {
        self.vaults
            .get_mut(&id)
            .ok_or(RegistryError::VaultNotFound(id))
    }

    /// Ids of every vault for `asset`, oldest first. Empty if none.
    pub fn ids_for_asset(&self, asset: &AssetId) -> &[VaultId] {
        self.by_asset
            .get(asset)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The most recently created vault for `asset`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NoVaultsForAsset`] if the asset has no vaults.
    pub fn latest_for_asset(&self, asset: &AssetId) -> RegistryResult<VaultId> {
        self.ids_for_asset(asset)
            .last()
            .copied()
            .ok_or(RegistryError::NoVaultsForAsset(*asset))
    }

    /// Sum of balances over every vault for `asset`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NoVaultsForAsset`] if the asset has no vaults.
    pub fn total_for_asset(&self, asset: &AssetId) -> RegistryResult<u128> {
        let ids = self.ids_for_asset(asset);
        if ids.is_empty() {
            return Err(RegistryError::NoVaultsForAsset(*asset));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.vaults.get(id))
            .map(|v| u128::from(v.balance))
            .sum())
    }

    /// Every vault in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.values()
    }

    /// Every asset with at least one vault, with its ids.
    pub fn assets(&self) -> impl Iterator<Item = (&AssetId, &Vec<VaultId>)> {
        self.by_asset.iter()
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }
}

impl Default for VaultTable {
    fn default() -> Self {
        Self::new()
    }
}

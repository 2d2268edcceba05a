//! # RegistryStore — Persistent Registry State
//!
//! Durable storage for a [`VaultRegistry`], built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                   | Value                         |
//! |------------|-----------------------|-------------------------------|
//! | `vaults`   | `vault_id` (8B BE)    | `bincode(Vault)`              |
//! | `assets`   | asset (20B)           | `bincode(Vec<VaultId>)`       |
//! | `events`   | `seq` (8B BE)         | `bincode(EventRecord)`        |
//! | `metadata` | key (UTF-8)           | value (bytes)                 |
//!
//! Ids and sequence numbers are stored big-endian so sled's lexicographic
//! order matches numeric order.
//!
//! ## Incremental Saves
//!
//! The first save writes a full snapshot. Every later save reads the
//! journal records past the stored event count and writes only what those
//! events touched: the new records, the vaults they name, the asset list of
//! each newly created vault, and the metadata entries they change. All
//! writes of one save land in a single multi-tree transaction, so a crash
//! never leaves a vault without its asset index entry.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::accounts::AccountDirectory;
use crate::address::{Address, AssetId, ADDRESS_LENGTH};
use crate::config::{TREE_ASSETS, TREE_EVENTS, TREE_METADATA, TREE_VAULTS};
use crate::custody::CustodyBackend;
use crate::events::{EventLog, EventRecord, RegistryEvent};
use crate::registry::VaultRegistry;
use crate::roles::Roles;
use crate::table::VaultTable;
use crate::vault::{Vault, VaultId};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

const META_GOVERNOR: &[u8] = b"governor";
const META_TRUSTEE: &[u8] = b"trustee";
const META_NEXT_VAULT_ID: &[u8] = b"next_vault_id";
const META_CUSTODY: &[u8] = b"custody";
const META_DIRECTORY: &[u8] = b"directory";

// ---------------------------------------------------------------------------
// RegistryStore
// ---------------------------------------------------------------------------

/// sled-backed persistence for a registry.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    db: Db,
    vaults: Tree,
    assets: Tree,
    events: Tree,
    metadata: Tree,
}

impl RegistryStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in a temporary location and is removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let vaults = db.open_tree(TREE_VAULTS)?;
        let assets = db.open_tree(TREE_ASSETS)?;
        let events = db.open_tree(TREE_EVENTS)?;
        let metadata = db.open_tree(TREE_METADATA)?;
        Ok(Self {
            db,
            vaults,
            assets,
            events,
            metadata,
        })
    }

    /// Whether a registry has ever been saved here.
    pub fn is_initialized(&self) -> StoreResult<bool> {
        Ok(self.metadata.contains_key(META_GOVERNOR)?)
    }

    /// Number of journal records already persisted.
    pub fn stored_event_count(&self) -> StoreResult<u64> {
        match self.events.last()? {
            Some((key, _)) => Ok(u64_from_bytes(&key)? + 1),
            None => Ok(0),
        }
    }

    /// Persist registry changes since the last save, then flush.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] if the store holds more journal records than
    /// `registry`, i.e. it belongs to a different registry.
    pub fn save<C, D>(&self, registry: &VaultRegistry<C, D>) -> StoreResult<()>
    where
        C: CustodyBackend + Serialize,
        D: AccountDirectory + Serialize,
    {
        let stored = self.stored_event_count()?;
        let total = registry.events().len() as u64;
        if stored > total {
            return Err(StoreError::Corrupt(format!(
                "store holds {stored} events, registry only {total}"
            )));
        }

        let writes = if self.is_initialized()? {
            let pending = registry.event_log().since(stored);
            if pending.is_empty() {
                return Ok(());
            }
            WriteSet::delta(registry, pending)?
        } else {
            WriteSet::snapshot(registry)?
        };

        self.apply(&writes)?;
        self.db.flush()?;
        tracing::debug!(
            vaults = writes.vaults.len(),
            events = writes.events.len(),
            "registry saved"
        );
        Ok(())
    }

    fn apply(&self, writes: &WriteSet) -> StoreResult<()> {
        (&self.vaults, &self.assets, &self.events, &self.metadata)
            .transaction(|(vaults, assets, events, metadata)| {
                for (key, value) in &writes.vaults {
                    vaults.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &writes.assets {
                    assets.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &writes.events {
                    events.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &writes.metadata {
                    metadata.insert(*key, value.as_slice())?;
                }
                Ok::<(), ConflictableTransactionError<StoreError>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StoreError::Sled(e),
            })
    }

    /// Load the registry, or `None` if nothing was ever saved.
    pub fn load<C, D>(&self) -> StoreResult<Option<VaultRegistry<C, D>>>
    where
        C: CustodyBackend + DeserializeOwned + Default,
        D: AccountDirectory + DeserializeOwned + Default,
    {
        let governor = match self.metadata.get(META_GOVERNOR)? {
            Some(bytes) => address_from_bytes(&bytes)?,
            None => return Ok(None),
        };
        let trustee = self
            .metadata
            .get(META_TRUSTEE)?
            .map(|b| address_from_bytes(&b))
            .transpose()?;
        let next_id = match self.metadata.get(META_NEXT_VAULT_ID)? {
            Some(bytes) => u64_from_bytes(&bytes)?,
            None => 0,
        };

        let mut vaults = BTreeMap::new();
        for entry in self.vaults.iter() {
            let (_key, value) = entry?;
            let vault: Vault = decode(&value)?;
            vaults.insert(vault.id, vault);
        }

        let mut by_asset = BTreeMap::new();
        for entry in self.assets.iter() {
            let (key, value) = entry?;
            let asset: AssetId = address_from_bytes(&key)?;
            let ids: Vec<VaultId> = decode(&value)?;
            by_asset.insert(asset, ids);
        }

        let mut records = Vec::new();
        for entry in self.events.iter() {
            let (_key, value) = entry?;
            let record: EventRecord = decode(&value)?;
            records.push(record);
        }

        let custody = match self.metadata.get(META_CUSTODY)? {
            Some(bytes) => decode(&bytes)?,
            None => C::default(),
        };
        let directory = match self.metadata.get(META_DIRECTORY)? {
            Some(bytes) => decode(&bytes)?,
            None => D::default(),
        };

        for vault in vaults.values() {
            let indexed = by_asset
                .get(&vault.asset)
                .is_some_and(|ids: &Vec<VaultId>| ids.contains(&vault.id));
            if !indexed {
                return Err(StoreError::Corrupt(format!(
                    "vault {} missing from asset index of {}",
                    vault.id, vault.asset
                )));
            }
        }

        let registry = VaultRegistry::from_parts(
            Roles::from_parts(governor, trustee),
            VaultTable::from_parts(vaults, by_asset, next_id),
            EventLog::from_records(records),
            custody,
            directory,
        );
        tracing::debug!(vaults = registry.vault_count(), "registry loaded");
        Ok(Some(registry))
    }
}

// ---------------------------------------------------------------------------
// Write sets
// ---------------------------------------------------------------------------

/// Encoded key/value pairs for one save, one list per tree.
#[derive(Debug, Default)]
struct WriteSet {
    vaults: Vec<(Vec<u8>, Vec<u8>)>,
    assets: Vec<(Vec<u8>, Vec<u8>)>,
    events: Vec<(Vec<u8>, Vec<u8>)>,
    metadata: Vec<(&'static [u8], Vec<u8>)>,
}

impl WriteSet {
    /// Everything the registry holds.
    fn snapshot<C, D>(registry: &VaultRegistry<C, D>) -> StoreResult<Self>
    where
        C: CustodyBackend + Serialize,
        D: AccountDirectory + Serialize,
    {
        let mut writes = Self::default();
        for vault in registry.table().iter() {
            writes.push_vault(vault)?;
        }
        for (asset, ids) in registry.table().assets() {
            writes.push_asset(asset, ids)?;
        }
        for record in registry.events() {
            writes.push_event(record)?;
        }
        writes
            .metadata
            .push((META_GOVERNOR, registry.governor().as_bytes().to_vec()));
        if let Some(trustee) = registry.trustee() {
            writes.metadata.push((META_TRUSTEE, trustee.as_bytes().to_vec()));
        }
        writes.push_counter(registry);
        writes.metadata.push((META_CUSTODY, encode(registry.custody())?));
        writes.metadata.push((META_DIRECTORY, encode(registry.directory())?));
        Ok(writes)
    }

    /// Only what `pending` touched.
    fn delta<C, D>(registry: &VaultRegistry<C, D>, pending: &[EventRecord]) -> StoreResult<Self>
    where
        C: CustodyBackend + Serialize,
        D: AccountDirectory + Serialize,
    {
        let mut touched = BTreeSet::new();
        let mut new_assets = BTreeSet::new();
        let (mut created, mut funds_moved, mut trustee_changed, mut directory_changed) =
            (false, false, false, false);

        for record in pending {
            match &record.event {
                RegistryEvent::VaultCreated { vault_id, asset, .. } => {
                    touched.insert(*vault_id);
                    new_assets.insert(*asset);
                    created = true;
                    funds_moved = true;
                }
                RegistryEvent::VaultStatusChanged { vault_id, .. } => {
                    touched.insert(*vault_id);
                }
                RegistryEvent::Deposited { vault_id, .. }
                | RegistryEvent::Withdrawn { vault_id, .. } => {
                    touched.insert(*vault_id);
                    funds_moved = true;
                }
                RegistryEvent::TrusteeAssigned { .. } => trustee_changed = true,
                RegistryEvent::ContractRegistered { .. } => directory_changed = true,
            }
        }

        let mut writes = Self::default();
        for id in touched {
            let vault = registry
                .vault(id)
                .ok_or_else(|| StoreError::Corrupt(format!("journal names unknown vault {id}")))?;
            writes.push_vault(vault)?;
        }
        for asset in new_assets {
            writes.push_asset(&asset, registry.vaults_for_asset(&asset))?;
        }
        for record in pending {
            writes.push_event(record)?;
        }
        if created {
            writes.push_counter(registry);
        }
        if trustee_changed {
            if let Some(trustee) = registry.trustee() {
                writes.metadata.push((META_TRUSTEE, trustee.as_bytes().to_vec()));
            }
        }
        if funds_moved {
            writes.metadata.push((META_CUSTODY, encode(registry.custody())?));
        }
        if directory_changed {
            writes.metadata.push((META_DIRECTORY, encode(registry.directory())?));
        }
        Ok(writes)
    }

    fn push_vault(&mut self, vault: &Vault) -> StoreResult<()> {
        self.vaults.push((vault.id.to_be_bytes().to_vec(), encode(vault)?));
        Ok(())
    }

    fn push_asset(&mut self, asset: &AssetId, ids: &[VaultId]) -> StoreResult<()> {
        self.assets.push((asset.as_bytes().to_vec(), encode(ids)?));
        Ok(())
    }

    fn push_event(&mut self, record: &EventRecord) -> StoreResult<()> {
        self.events.push((record.seq.to_be_bytes().to_vec(), encode(record)?));
        Ok(())
    }

    fn push_counter<C, D>(&mut self, registry: &VaultRegistry<C, D>)
    where
        C: CustodyBackend,
        D: AccountDirectory,
    {
        self.metadata.push((
            META_NEXT_VAULT_ID,
            registry.table().next_id().to_be_bytes().to_vec(),
        ));
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn encode<T: Serialize + ?Sized>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn address_from_bytes(bytes: &[u8]) -> StoreResult<Address> {
    let raw: [u8; ADDRESS_LENGTH] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("address of {} bytes", bytes.len())))?;
    Ok(Address::new(raw))
}

fn u64_from_bytes(bytes: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt("invalid counter bytes".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::KnownAccounts;
    use crate::custody::InMemoryCustody;

    const GOV: Address = Address::new([0x01; 20]);
    const TRUSTEE: Address = Address::new([0x02; 20]);
    const ALICE: Address = Address::new([0x03; 20]);
    const ASSET: Address = Address::new([0xA0; 20]);

    #[test]
    fn empty_store_loads_nothing() {
        let store = RegistryStore::open_temporary().unwrap();
        assert!(!store.is_initialized().unwrap());
        let loaded: Option<VaultRegistry> = store.load().unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_preserves_everything() {
        let store = RegistryStore::open_temporary().unwrap();
        let mut registry = VaultRegistry::new(
            GOV,
            InMemoryCustody::new(),
            KnownAccounts::with_contracts([TRUSTEE]),
        );
        registry.set_trustee(&GOV, TRUSTEE).unwrap();
        let id = registry.create_vault(&GOV, ASSET).unwrap();
        registry.set_active_status(&GOV, id, true, true).unwrap();
        registry.deposit_by_asset(&TRUSTEE, ASSET, ALICE, 100).unwrap();
        store.save(&registry).unwrap();

        let loaded: VaultRegistry = store.load().unwrap().unwrap();
        assert_eq!(loaded.governor(), GOV);
        assert_eq!(loaded.trustee(), Some(TRUSTEE));
        assert_eq!(loaded.table(), registry.table());
        assert_eq!(loaded.event_log(), registry.event_log());
        assert_eq!(loaded.custody(), registry.custody());
        assert_eq!(loaded.directory(), registry.directory());
    }

    fn active_registry() -> VaultRegistry {
        let mut registry = VaultRegistry::new(
            GOV,
            InMemoryCustody::new(),
            KnownAccounts::with_contracts([TRUSTEE]),
        );
        registry.set_trustee(&GOV, TRUSTEE).unwrap();
        let id = registry.create_vault(&GOV, ASSET).unwrap();
        registry.set_active_status(&GOV, id, true, true).unwrap();
        registry
    }

    #[test]
    fn second_save_writes_only_new_events() {
        let store = RegistryStore::open_temporary().unwrap();
        let mut registry = active_registry();
        store.save(&registry).unwrap();
        assert_eq!(store.stored_event_count().unwrap(), 3);

        // A stored record that differs from memory survives a later save
        // only if that save leaves old records alone.
        let mut marker = registry.events()[0].clone();
        marker.event = RegistryEvent::ContractRegistered { address: ALICE };
        store
            .events
            .insert(0u64.to_be_bytes(), encode(&marker).unwrap())
            .unwrap();

        registry.deposit_by_asset(&TRUSTEE, ASSET, ALICE, 40).unwrap();
        store.save(&registry).unwrap();
        assert_eq!(store.stored_event_count().unwrap(), 4);

        let loaded: VaultRegistry = store.load().unwrap().unwrap();
        assert_eq!(loaded.events()[0], marker);
        assert_eq!(loaded.events()[1..], registry.events()[1..]);
        assert_eq!(loaded.vault_balance(0).unwrap(), 40);
    }

    #[test]
    fn untouched_vaults_are_not_rewritten() {
        let other = Address::new([0xB0; 20]);
        let store = RegistryStore::open_temporary().unwrap();
        let mut registry = active_registry();
        let second = registry.create_vault(&GOV, other).unwrap();
        registry.set_active_status(&GOV, second, true, true).unwrap();
        store.save(&registry).unwrap();

        let mut stale = registry.vault(0).unwrap().clone();
        stale.balance = 999;
        store
            .vaults
            .insert(0u64.to_be_bytes(), encode(&stale).unwrap())
            .unwrap();

        registry.deposit_by_asset(&TRUSTEE, other, ALICE, 7).unwrap();
        store.save(&registry).unwrap();

        let loaded: VaultRegistry = store.load().unwrap().unwrap();
        assert_eq!(loaded.vault_balance(0).unwrap(), 999);
        assert_eq!(loaded.vault_balance(second).unwrap(), 7);
        assert_eq!(loaded.vaults_for_asset(&other), &[second]);
    }

    #[test]
    fn save_without_changes_is_a_no_op() {
        let store = RegistryStore::open_temporary().unwrap();
        let registry = active_registry();
        store.save(&registry).unwrap();
        store.save(&registry).unwrap();
        assert_eq!(store.stored_event_count().unwrap(), 3);
    }

    #[test]
    fn store_ahead_of_registry_is_refused() {
        let store = RegistryStore::open_temporary().unwrap();
        store.save(&active_registry()).unwrap();

        let fresh = VaultRegistry::new(GOV, InMemoryCustody::new(), KnownAccounts::new());
        assert!(matches!(store.save(&fresh), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn vault_missing_from_asset_index_is_reported() {
        let store = RegistryStore::open_temporary().unwrap();
        store.save(&active_registry()).unwrap();
        store
            .assets
            .insert(ASSET.as_bytes(), encode(&Vec::<VaultId>::new()).unwrap())
            .unwrap();

        let result: StoreResult<Option<VaultRegistry>> = store.load();
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn corrupt_governor_is_reported() {
        let store = RegistryStore::open_temporary().unwrap();
        store.metadata.insert(META_GOVERNOR, vec![1u8, 2, 3]).unwrap();
        let result: StoreResult<Option<VaultRegistry>> = store.load();
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}

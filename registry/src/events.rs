//! Event journal.
//!
//! Every successful mutation appends one [`EventRecord`]. Rejected
//! operations append nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{Address, AssetId};
use crate::vault::VaultId;

/// A state change committed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEvent {
    /// The governor created a vault.
    VaultCreated {
        vault_id: VaultId,
        asset: AssetId,
        backend: Address,
    },
    /// The governor assigned a trustee.
    TrusteeAssigned {
        previous: Option<Address>,
        trustee: Address,
    },
    /// The governor overwrote a vault's activity flags.
    VaultStatusChanged {
        vault_id: VaultId,
        deposit_active: bool,
        withdrawal_active: bool,
    },
    /// The trustee recorded a deposit.
    Deposited {
        vault_id: VaultId,
        asset: AssetId,
        depositor: Address,
        amount: u64,
        balance: u64,
    },
    /// The governor marked an address as a contract account.
    ContractRegistered { address: Address },
    /// The trustee recorded a withdrawal.
    Withdrawn {
        vault_id: VaultId,
        asset: AssetId,
        recipient: Address,
        amount: u64,
        balance: u64,
    },
}

/// An event with its journal position and commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Zero-based position in the journal.
    pub seq: u64,
    /// When the event was committed.
    pub recorded_at: DateTime<Utc>,
    /// The event itself.
    pub event: RegistryEvent,
}

/// Append-only list of [`EventRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a journal from persisted records, ordered by `seq`.
    pub fn from_records(mut records: Vec<EventRecord>) -> Self {
        records.sort_by_key(|r| r.seq);
        Self { records }
    }

    /// Appends `event` and returns its sequence number.
    pub fn record(&mut self, event: RegistryEvent) -> u64 {
        let seq = self.records.len() as u64;
        self.records.push(EventRecord {
            seq,
            recorded_at: Utc::now(),
            event,
        });
        seq
    }

    /// All records in commit order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `seq >= from`.
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = (from as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

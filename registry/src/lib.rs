// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Registry
//!
//! Registry and authorization core for a custodial fund-routing ledger.
//! Depositors' funds are routed into per-asset vaults, each backed by an
//! external custody backend; the registry keeps the books and decides who
//! may do what.
//!
//! - **registry** — the [`VaultRegistry`]: vault creation, freezing,
//!   deposits, withdrawals and balance queries.
//! - **roles** — the governor (administrative) and trustee (operational).
//! - **table** — vault records and the per-asset index.
//! - **custody** — the backend capability interface and an in-memory
//!   implementation.
//! - **accounts** — contract vs externally-owned classification.
//! - **trustee** — the operational collaborator that forwards requests.
//! - **events** — append-only journal of committed changes.
//! - **storage** — sled persistence.
//! - **config** — constants and deployment config.
//!
//! ## Design Principles
//!
//! 1. Every operation is all-or-nothing. Checks run first, the custody call
//!    next, the ledger commit last.
//! 2. Balances use checked arithmetic. A vault balance never goes negative
//!    and never wraps.
//! 3. Every rejection is a specific [`RegistryError`] variant with a stable
//!    message and code.
//! 4. Every persisted type is serde-serializable.

pub mod accounts;
pub mod address;
pub mod config;
pub mod custody;
pub mod error;
pub mod events;
pub mod registry;
pub mod roles;
pub mod storage;
pub mod table;
pub mod trustee;
pub mod vault;

pub use accounts::{AccountDirectory, AccountKind, KnownAccounts};
pub use address::{Address, AssetId};
pub use config::RegistryConfig;
pub use custody::{CustodyBackend, CustodyError, InMemoryCustody};
pub use error::{RegistryError, RegistryResult};
pub use events::{EventRecord, RegistryEvent};
pub use registry::VaultRegistry;
pub use roles::Role;
pub use storage::{RegistryStore, StoreError};
pub use trustee::{Receipt, ReceiptKind, Trustee};
pub use vault::{Vault, VaultId};

//! Account classification.
//!
//! The trustee must be a contract account, never an externally owned one.
//! The registry asks an [`AccountDirectory`] which kind an address is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::address::Address;

/// What sort of account an address refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// A key-controlled account with no code.
    Externally,
    /// An account backed by contract code that can receive calls.
    Contract,
}

/// Answers whether an address is a contract account.
pub trait AccountDirectory {
    /// Classifies `address`.
    fn kind(&self, address: &Address) -> AccountKind;

    /// Shorthand for `kind(address) == AccountKind::Contract`.
    fn is_contract(&self, address: &Address) -> bool {
        self.kind(address) == AccountKind::Contract
    }
}

/// Directory backed by an explicit set of contract addresses.
/// Anything not in the set is treated as externally owned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownAccounts {
    contracts: BTreeSet<Address>,
}

impl KnownAccounts {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-populated with `contracts`.
    pub fn with_contracts<I: IntoIterator<Item = Address>>(contracts: I) -> Self {
        Self {
            contracts: contracts.into_iter().collect(),
        }
    }

    /// Marks `address` as a contract. Returns `false` if it already was.
    pub fn register_contract(&mut self, address: Address) -> bool {
        self.contracts.insert(address)
    }

    /// Iterates the registered contract addresses in order.
    pub fn contracts(&self) -> impl Iterator<Item = &Address> {
        self.contracts.iter()
    }
}

impl AccountDirectory for KnownAccounts {
    fn kind(&self, address: &Address) -> AccountKind {
        if self.contracts.contains(address) {
            AccountKind::Contract
        } else {
            AccountKind::Externally
        }
    }
}

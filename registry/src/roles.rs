//! # Roles
//!
//! Two privileged identities gate every mutation: the governor configures
//! the registry and the trustee moves funds through it. Both are plain
//! fields checked by identity comparison; there is no role hierarchy and
//! the governor cannot act as trustee unless it was assigned as one.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{RegistryError, RegistryResult};

/// The role an operation requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Administrative role: vault creation, trustee assignment, freezing.
    Governor,
    /// Operational role: deposits and withdrawals.
    Trustee,
}

/// Role pointers held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    governor: Address,
    trustee: Option<Address>,
}

impl Roles {
    /// Roles with the given governor and no trustee.
    pub fn new(governor: Address) -> Self {
        Self {
            governor,
            trustee: None,
        }
    }

    /// Restores roles from persisted values.
    pub fn from_parts(governor: Address, trustee: Option<Address>) -> Self {
        Self { governor, trustee }
    }

    /// The governor identity.
    pub fn governor(&self) -> Address {
        self.governor
    }

    /// The trustee identity, if one has been assigned.
    pub fn trustee(&self) -> Option<Address> {
        self.trustee
    }

    /// Replaces the trustee wholesale.
    pub(crate) fn assign_trustee(&mut self, trustee: Address) {
        self.trustee = Some(trustee);
    }

    /// Checks that `caller` holds `role`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unauthorized`] on mismatch, including when
    /// the trustee role is required but unassigned.
    pub fn require(&self, role: Role, caller: &Address) -> RegistryResult<()> {
        let holder = match role {
            Role::Governor => Some(self.governor),
            Role::Trustee => self.trustee,
        };
        match holder {
            Some(h) if h == *caller => Ok(()),
            _ => Err(RegistryError::Unauthorized),
        }
    }
}

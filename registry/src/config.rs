//! # Registry Configuration & Constants
//!
//! Named constants used across the crate, plus [`RegistryConfig`], the
//! serde-loadable description of a registry deployment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::address::Address;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// The first id handed out by a fresh registry.
pub const FIRST_VAULT_ID: u64 = 0;

/// Domain tag mixed into backend address derivation so that backend
/// addresses can never collide with hashes taken for other purposes.
pub const BACKEND_DERIVATION_DOMAIN: &[u8] = b"vault-registry/backend/v1";

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// sled tree holding `bincode(Vault)` keyed by big-endian vault id.
pub const TREE_VAULTS: &str = "vaults";

/// sled tree holding `bincode(Vec<VaultId>)` keyed by asset bytes.
pub const TREE_ASSETS: &str = "assets";

/// sled tree holding `bincode(EventRecord)` keyed by big-endian sequence.
pub const TREE_EVENTS: &str = "events";

/// sled tree holding role pointers, counters and collaborator snapshots.
pub const TREE_METADATA: &str = "metadata";

// ---------------------------------------------------------------------------
// Host Defaults
// ---------------------------------------------------------------------------

/// Name of the registry config file inside a data directory.
pub const CONFIG_FILE_NAME: &str = "registry.json";

/// Name of the sled database directory inside a data directory.
pub const STORE_DIR_NAME: &str = "store";

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Errors loading or validating a [`RegistryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The governor may not be the zero address.
    #[error("governor must not be the zero address")]
    ZeroGovernor,
}

/// Deployment description for a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Governor identity, fixed for the registry's lifetime.
    pub governor: Address,
    /// Addresses known to be contract accounts (trustee candidates).
    #[serde(default)]
    pub contracts: Vec<Address>,
}

impl RegistryConfig {
    /// Config with the given governor and no known contracts.
    pub fn new(governor: Address) -> Self {
        Self {
            governor,
            contracts: Vec::new(),
        }
    }

    /// Reads and validates a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Rejects configurations the registry cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.governor.is_zero() {
            return Err(ConfigError::ZeroGovernor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_governor_rejected() {
        let config = RegistryConfig::new(Address::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroGovernor)));
    }

    #[test]
    fn contracts_default_to_empty() {
        let json = format!("{{\"governor\":\"0x{}\"}}", "01".repeat(20));
        let config: RegistryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.governor, Address::new([1; 20]));
        assert!(config.contracts.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = RegistryConfig::new(Address::new([1; 20]));
        config.contracts.push(Address::new([2; 20]));
        config.save(&path).unwrap();
        assert_eq!(RegistryConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            RegistryConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}

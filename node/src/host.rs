//! # Registry Host
//!
//! Binds a data directory to a live [`VaultRegistry`]. The directory holds
//! the deployment config (`registry.json`) and the sled store. A host loads
//! the registry once, applies operations to it, and [`commit`](Host::commit)s
//! after each successful one. Failed operations are never committed.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use vault_registry::config::{CONFIG_FILE_NAME, STORE_DIR_NAME};
use vault_registry::{RegistryConfig, RegistryError, RegistryStore, VaultRegistry};

/// A loaded registry and the store it came from.
pub struct Host {
    store: RegistryStore,
    registry: VaultRegistry,
}

impl Host {
    /// Creates the data directory, writes `config`, and saves an empty
    /// registry. Fails if the directory already holds a registry.
    pub fn init(data_dir: &Path, config: &RegistryConfig) -> Result<Self> {
        config.validate().context("invalid registry config")?;
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory: {}", data_dir.display())
        })?;

        let store = open_store(data_dir)?;
        if store.is_initialized()? {
            bail!("registry already initialized in {}", data_dir.display());
        }

        let config_path = config_path(data_dir);
        config
            .save(&config_path)
            .with_context(|| format!("failed to write {}", config_path.display()))?;

        let registry = VaultRegistry::from_config(config)?;
        store.save(&registry)?;
        tracing::info!(data_dir = %data_dir.display(), governor = %config.governor, "registry initialized");
        Ok(Self { store, registry })
    }

    /// Opens an initialized data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config_path = config_path(data_dir);
        let config = RegistryConfig::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;

        let store = open_store(data_dir)?;
        let registry: VaultRegistry = match store.load()? {
            Some(registry) => registry,
            None => bail!(
                "no registry in {}; run `vault-node init` first",
                data_dir.display()
            ),
        };
        if registry.governor() != config.governor {
            bail!(
                "config governor {} does not match stored governor {}",
                config.governor,
                registry.governor()
            );
        }
        tracing::debug!(vaults = registry.vault_count(), "registry opened");
        Ok(Self { store, registry })
    }

    pub fn registry(&self) -> &VaultRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VaultRegistry {
        &mut self.registry
    }

    /// Persists the current registry state.
    pub fn commit(&self) -> Result<()> {
        self.store
            .save(&self.registry)
            .context("failed to persist registry")
    }
}

/// Converts a registry rejection into an error carrying its stable code.
pub fn rejected(err: RegistryError) -> anyhow::Error {
    anyhow::anyhow!("{} [{}]", err, err.code())
}

fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

fn open_store(data_dir: &Path) -> Result<RegistryStore> {
    let path = data_dir.join(STORE_DIR_NAME);
    RegistryStore::open(&path)
        .with_context(|| format!("failed to open registry store at {}", path.display()))
}

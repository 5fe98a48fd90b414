//! Storage, registry and signing backends, wired together from config

pub mod blockchain;
pub mod registry;
pub mod storage;
pub mod vault;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{Config, RegistryMode, StorageMode};
use crate::proof::AttestationSigner;
use blockchain::{ChainRegistry, WalletService};
use registry::{MemoryRegistry, ProofRegistry};
use storage::{LocalStore, NetworkStore, StorageBackend};
use vault::Vault;

/// Everything the HTTP layer needs, built once at startup.
pub struct Services {
    pub vault: Vault,
    pub wallet: Option<WalletService>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage: Arc<dyn StorageBackend> = match config.storage_mode {
            StorageMode::Network => {
                tracing::info!("Storage: 0G network via {}", config.indexer_url);
                Arc::new(
                    NetworkStore::new(&config.indexer_url, config.storage_timeout())
                        .context("Failed to create storage client")?,
                )
            }
            StorageMode::Local => {
                tracing::info!("Storage: local fallback in {}", config.local_store_dir.display());
                Arc::new(
                    LocalStore::open(&config.local_store_dir)
                        .context("Failed to open local proof store")?,
                )
            }
        };

        let signer = match &config.private_key {
            Some(key) => Some(AttestationSigner::from_hex(key).context("Invalid PRIVATE_KEY")?),
            None => {
                tracing::warn!("PRIVATE_KEY not set, uploads will be rejected");
                None
            }
        };

        let registry: Option<Arc<dyn ProofRegistry>> = match (config.registry_mode, &config.private_key) {
            (RegistryMode::Disabled, _) => None,
            (RegistryMode::Memory, _) => {
                let registrant = signer
                    .as_ref()
                    .map(|s| s.address())
                    .unwrap_or_else(|| registry::ZERO_ADDRESS.to_string());
                tracing::info!("Registry: in-memory");
                Some(Arc::new(MemoryRegistry::new(&registrant)))
            }
            (RegistryMode::Chain, Some(key)) => {
                let contract = config
                    .registry_contract
                    .as_deref()
                    .context("REGISTRY_CONTRACT is required for the chain registry")?;
                Some(Arc::new(ChainRegistry::new(
                    &config.rpc_url,
                    contract,
                    key,
                    config.chain_timeout(),
                )?))
            }
            (RegistryMode::Chain, None) => {
                tracing::warn!("Chain registry needs PRIVATE_KEY, registry disabled");
                None
            }
        };

        let wallet = match &config.private_key {
            Some(key) => Some(WalletService::new(
                &config.rpc_url,
                key,
                &config.network_name,
                config.chain_timeout(),
            )?),
            None => None,
        };

        Ok(Self {
            vault: Vault::new(storage, registry, signer, &config.verifier_id),
            wallet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::StorageSource;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn local_memory_services_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            private_key: Some(TEST_KEY.to_string()),
            storage_mode: StorageMode::Local,
            registry_mode: RegistryMode::Memory,
            local_store_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let services = Services::from_config(&config).unwrap();
        assert_eq!(services.vault.storage_source(), StorageSource::LocalFallback);
        assert_eq!(
            services.vault.signer_address().unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert!(services.vault.registry_contract().is_none());
        assert!(services.wallet.is_some());
    }

    #[test]
    fn missing_key_disables_signing_and_chain() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage_mode: StorageMode::Local,
            registry_mode: RegistryMode::Chain,
            registry_contract: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string()),
            local_store_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let services = Services::from_config(&config).unwrap();
        assert!(services.vault.signer_address().is_none());
        assert!(services.vault.registry_contract().is_none());
        assert!(services.wallet.is_none());
    }

    #[test]
    fn bad_key_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            private_key: Some("0xnothex".to_string()),
            storage_mode: StorageMode::Local,
            local_store_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert!(Services::from_config(&config).is_err());
    }
}

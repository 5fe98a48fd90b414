//! Configuration management

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Network,
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    Chain,
    Memory,
    Disabled,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Custodial key: signs attestations and pays for registry transactions
    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_indexer_url")]
    pub indexer_url: String,

    #[serde(default)]
    pub registry_contract: Option<String>,

    #[serde(default = "default_registry_mode")]
    pub registry_mode: RegistryMode,

    #[serde(default = "default_storage_mode")]
    pub storage_mode: StorageMode,

    #[serde(default = "default_local_store_dir")]
    pub local_store_dir: PathBuf,

    #[serde(default = "default_verifier_id")]
    pub verifier_id: String,

    #[serde(default = "default_network_name")]
    pub network_name: String,

    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_secs: u64,

    #[serde(default = "default_chain_timeout")]
    pub chain_timeout_secs: u64,
}

fn default_port() -> u16 {
    3001
}

fn default_rpc_url() -> String {
    "https://evmrpc-testnet.0g.ai/".to_string()
}

fn default_indexer_url() -> String {
    "https://indexer-storage-testnet-turbo.0g.ai".to_string()
}

fn default_registry_mode() -> RegistryMode {
    RegistryMode::Chain
}

fn default_storage_mode() -> StorageMode {
    StorageMode::Network
}

fn default_local_store_dir() -> PathBuf {
    PathBuf::from("./proof-store")
}

fn default_verifier_id() -> String {
    "hotel-front-desk".to_string()
}

fn default_network_name() -> String {
    "0g-testnet".to_string()
}

fn default_storage_timeout() -> u64 {
    30
}

fn default_chain_timeout() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            private_key: None,
            rpc_url: default_rpc_url(),
            indexer_url: default_indexer_url(),
            registry_contract: None,
            registry_mode: default_registry_mode(),
            storage_mode: default_storage_mode(),
            local_store_dir: default_local_store_dir(),
            verifier_id: default_verifier_id(),
            network_name: default_network_name(),
            storage_timeout_secs: default_storage_timeout(),
            chain_timeout_secs: default_chain_timeout(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.normalized()
    }

    /// Blank optional values count as unset, and a chain registry without a
    /// contract address degrades to no registry.
    fn normalized(mut self) -> Result<Self> {
        self.private_key = self.private_key.filter(|k| !k.trim().is_empty());
        self.registry_contract = self.registry_contract.filter(|a| !a.trim().is_empty());

        if self.registry_mode == RegistryMode::Chain && self.registry_contract.is_none() {
            tracing::warn!("REGISTRY_CONTRACT not set, on-chain registry disabled");
            self.registry_mode = RegistryMode::Disabled;
        }
        if self.storage_timeout_secs == 0 || self.chain_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be at least one second");
        }
        Ok(self)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }

    pub fn chain_timeout(&self) -> Duration {
        Duration::from_secs(self.chain_timeout_secs)
    }
}

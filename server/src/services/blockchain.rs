//! Chain-backed proof registry and signer wallet introspection, via Alloy

use alloy::{
    network::EthereumWallet,
    primitives::{utils::format_units, Address, FixedBytes},
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::future::IntoFuture;
use std::time::Duration;

use crate::models::WalletResponse;
use crate::proof::ContentHash;
use crate::services::registry::{check_revocable, ProofRegistry, RegistryError, RegistryRecord, TxId};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IProofRegistry {
        function registerProof(bytes32 proofHash) external;

        function revokeProof(bytes32 proofHash) external;

        function isProofValid(bytes32 proofHash) external view returns (bool exists, bool valid);

        function getProofRecord(bytes32 proofHash) external view returns (
            bool exists,
            bool valid,
            uint256 registeredAt,
            uint256 revokedAt,
            address registeredBy
        );
    }
}

fn to_bytes32(hash: &ContentHash) -> FixedBytes<32> {
    FixedBytes::from(hash.0)
}

/// Map RPC and revert text onto registry error kinds.
pub fn classify_chain_error(message: &str, hash: &ContentHash) -> RegistryError {
    let lower = message.to_lowercase();
    if lower.contains("already registered") {
        RegistryError::AlreadyRegistered(*hash)
    } else if lower.contains("already revoked") {
        RegistryError::AlreadyRevoked(*hash)
    } else if lower.contains("not registrant") {
        RegistryError::NotRegistrant(*hash)
    } else if lower.contains("not registered") {
        RegistryError::NotRegistered(*hash)
    } else if lower.contains("insufficient funds") {
        RegistryError::InsufficientFunds(message.to_string())
    } else if lower.contains("revert") {
        RegistryError::TransactionFailed(message.to_string())
    } else {
        RegistryError::Network(message.to_string())
    }
}

async fn bounded<F: IntoFuture>(timeout: Duration, fut: F) -> Result<F::Output, RegistryError> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        RegistryError::Network(format!("Chain call timed out after {}s", timeout.as_secs()))
    })
}

pub struct ChainRegistry {
    rpc_url: Url,
    contract: Address,
    wallet: EthereumWallet,
    registrant: Address,
    timeout: Duration,
}

impl ChainRegistry {
    pub fn new(rpc_url: &str, contract: &str, private_key: &str, timeout: Duration) -> Result<Self> {
        let contract: Address = contract.parse().context("Invalid registry contract address")?;
        let rpc_url: Url = rpc_url.parse().context("Invalid RPC URL")?;
        let signer: PrivateKeySigner = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .context("Invalid private key")?;

        tracing::info!(
            "Proof registry at {} via {} (registrant {})",
            contract,
            rpc_url,
            signer.address()
        );

        Ok(Self {
            rpc_url,
            contract,
            registrant: signer.address(),
            wallet: EthereumWallet::from(signer),
            timeout,
        })
    }

    async fn send_tx(&self, hash: &ContentHash, revoke: bool) -> Result<TxId, RegistryError> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.clone());

        let contract = IProofRegistry::new(self.contract, &provider);
        let key = to_bytes32(hash);

        let register_tx = contract.registerProof(key);
        let revoke_tx = contract.revokeProof(key);

        let sent = if revoke {
            bounded(self.timeout, revoke_tx.send()).await?
        } else {
            bounded(self.timeout, register_tx.send()).await?
        };
        let pending = sent.map_err(|e| classify_chain_error(&e.to_string(), hash))?;

        tracing::info!("Registry transaction sent: {:?}", pending.tx_hash());

        let receipt = bounded(self.timeout, pending.get_receipt())
            .await?
            .map_err(|e| RegistryError::TransactionFailed(format!("Confirmation failed: {}", e)))?;

        tracing::info!(
            "Registry transaction confirmed: tx={:?}, block={:?}",
            receipt.transaction_hash,
            receipt.block_number
        );

        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

#[async_trait]
impl ProofRegistry for ChainRegistry {
    async fn register(&self, hash: &ContentHash) -> Result<TxId, RegistryError> {
        tracing::info!("Registering proof {} on-chain", hash);
        self.send_tx(hash, false).await
    }

    async fn revoke(&self, hash: &ContentHash) -> Result<TxId, RegistryError> {
        // Fail typed and gas-free when the contract would revert anyway
        let record = self.record(hash).await?;
        check_revocable(hash, &record, &self.registrant.to_checksum(None))?;

        tracing::info!("Revoking proof {} on-chain", hash);
        self.send_tx(hash, true).await
    }

    async fn record(&self, hash: &ContentHash) -> Result<RegistryRecord, RegistryError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = IProofRegistry::new(self.contract, &provider);

        let result = bounded(self.timeout, contract.getProofRecord(to_bytes32(hash)).call())
            .await?
            .map_err(|e| classify_chain_error(&e.to_string(), hash))?;

        Ok(RegistryRecord {
            exists: result.exists,
            valid: result.valid,
            registered_at: result.registeredAt.try_into().unwrap_or(u64::MAX),
            revoked_at: result.revokedAt.try_into().unwrap_or(u64::MAX),
            registered_by: result.registeredBy.to_checksum(None),
        })
    }

    fn contract_address(&self) -> Option<String> {
        Some(self.contract.to_checksum(None))
    }
}

/// Balance and network of the custodial signer account.
pub struct WalletService {
    rpc_url: Url,
    address: Address,
    network: String,
    timeout: Duration,
}

impl WalletService {
    pub fn new(rpc_url: &str, private_key: &str, network: &str, timeout: Duration) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .context("Invalid private key")?;

        Ok(Self {
            rpc_url: rpc_url.parse().context("Invalid RPC URL")?,
            address: signer.address(),
            network: network.to_string(),
            timeout,
        })
    }

    pub fn address(&self) -> String {
        self.address.to_checksum(None)
    }

    pub async fn describe(&self) -> Result<WalletResponse, RegistryError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let balance = bounded(self.timeout, provider.get_balance(self.address))
            .await?
            .map_err(|e| RegistryError::Network(format!("Failed to read balance: {}", e)))?;

        let chain_id = bounded(self.timeout, provider.get_chain_id())
            .await?
            .map_err(|e| RegistryError::Network(format!("Failed to read chain id: {}", e)))?;

        Ok(WalletResponse {
            address: self.address(),
            balance: format_units(balance, "ether").unwrap_or_else(|_| balance.to_string()),
            network: self.network.clone(),
            chain_id,
        })
    }
}

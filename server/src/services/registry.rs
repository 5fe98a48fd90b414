//! Proof registry: lifecycle state per proof hash
//!
//! register once, revoke once. A hash can never be registered again and a
//! revoked hash stays revoked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::proof::ContentHash;

pub type TxId = String;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Proof already registered: {0}")]
    AlreadyRegistered(ContentHash),

    #[error("Proof not registered: {0}")]
    NotRegistered(ContentHash),

    #[error("Proof already revoked: {0}")]
    AlreadyRevoked(ContentHash),

    #[error("Only the registering account may revoke proof {0}")]
    NotRegistrant(ContentHash),

    #[error("Insufficient funds for registry transaction: {0}")]
    InsufficientFunds(String),

    #[error("Chain RPC error: {0}")]
    Network(String),

    #[error("Registry transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Registry signer unavailable: {0}")]
    Signing(String),

    #[error("No proof registry configured")]
    Disabled,
}

/// On-chain lifecycle state. Timestamps are block times in seconds, 0 when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub exists: bool,
    pub valid: bool,
    pub registered_at: u64,
    pub revoked_at: u64,
    pub registered_by: String,
}

impl Default for RegistryRecord {
    fn default() -> Self {
        Self {
            exists: false,
            valid: false,
            registered_at: 0,
            revoked_at: 0,
            registered_by: ZERO_ADDRESS.to_string(),
        }
    }
}

impl RegistryRecord {
    pub fn is_revoked(&self) -> bool {
        self.exists && !self.valid
    }
}

#[async_trait]
pub trait ProofRegistry: Send + Sync {
    /// Rejects a hash that was ever registered with `AlreadyRegistered`.
    async fn register(&self, hash: &ContentHash) -> Result<TxId, RegistryError>;

    async fn revoke(&self, hash: &ContentHash) -> Result<TxId, RegistryError>;

    async fn record(&self, hash: &ContentHash) -> Result<RegistryRecord, RegistryError>;

    fn contract_address(&self) -> Option<String>;
}

/// Same transition rules as the checks on `revokeProof`, shared by every backend.
/// `caller` is the account that would send the revocation.
pub fn check_revocable(
    hash: &ContentHash,
    record: &RegistryRecord,
    caller: &str,
) -> Result<(), RegistryError> {
    if !record.exists {
        return Err(RegistryError::NotRegistered(*hash));
    }
    if !record.registered_by.eq_ignore_ascii_case(caller) {
        return Err(RegistryError::NotRegistrant(*hash));
    }
    if !record.valid {
        return Err(RegistryError::AlreadyRevoked(*hash));
    }
    Ok(())
}

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// In-process registry with contract semantics. Used for demos without a
/// deployed contract and in tests.
pub struct MemoryRegistry {
    records: RwLock<HashMap<ContentHash, RegistryRecord>>,
    registrant: String,
    clock: Clock,
    last_block_time: AtomicU64,
    nonce: AtomicU64,
}

impl MemoryRegistry {
    pub fn new(registrant: &str) -> Self {
        Self::with_clock(
            registrant,
            Arc::new(|| chrono::Utc::now().timestamp().max(0) as u64),
        )
    }

    pub fn with_clock(registrant: &str, clock: Clock) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            registrant: registrant.to_string(),
            clock,
            last_block_time: AtomicU64::new(0),
            nonce: AtomicU64::new(0),
        }
    }

    /// Each write lands in a new "block" whose time is strictly later than the last.
    fn next_block_time(&self) -> u64 {
        let now = (self.clock)();
        let mut prev = self.last_block_time.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self.last_block_time.compare_exchange(
                prev,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    fn tx_id(&self, op: &str, hash: &ContentHash) -> TxId {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = Vec::with_capacity(op.len() + 40);
        preimage.extend_from_slice(op.as_bytes());
        preimage.extend_from_slice(hash.as_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        ContentHash::digest(&preimage).to_string()
    }
}

#[async_trait]
impl ProofRegistry for MemoryRegistry {
    async fn register(&self, hash: &ContentHash) -> Result<TxId, RegistryError> {
        let mut records = self.records.write().await;
        if records.contains_key(hash) {
            return Err(RegistryError::AlreadyRegistered(*hash));
        }
        records.insert(
            *hash,
            RegistryRecord {
                exists: true,
                valid: true,
                registered_at: self.next_block_time(),
                revoked_at: 0,
                registered_by: self.registrant.clone(),
            },
        );
        tracing::info!("Registered proof {} in memory registry", hash);
        Ok(self.tx_id("register", hash))
    }

    async fn revoke(&self, hash: &ContentHash) -> Result<TxId, RegistryError> {
        let mut records = self.records.write().await;
        let record = records.get(hash).cloned().unwrap_or_default();
        check_revocable(hash, &record, &self.registrant)?;
        records.insert(
            *hash,
            RegistryRecord {
                valid: false,
                revoked_at: self.next_block_time(),
                ..record
            },
        );
        tracing::info!("Revoked proof {} in memory registry", hash);
        Ok(self.tx_id("revoke", hash))
    }

    async fn record(&self, hash: &ContentHash) -> Result<RegistryRecord, RegistryError> {
        Ok(self
            .records
            .read()
            .await
            .get(hash)
            .cloned()
            .unwrap_or_default())
    }

    fn contract_address(&self) -> Option<String> {
        None
    }
}

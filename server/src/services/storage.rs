//! Content-addressed blob storage for sealed proofs
//!
//! Two interchangeable backends keyed by `proofHash`:
//! - `NetworkStore` talks to the storage network's HTTP gateway
//! - `LocalStore` keeps one file per key on local disk (fallback mode)

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::proof::ContentHash;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Proof not found in storage: {0}")]
    NotFound(ContentHash),

    #[error("Storage network error: {0}")]
    Network(String),

    /// Gateway refused the request itself (4xx other than 404)
    #[error("Storage gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Local store I/O error: {0}")]
    Io(String),

    #[error("Stored object is not a proof: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Network(_))
    }

    /// Server errors may clear on retry; client errors will not.
    fn from_status(status: reqwest::StatusCode, op: &str) -> Self {
        let detail = format!("Gateway returned {} on {}", status, op);
        if status.is_client_error() {
            StorageError::Rejected(detail)
        } else {
            StorageError::Network(detail)
        }
    }
}

/// Where a proof was stored or read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageSource {
    /// Storage network, replicated and independently verifiable
    Network,
    /// Local keyed file store, no network consensus behind it
    LocalFallback,
}

impl fmt::Display for StorageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageSource::Network => f.write_str("0G Network"),
            StorageSource::LocalFallback => f.write_str("local fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReceipt {
    /// Lookup key, always the proof hash
    pub content_id: ContentHash,
    pub tx_hash: Option<String>,
    /// Merkle root assigned by the network, informational only
    pub network_root: Option<String>,
    pub source: StorageSource,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn store(&self, key: &ContentHash, bytes: &[u8]) -> Result<StoreReceipt, StorageError>;

    async fn fetch(&self, key: &ContentHash) -> Result<Vec<u8>, StorageError>;

    fn source(&self) -> StorageSource;
}

// ============================================================================
// Network gateway
// ============================================================================

#[derive(Debug, Deserialize)]
struct GatewayReceipt {
    #[serde(default)]
    root: Option<String>,
    #[serde(default, rename = "txHash")]
    tx_hash: Option<String>,
}

pub struct NetworkStore {
    client: reqwest::Client,
    indexer_url: String,
    retry_window: Duration,
}

impl NetworkStore {
    pub fn new(indexer_url: &str, timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            indexer_url: indexer_url.trim_end_matches('/').to_string(),
            retry_window: timeout,
        })
    }

    /// Total time spent retrying transient failures before giving up.
    pub fn with_retry_window(mut self, window: Duration) -> Self {
        self.retry_window = window;
        self
    }

    fn blob_url(&self, key: &ContentHash) -> String {
        format!("{}/blobs/{}", self.indexer_url, key)
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut attempt: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, StorageError>>,
    {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(Some(self.retry_window))
            .build();

        backoff::future::retry(policy, || {
            let fut = attempt();
            async move {
                fut.await.map_err(|e| {
                    if e.is_retryable() {
                        tracing::warn!("Storage {} failed, retrying: {}", op, e);
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }

    async fn put_once(&self, key: &ContentHash, bytes: &[u8]) -> Result<GatewayReceipt, StorageError> {
        let resp = self
            .client
            .put(self.blob_url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StorageError::from_status(status, "upload"));
        }

        resp.json::<GatewayReceipt>()
            .await
            .map_err(|e| StorageError::Network(format!("Unreadable gateway receipt: {}", e)))
    }

    async fn get_once(&self, key: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let resp = self
            .client
            .get(self.blob_url(key))
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound(*key)),
            status if status.is_success() => resp
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| StorageError::Network(e.to_string())),
            status => Err(StorageError::from_status(status, "download")),
        }
    }
}

#[async_trait]
impl StorageBackend for NetworkStore {
    async fn store(&self, key: &ContentHash, bytes: &[u8]) -> Result<StoreReceipt, StorageError> {
        tracing::info!("Uploading proof {} to storage network ({} bytes)", key, bytes.len());

        let receipt = self.with_retry("upload", move || self.put_once(key, bytes)).await?;

        tracing::info!(
            "Upload complete: key={}, root={:?}, tx={:?}",
            key,
            receipt.root,
            receipt.tx_hash
        );

        Ok(StoreReceipt {
            content_id: *key,
            tx_hash: receipt.tx_hash,
            network_root: receipt.root,
            source: StorageSource::Network,
        })
    }

    async fn fetch(&self, key: &ContentHash) -> Result<Vec<u8>, StorageError> {
        tracing::debug!("Fetching proof {} from storage network", key);
        self.with_retry("download", move || self.get_once(key)).await
    }

    fn source(&self) -> StorageSource {
        StorageSource::Network
    }
}

// ============================================================================
// Local fallback
// ============================================================================

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| StorageError::Io(format!("Cannot create {}: {}", dir.display(), e)))?;
        tracing::warn!(
            "Local fallback storage at {}: proofs are not replicated to the network",
            dir.display()
        );
        Ok(Self { dir })
    }

    fn path_for(&self, key: &ContentHash) -> PathBuf {
        self.dir.join(format!("{}.json", key.to_hex()))
    }

    /// Write-temp-then-rename. The temp file is unlinked on drop if anything fails.
    fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStore {
    async fn store(&self, key: &ContentHash, bytes: &[u8]) -> Result<StoreReceipt, StorageError> {
        let dir = self.dir.clone();
        let target = self.path_for(key);
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || Self::write_atomic(&dir, &target, &bytes))
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::info!("Stored proof {} in local fallback", key);

        Ok(StoreReceipt {
            content_id: *key,
            tx_hash: None,
            network_root: None,
            source: StorageSource::LocalFallback,
        })
    }

    async fn fetch(&self, key: &ContentHash) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(*key)),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn source(&self) -> StorageSource {
        StorageSource::LocalFallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> ContentHash {
        ContentHash::digest(&[n])
    }

    #[tokio::test]
    async fn local_round_trip_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let payload = br#"{"proof":{"type":"age"},  "odd": "spacing"}"#;

        let receipt = store.store(&key(1), payload).await.unwrap();
        assert_eq!(receipt.content_id, key(1));
        assert_eq!(receipt.source, StorageSource::LocalFallback);
        assert!(receipt.tx_hash.is_none());

        assert_eq!(store.fetch(&key(1)).await.unwrap(), payload.to_vec());
    }

    #[tokio::test]
    async fn local_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(
            store.fetch(&key(2)).await.unwrap_err(),
            StorageError::NotFound(key(2))
        );
    }

    #[tokio::test]
    async fn local_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.store(&key(3), b"one").await.unwrap();
        store.store(&key(3), b"two").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", key(3).to_hex())]);
        assert_eq!(store.fetch(&key(3)).await.unwrap(), b"two".to_vec());
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(StorageError::Network("reset".into()).is_retryable());
        assert!(!StorageError::NotFound(key(4)).is_retryable());
        assert!(!StorageError::Io("disk".into()).is_retryable());
    }

    #[test]
    fn source_serializes_as_kebab_case() {
        assert_eq!(
            serde_json::to_string(&StorageSource::LocalFallback).unwrap(),
            "\"local-fallback\""
        );
        assert_eq!(StorageSource::Network.to_string(), "0G Network");
    }
}

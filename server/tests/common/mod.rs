//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use proof_vault::config::{Config, RegistryMode, StorageMode};
use proof_vault::proof::{AttestationSigner, ContentHash, ProofArtifact, ProofKind};
use proof_vault::services::registry::{
    MemoryRegistry, ProofRegistry, RegistryError, RegistryRecord, TxId,
};
use proof_vault::services::storage::LocalStore;
use proof_vault::services::vault::Vault;
use proof_vault::services::Services;
use proof_vault::AppState;

/// Well-known development key (first hardhat/anvil account)
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Second anvil account, used to forge envelopes
pub const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OTHER_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub const FIXTURE_HASH: &str = "0xf6f1f57ae635426b679e8f3f674b75da5470f713ae392eb9a2f77a38ea1f154d";

/// The reference age proof used across tests
pub fn fixture_artifact() -> ProofArtifact {
    ProofArtifact {
        kind: ProofKind::Age,
        verified: true,
        raw_proof: json!({"age": {"gte": {"result": true}}}),
        timestamp: 1_700_000_000_000,
        issuer: "test".to_string(),
        attestation: None,
    }
}

pub fn fixture_json() -> Value {
    serde_json::to_value(fixture_artifact()).unwrap()
}

pub fn kyc_artifact() -> ProofArtifact {
    ProofArtifact {
        kind: ProofKind::Kyc,
        verified: true,
        raw_proof: json!({
            "fullname": {"disclose": {"result": "Jane Doe"}},
            "nationality": {"disclose": {"result": "FRA"}},
            "birthdate": {"disclose": {"result": "1990-01-01"}},
            "expiry_date": {"disclose": {"result": "2031-05-30"}},
            "document_number": {"disclose": {"result": "X1234567"}},
            "sanctions": {"passed": true, "countries": {"US": {"passed": true}}}
        }),
        timestamp: 1_700_000_100_000,
        issuer: "kiosk-7".to_string(),
        attestation: None,
    }
}

/// Registry whose writes always fail with a transport error.
pub struct UnreachableRegistry;

#[async_trait]
impl ProofRegistry for UnreachableRegistry {
    async fn register(&self, _hash: &ContentHash) -> Result<TxId, RegistryError> {
        Err(RegistryError::Network("connection refused".to_string()))
    }

    async fn revoke(&self, _hash: &ContentHash) -> Result<TxId, RegistryError> {
        Err(RegistryError::Network("connection refused".to_string()))
    }

    async fn record(&self, _hash: &ContentHash) -> Result<RegistryRecord, RegistryError> {
        Err(RegistryError::Network("connection refused".to_string()))
    }

    fn contract_address(&self) -> Option<String> {
        Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string())
    }
}

/// A vault over a temp dir. The dir lives as long as the harness.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<LocalStore>,
    pub vault: Arc<Vault>,
}

pub enum RegistrySetup {
    Memory,
    Unreachable,
    Disabled,
}

impl Harness {
    pub fn new(registry: RegistrySetup) -> Self {
        Self::build(registry, true)
    }

    pub fn without_signer() -> Self {
        Self::build(RegistrySetup::Memory, false)
    }

    fn build(registry: RegistrySetup, with_signer: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        let registry: Option<Arc<dyn ProofRegistry>> = match registry {
            RegistrySetup::Memory => Some(Arc::new(MemoryRegistry::new(TEST_ADDRESS))),
            RegistrySetup::Unreachable => Some(Arc::new(UnreachableRegistry)),
            RegistrySetup::Disabled => None,
        };
        let signer = with_signer.then(|| AttestationSigner::from_hex(TEST_KEY).unwrap());
        let vault = Arc::new(Vault::new(store.clone(), registry, signer, "hotel-front-desk"));
        Self { dir, store, vault }
    }

    pub fn state(&self) -> AppState {
        AppState {
            vault: self.vault.clone(),
            wallet: None,
        }
    }

    pub fn router(&self) -> axum::Router {
        proof_vault::router(self.state())
    }

    /// Put raw bytes under a key, bypassing the vault.
    pub fn plant(&self, key: &ContentHash, bytes: &[u8]) {
        std::fs::write(self.dir.path().join(format!("{}.json", key.to_hex())), bytes).unwrap();
    }
}

/// Services built the way `main` builds them, for config-driven tests.
pub fn services_for(dir: &TempDir) -> Services {
    let config = Config {
        private_key: Some(TEST_KEY.to_string()),
        storage_mode: StorageMode::Local,
        registry_mode: RegistryMode::Memory,
        local_store_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    Services::from_config(&config).unwrap()
}

/// Send a request to the test router.
pub async fn send_request(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let body = body
        .map(|v| Body::from(serde_json::to_vec(&v).unwrap()))
        .unwrap_or_else(|| Body::from(Vec::new()));

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    let json = if bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
    };

    (status, json)
}

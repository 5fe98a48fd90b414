//! Thin HTTP client for the proof vault API

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use proof_vault::models::{
    HealthResponse, ProofResponse, RegistryResponse, RevokeResponse, UploadResponse,
    VerifyResponse, WalletResponse,
};
use proof_vault::proof::{ContentHash, ProofArtifact};

/// Error body returned by the server on failure
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
    kind: Option<String>,
    code: Option<u16>,
}

pub struct VaultClient {
    client: Client,
    server: String,
}

impl VaultClient {
    pub fn new(server: &str) -> Self {
        Self {
            client: Client::new(),
            server: server.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    /// Decode a success body, or turn an error body into a readable failure.
    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<(T, Value)> {
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("Server returned {} with an unreadable body", status))?;

        if !status.is_success() {
            let err: ApiError = serde_json::from_value(body.clone()).unwrap_or(ApiError {
                error: body.to_string(),
                kind: None,
                code: Some(status.as_u16()),
            });
            anyhow::bail!(
                "{} ({}): {}",
                err.kind.as_deref().unwrap_or("ERROR"),
                err.code.unwrap_or(status.as_u16()),
                err.error
            );
        }

        let typed = serde_json::from_value(body.clone()).context("Unexpected response shape")?;
        Ok((typed, body))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<(T, Value)> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.server))?;
        Self::decode(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<(T, Value)> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.server))?;
        Self::decode(resp).await
    }

    pub async fn upload(&self, artifact: &ProofArtifact) -> Result<(UploadResponse, Value)> {
        self.post("/api/upload", &json!({ "proofArtifact": artifact })).await
    }

    pub async fn fetch(&self, hash: &ContentHash) -> Result<(ProofResponse, Value)> {
        self.get(&format!("/api/proof/{}", hash)).await
    }

    pub async fn verify(&self, hash: &ContentHash) -> Result<(VerifyResponse, Value)> {
        self.get(&format!("/api/verify/{}", hash)).await
    }

    pub async fn status(&self, hash: &ContentHash) -> Result<(RegistryResponse, Value)> {
        self.get(&format!("/api/registry/{}", hash)).await
    }

    pub async fn revoke(&self, hash: &ContentHash) -> Result<(RevokeResponse, Value)> {
        self.post("/api/registry/revoke", &json!({ "proofHash": hash }))
            .await
    }

    pub async fn wallet(&self) -> Result<(WalletResponse, Value)> {
        self.get("/api/wallet").await
    }

    pub async fn health(&self) -> Result<(HealthResponse, Value)> {
        self.get("/api/health").await
    }
}

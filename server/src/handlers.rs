//! HTTP handlers for the proof vault API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::*;
use crate::proof::ContentHash;
use crate::services::blockchain::WalletService;
use crate::services::registry::RegistryError;
use crate::services::vault::{StoredProof, Vault};
use crate::services::Services;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
    pub wallet: Option<Arc<WalletService>>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            vault: Arc::new(services.vault),
            wallet: services.wallet.map(Arc::new),
        }
    }
}

fn parse_hash(raw: &str) -> Result<ContentHash, AppError> {
    Ok(raw.parse::<ContentHash>()?)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        registry_contract: state.vault.registry_contract(),
        storage: state.vault.storage_source(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Seal, store and register a proof artifact
pub async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let request = json_body(payload)?;
    let receipt = state.vault.issue(request.proof_artifact).await?;

    let (registry_tx, registry_error) = match receipt.registration {
        Ok(tx) => (Some(tx), None),
        Err(e) => (None, Some(AppError::from(e).body())),
    };

    Ok(Json(UploadResponse {
        success: true,
        root_hash: receipt.storage.content_id,
        proof_hash: receipt.envelope.proof_hash,
        tx_hash: receipt.storage.tx_hash,
        network_root: receipt.storage.network_root,
        registry_tx,
        registry_error,
        wallet_address: receipt.envelope.signer_address,
        signature: receipt.envelope.signature,
        source: receipt.storage.source,
    }))
}

/// Fetch a stored proof and check its attestation
pub async fn get_proof(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<ProofResponse>, AppError> {
    let hash = parse_hash(&hash)?;
    let fetched = state.vault.fetch_proof(&hash).await?;

    let summary = fetched.stored.artifact().claims().ok().map(|c| c.summary());
    let check = fetched.signature;
    let signature_status = check.status;
    let signature_failure = check.failure.clone();

    let (proof_data, hotel_attestation) = match fetched.stored {
        StoredProof::Signed(envelope) => {
            let attestation = HotelAttestation {
                proof_hash: envelope.proof_hash,
                signature: envelope.signature,
                signer_address: check.signer.unwrap_or(envelope.signer_address),
                signature_valid: check.valid,
                custodian: check.custodian,
                verification_error: check.error,
                failure: check.failure,
            };
            (envelope.proof, Some(attestation))
        }
        StoredProof::Unsigned(artifact) => (artifact, None),
    };

    Ok(Json(ProofResponse {
        success: true,
        root_hash: hash,
        proof_data,
        hotel_attestation,
        signature_status,
        signature_failure,
        hash_matches: fetched.hash_matches,
        summary,
        source: fetched.source,
    }))
}

/// Full verdict: storage, signature and registry checks
pub async fn verify(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<VerifyResponse>, AppError> {
    let hash = parse_hash(&hash)?;
    let verdict = state.vault.verify(&hash).await;

    Ok(Json(VerifyResponse {
        success: true,
        trusted: verdict.trust.is_trusted(),
        verdict,
    }))
}

/// On-chain lifecycle record for a proof hash
pub async fn registry_status(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<RegistryResponse>, AppError> {
    let hash = parse_hash(&hash)?;
    let record = state.vault.record(&hash).await?;

    Ok(Json(RegistryResponse {
        success: true,
        proof_hash: hash,
        on_chain: record,
        contract_address: state.vault.registry_contract(),
    }))
}

pub async fn revoke(
    State(state): State<AppState>,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<RevokeResponse>, AppError> {
    let request = json_body(payload)?;
    let hash = parse_hash(&request.proof_hash)?;
    let tx_hash = state.vault.revoke(&hash).await?;

    Ok(Json(RevokeResponse {
        success: true,
        proof_hash: hash,
        tx_hash,
    }))
}

/// Custodial signer address, balance and network
pub async fn wallet(State(state): State<AppState>) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state
        .wallet
        .as_ref()
        .ok_or_else(|| RegistryError::Signing("No signing key configured".to_string()))?;

    Ok(Json(wallet.describe().await?))
}

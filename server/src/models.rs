//! Data models for API requests/responses

use serde::{Deserialize, Serialize};

use crate::error::ErrorBody;
use crate::proof::{ContentHash, ProofArtifact, SignatureFailure};
use crate::services::registry::RegistryRecord;
use crate::services::storage::StorageSource;
use crate::services::vault::{SignatureStatus, VerificationVerdict};

/// Upload request from the kiosk. A `privateKey` field, if sent, is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub proof_artifact: ProofArtifact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// Lookup key for every later call; equal to `proofHash`
    pub root_hash: ContentHash,
    pub proof_hash: ContentHash,
    /// Storage network transaction, absent in local fallback mode
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_root: Option<String>,
    /// Null when on-chain registration did not happen
    pub registry_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_error: Option<ErrorBody>,
    pub wallet_address: String,
    pub signature: String,
    pub source: StorageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelAttestation {
    pub proof_hash: ContentHash,
    pub signature: String,
    pub signer_address: String,
    pub signature_valid: bool,
    /// Signed by this server's own key
    #[serde(default)]
    pub custodian: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<SignatureFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub success: bool,
    pub root_hash: ContentHash,
    pub proof_data: ProofArtifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_attestation: Option<HotelAttestation>,
    pub signature_status: SignatureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_failure: Option<SignatureFailure>,
    pub hash_matches: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub source: StorageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub trusted: bool,
    pub verdict: VerificationVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryResponse {
    pub success: bool,
    pub proof_hash: ContentHash,
    pub on_chain: RegistryRecord,
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub proof_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub success: bool,
    pub proof_hash: ContentHash,
    pub tx_hash: String,
}

/// Custodial signer account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub address: String,
    /// Native balance in whole units (ether-denominated)
    pub balance: String,
    pub network: String,
    pub chain_id: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub registry_contract: Option<String>,
    pub storage: StorageSource,
    pub version: String,
}

//! Proof lifecycle orchestration
//!
//! - issue: validate -> attest -> seal -> store -> register (best-effort)
//! - verify: fetch || registry read -> re-hash -> recover signer -> verdict
//! - revoke: registry transition only

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, ErrorBody};
use crate::proof::{
    checksum, now_millis, AttestationSigner, ContentHash, ProofArtifact, ProofError,
    SignatureFailure, SignedEnvelope,
};
use crate::services::registry::{ProofRegistry, RegistryError, RegistryRecord, TxId};
use crate::services::storage::{StorageBackend, StorageError, StorageSource, StoreReceipt};

/// What a storage object decodes to. Proofs stored before attestation existed are bare artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredProof {
    Signed(SignedEnvelope),
    Unsigned(ProofArtifact),
}

impl StoredProof {
    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        if let Ok(envelope) = serde_json::from_slice::<SignedEnvelope>(bytes) {
            return Ok(StoredProof::Signed(envelope));
        }
        serde_json::from_slice::<ProofArtifact>(bytes)
            .map(StoredProof::Unsigned)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    pub fn artifact(&self) -> &ProofArtifact {
        match self {
            StoredProof::Signed(envelope) => &envelope.proof,
            StoredProof::Unsigned(artifact) => artifact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureStatus {
    NotChecked,
    Unsigned,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureCheck {
    pub status: SignatureStatus,
    pub valid: bool,
    /// Address recovered from the signature, or the claimed one when recovery failed
    pub signer: Option<String>,
    pub error: Option<String>,
    pub failure: Option<SignatureFailure>,
    /// Valid signature from this vault's configured signing key
    pub custodian: bool,
}

impl SignatureCheck {
    fn not_checked() -> Self {
        Self {
            status: SignatureStatus::NotChecked,
            valid: false,
            signer: None,
            error: None,
            failure: None,
            custodian: false,
        }
    }

    fn failed(signer: Option<String>, failure: SignatureFailure) -> Self {
        Self {
            status: SignatureStatus::Invalid,
            signer,
            error: Some(failure.to_string()),
            failure: Some(failure),
            ..Self::not_checked()
        }
    }

    fn unsigned() -> Self {
        Self {
            status: SignatureStatus::Unsigned,
            ..Self::not_checked()
        }
    }

    pub fn of(envelope: &SignedEnvelope, requested: &ContentHash) -> Self {
        match envelope.check(requested) {
            Ok(signer) => Self {
                status: SignatureStatus::Valid,
                valid: true,
                signer: Some(checksum(&signer)),
                ..Self::not_checked()
            },
            Err(failure) => Self::failed(Some(envelope.signer_address.clone()), failure),
        }
    }

    /// Bare artifacts must hash to their key and must not claim an attestation.
    pub fn of_unsigned(artifact: &ProofArtifact, requested: &ContentHash) -> Self {
        let actual = match ContentHash::of(artifact) {
            Ok(actual) => actual,
            Err(e) => {
                return Self::failed(
                    None,
                    SignatureFailure::Unhashable {
                        detail: e.to_string(),
                    },
                )
            }
        };
        if actual != *requested {
            return Self::failed(
                None,
                SignatureFailure::HashMismatch {
                    expected: *requested,
                    actual,
                },
            );
        }
        match &artifact.attestation {
            Some(attestation) => Self::failed(
                Some(attestation.verifier_address.clone()),
                SignatureFailure::SignatureMissing {
                    verifier: attestation.verifier_address.clone(),
                },
            ),
            None => Self::unsigned(),
        }
    }

    fn hash_matches(&self) -> bool {
        !matches!(
            self.failure,
            Some(SignatureFailure::HashMismatch { .. }) | Some(SignatureFailure::Unhashable { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageCheck {
    pub found: bool,
    pub source: StorageSource,
    /// Whether the stored proof re-hashes to the key it was fetched under
    pub hash_matches: Option<bool>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCheck {
    pub record: Option<RegistryRecord>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageTrust {
    Unknown,
    FoundUnsigned,
    FoundSignedValid,
    FoundSignedInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainTrust {
    Unknown,
    OnChainValid,
    OnChainRevoked,
    OnChainAbsent,
}

impl ChainTrust {
    pub fn of(record: &RegistryRecord) -> Self {
        match (record.exists, record.valid) {
            (false, _) => ChainTrust::OnChainAbsent,
            (true, true) => ChainTrust::OnChainValid,
            (true, false) => ChainTrust::OnChainRevoked,
        }
    }
}

impl StorageTrust {
    /// Found payloads that fail any integrity check land in `FoundSignedInvalid`.
    fn of(signature: &SignatureCheck) -> Self {
        match signature.status {
            SignatureStatus::Valid => StorageTrust::FoundSignedValid,
            SignatureStatus::Invalid => StorageTrust::FoundSignedInvalid,
            SignatureStatus::Unsigned | SignatureStatus::NotChecked => StorageTrust::FoundUnsigned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustStatus {
    pub storage: StorageTrust,
    pub chain: ChainTrust,
    /// Signature recovered to this vault's own signing key
    pub custodian: bool,
}

impl TrustStatus {
    pub fn is_trusted(&self) -> bool {
        self.custodian
            && self.storage == StorageTrust::FoundSignedValid
            && self.chain == ChainTrust::OnChainValid
    }
}

/// Consolidated result of every independent check on one proof hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationVerdict {
    pub proof_hash: ContentHash,
    pub storage: StorageCheck,
    pub proof: Option<ProofArtifact>,
    pub summary: Option<String>,
    /// Every check carried by the claim came back positive
    pub satisfied: Option<bool>,
    pub signature: SignatureCheck,
    pub registry: RegistryCheck,
    pub trust: TrustStatus,
}

/// Storage read plus signature check, without the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedProof {
    pub stored: StoredProof,
    pub signature: SignatureCheck,
    pub hash_matches: bool,
    pub source: StorageSource,
}

#[derive(Debug, Clone)]
pub struct IssueReceipt {
    pub envelope: SignedEnvelope,
    pub storage: StoreReceipt,
    pub registration: Result<TxId, RegistryError>,
}

pub struct Vault {
    storage: Arc<dyn StorageBackend>,
    registry: Option<Arc<dyn ProofRegistry>>,
    signer: Option<AttestationSigner>,
    verifier_id: String,
}

impl Vault {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: Option<Arc<dyn ProofRegistry>>,
        signer: Option<AttestationSigner>,
        verifier_id: &str,
    ) -> Self {
        Self {
            storage,
            registry,
            signer,
            verifier_id: verifier_id.to_string(),
        }
    }

    pub fn storage_source(&self) -> StorageSource {
        self.storage.source()
    }

    pub fn signer_address(&self) -> Option<String> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn registry_contract(&self) -> Option<String> {
        self.registry.as_ref().and_then(|r| r.contract_address())
    }

    fn registry(&self) -> Result<&Arc<dyn ProofRegistry>, RegistryError> {
        self.registry.as_ref().ok_or(RegistryError::Disabled)
    }

    /// Build/sign/store failures abort. A registry failure after a successful
    /// store is returned inside the receipt.
    pub async fn issue(&self, artifact: ProofArtifact) -> Result<IssueReceipt, AppError> {
        artifact.validate()?;

        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| ProofError::Signing("No signing key configured".to_string()))?;

        let attested = artifact.attest(&self.verifier_id, &signer.address(), now_millis());
        let envelope = signer.seal(attested)?;
        let bytes = envelope.to_bytes()?;

        tracing::info!(
            "Sealed {} proof {} (signer {})",
            envelope.proof.kind,
            envelope.proof_hash,
            envelope.signer_address
        );

        let storage = self.storage.store(&envelope.proof_hash, &bytes).await?;

        let registration = match self.registry() {
            Ok(registry) => registry.register(&envelope.proof_hash).await,
            Err(e) => Err(e),
        };
        match &registration {
            Ok(tx) => tracing::info!("Proof {} registered: tx={}", envelope.proof_hash, tx),
            Err(e) => tracing::warn!(
                "Proof {} stored but not registered: {}",
                envelope.proof_hash,
                e
            ),
        }

        Ok(IssueReceipt {
            envelope,
            storage,
            registration,
        })
    }

    fn inspect(&self, hash: &ContentHash, bytes: &[u8]) -> Result<FetchedProof, StorageError> {
        let stored = StoredProof::decode(bytes)?;
        let mut signature = match &stored {
            StoredProof::Signed(envelope) => SignatureCheck::of(envelope, hash),
            StoredProof::Unsigned(artifact) => SignatureCheck::of_unsigned(artifact, hash),
        };

        let custodian = self.signer_address();
        signature.custodian = signature.valid
            && custodian.is_some()
            && signature.signer.as_deref() == custodian.as_deref();

        let hash_matches = signature.hash_matches();
        if !hash_matches {
            tracing::warn!("Stored proof under {} does not hash to its key", hash);
        }
        if let Some(failure) = &signature.failure {
            tracing::warn!("Stored proof under {} failed its signature check: {}", hash, failure);
        } else if signature.valid && !signature.custodian {
            tracing::warn!(
                "Stored proof under {} is signed by a foreign key {:?}",
                hash,
                signature.signer
            );
        }

        Ok(FetchedProof {
            stored,
            signature,
            hash_matches,
            source: self.storage.source(),
        })
    }

    pub async fn fetch_proof(&self, hash: &ContentHash) -> Result<FetchedProof, AppError> {
        let bytes = self.storage.fetch(hash).await?;
        Ok(self.inspect(hash, &bytes)?)
    }

    pub async fn record(&self, hash: &ContentHash) -> Result<RegistryRecord, AppError> {
        Ok(self.registry()?.record(hash).await?)
    }

    pub async fn revoke(&self, hash: &ContentHash) -> Result<TxId, AppError> {
        let tx = self.registry()?.revoke(hash).await?;
        tracing::info!("Proof {} revoked: tx={}", hash, tx);
        Ok(tx)
    }

    /// Never fails as a whole; each sub-check reports its own outcome.
    pub async fn verify(&self, hash: &ContentHash) -> VerificationVerdict {
        let registry_read = async {
            match self.registry() {
                Ok(registry) => registry.record(hash).await,
                Err(e) => Err(e),
            }
        };
        let (fetched, record) = tokio::join!(self.storage.fetch(hash), registry_read);

        let source = self.storage.source();
        let inspected = fetched.and_then(|bytes| self.inspect(hash, &bytes));

        let (storage, proof, signature, storage_trust) = match inspected {
            Ok(fetched) => {
                let trust = StorageTrust::of(&fetched.signature);
                (
                    StorageCheck {
                        found: true,
                        source,
                        hash_matches: Some(fetched.hash_matches),
                        error: None,
                    },
                    Some(fetched.stored.artifact().clone()),
                    fetched.signature,
                    trust,
                )
            }
            Err(e) => {
                let corrupt = matches!(e, StorageError::Corrupt(_));
                (
                    StorageCheck {
                        found: corrupt,
                        source,
                        hash_matches: if corrupt { Some(false) } else { None },
                        error: Some(AppError::from(e).body()),
                    },
                    None,
                    SignatureCheck::not_checked(),
                    if corrupt {
                        StorageTrust::FoundSignedInvalid
                    } else {
                        StorageTrust::Unknown
                    },
                )
            }
        };

        let (registry, chain_trust) = match record {
            Ok(record) => {
                let trust = ChainTrust::of(&record);
                (
                    RegistryCheck {
                        record: Some(record),
                        error: None,
                    },
                    trust,
                )
            }
            Err(e) => (
                RegistryCheck {
                    record: None,
                    error: Some(AppError::from(e).body()),
                },
                ChainTrust::Unknown,
            ),
        };

        let claims = proof.as_ref().and_then(|p| p.claims().ok());
        let summary = claims.as_ref().map(|c| c.summary());
        let satisfied = claims.as_ref().map(|c| c.satisfied());

        let trust = TrustStatus {
            storage: storage_trust,
            chain: chain_trust,
            custodian: signature.custodian,
        };

        tracing::info!(
            "Verified {}: storage={:?}, chain={:?}, custodian={}",
            hash,
            trust.storage,
            trust.chain,
            trust.custodian
        );

        VerificationVerdict {
            proof_hash: *hash,
            storage,
            proof,
            summary,
            satisfied,
            signature,
            registry,
            trust,
        }
    }
}

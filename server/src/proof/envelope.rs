//! Content addressing and custodial attestation signatures
//!
//! `proofHash = SHA-256(JCS(proof))`. The hash is signed with the EIP-191
//! personal-message convention so anyone can recover the signer address from
//! `(proofHash, signature)` without a separate public key.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature};
use ethers::utils::{hash_message, to_checksum};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::artifact::ProofArtifact;
use super::ProofError;

/// 32-byte content identifier used for signing, storage lookup and registry keying.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn digest(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn of(artifact: &ProofArtifact) -> Result<Self, ProofError> {
        Ok(Self::digest(&canonical_bytes(artifact)?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without prefix, used for file names.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

impl FromStr for ContentHash {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 64 {
            return Err(ProofError::InvalidArgument(format!(
                "Proof hash must be 32 bytes of hex, got {:?}",
                s
            )));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|e| ProofError::InvalidArgument(format!("Invalid proof hash: {}", e)))?;
        Ok(Self(out))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// RFC 8785 canonical JSON of any serializable value.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProofError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ProofError::InvalidArgument(format!("Unserializable proof: {}", e)))?;
    serde_json_canonicalizer::to_vec(&value)
        .map_err(|e| ProofError::InvalidArgument(format!("Canonicalization failed: {}", e)))
}

pub fn canonical_bytes(artifact: &ProofArtifact) -> Result<Vec<u8>, ProofError> {
    canonical_json(artifact)
}

/// Why a signed envelope failed its integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureFailure {
    HashMismatch { expected: ContentHash, actual: ContentHash },
    /// Proof content could not be canonicalized, so no hash exists to compare
    Unhashable { detail: String },
    SignerMismatch { claimed: String, recovered: String },
    MalformedSignature { detail: String },
    /// Attested proof stored without its envelope
    SignatureMissing { verifier: String },
}

impl fmt::Display for SignatureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureFailure::HashMismatch { expected, actual } => write!(
                f,
                "Proof hash mismatch: expected {}, proof content hashes to {}",
                expected, actual
            ),
            SignatureFailure::SignerMismatch { claimed, recovered } => write!(
                f,
                "Signer mismatch: envelope claims {}, signature recovers {}",
                claimed, recovered
            ),
            SignatureFailure::Unhashable { detail } => {
                write!(f, "Proof content cannot be hashed: {}", detail)
            }
            SignatureFailure::MalformedSignature { detail } => {
                write!(f, "Malformed signature: {}", detail)
            }
            SignatureFailure::SignatureMissing { verifier } => write!(
                f,
                "Proof carries an attestation by {} but no signature",
                verifier
            ),
        }
    }
}

pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

pub fn parse_signature(signature: &str) -> Result<Signature, SignatureFailure> {
    let digits = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(digits).map_err(|e| SignatureFailure::MalformedSignature {
        detail: e.to_string(),
    })?;
    Signature::try_from(bytes.as_slice()).map_err(|e| SignatureFailure::MalformedSignature {
        detail: e.to_string(),
    })
}

/// Recover the address that produced `signature` over `hash`.
pub fn recover_signer(hash: &ContentHash, signature: &str) -> Result<Address, SignatureFailure> {
    let signature = parse_signature(signature)?;
    signature
        .recover(hash.as_bytes().to_vec())
        .map_err(|e| SignatureFailure::MalformedSignature {
            detail: e.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    pub proof: ProofArtifact,
    pub proof_hash: ContentHash,
    pub signature: String,
    pub signer_address: String,
}

impl SignedEnvelope {
    /// Re-derive the hash from `proof` and recover the signer.
    ///
    /// `requested` is the key the envelope was looked up under. The recovered
    /// signer must match both `signerAddress` and, when present, the hashed
    /// `attestation.verifierAddress`.
    pub fn check(&self, requested: &ContentHash) -> Result<Address, SignatureFailure> {
        let actual = ContentHash::of(&self.proof).map_err(|e| SignatureFailure::Unhashable {
            detail: e.to_string(),
        })?;
        if actual != *requested {
            return Err(SignatureFailure::HashMismatch {
                expected: *requested,
                actual,
            });
        }
        if self.proof_hash != actual {
            return Err(SignatureFailure::HashMismatch {
                expected: self.proof_hash,
                actual,
            });
        }

        let recovered = recover_signer(&actual, &self.signature)?;
        let claimed: Address = self.signer_address.parse().map_err(|_| {
            SignatureFailure::SignerMismatch {
                claimed: self.signer_address.clone(),
                recovered: checksum(&recovered),
            }
        })?;
        if claimed != recovered {
            return Err(SignatureFailure::SignerMismatch {
                claimed: self.signer_address.clone(),
                recovered: checksum(&recovered),
            });
        }

        if let Some(attestation) = &self.proof.attestation {
            let verifier: Option<Address> = attestation.verifier_address.parse().ok();
            if verifier != Some(recovered) {
                return Err(SignatureFailure::SignerMismatch {
                    claimed: attestation.verifier_address.clone(),
                    recovered: checksum(&recovered),
                });
            }
        }
        Ok(recovered)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        canonical_json(self)
    }
}

/// Custodial key that witnesses proofs.
#[derive(Clone)]
pub struct AttestationSigner {
    wallet: LocalWallet,
}

impl fmt::Debug for AttestationSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl AttestationSigner {
    pub fn from_hex(secret: &str) -> Result<Self, ProofError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(ProofError::Signing("No signing key configured".to_string()));
        }
        let digits = secret.strip_prefix("0x").unwrap_or(secret);
        let wallet = LocalWallet::from_str(digits)
            .map_err(|e| ProofError::Signing(format!("Invalid signing key: {}", e)))?;
        Ok(Self { wallet })
    }

    pub fn address(&self) -> String {
        checksum(&self.wallet.address())
    }

    pub fn sign_hash(&self, hash: &ContentHash) -> Result<String, ProofError> {
        let digest = hash_message(hash.as_bytes());
        let signature = self
            .wallet
            .sign_hash(digest)
            .map_err(|e| ProofError::Signing(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }

    /// Hash the artifact as-is and sign the hash.
    pub fn seal(&self, artifact: ProofArtifact) -> Result<SignedEnvelope, ProofError> {
        let proof_hash = ContentHash::of(&artifact)?;
        let signature = self.sign_hash(&proof_hash)?;
        Ok(SignedEnvelope {
            proof: artifact,
            proof_hash,
            signature,
            signer_address: self.address(),
        })
    }
}

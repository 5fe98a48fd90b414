//! Proof lifecycle core: build, canonicalize, hash, sign

pub mod artifact;
pub mod claims;
pub mod envelope;

pub use artifact::{now_millis, Attestation, ProofArtifact, ProofKind};
pub use claims::ProofClaims;
pub use envelope::{
    canonical_bytes, checksum, recover_signer, AttestationSigner, ContentHash, SignatureFailure,
    SignedEnvelope,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

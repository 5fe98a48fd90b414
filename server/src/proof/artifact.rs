//! Proof artifact: the SDK result plus the metadata that gets hashed with it

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::claims::ProofClaims;
use super::ProofError;

/// Verification flows the check-in kiosk can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    #[serde(rename = "age")]
    Age,
    #[serde(rename = "nationality")]
    Nationality,
    #[serde(rename = "eu-resident")]
    EuResident,
    #[serde(rename = "kyc")]
    Kyc,
    #[serde(rename = "facematch")]
    FaceMatch,
}

impl ProofKind {
    pub const ALL: [ProofKind; 5] = [
        ProofKind::Age,
        ProofKind::Nationality,
        ProofKind::EuResident,
        ProofKind::Kyc,
        ProofKind::FaceMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProofKind::Age => "age",
            ProofKind::Nationality => "nationality",
            ProofKind::EuResident => "eu-resident",
            ProofKind::Kyc => "kyc",
            ProofKind::FaceMatch => "facematch",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofKind {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProofKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ProofError::InvalidArgument(format!("Unknown proof type: {}", s)))
    }
}

/// Custodial witness statement, embedded before sealing so it is covered by the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub verifier_id: String,
    /// Milliseconds since epoch
    pub verified_at: u64,
    pub verifier_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    #[serde(rename = "type")]
    pub kind: ProofKind,
    pub verified: bool,
    pub raw_proof: Value,
    /// Milliseconds since epoch
    pub timestamp: u64,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
}

pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

impl ProofArtifact {
    /// Wrap a fresh SDK result, stamping the current time.
    pub fn build(
        raw_proof: Value,
        verified: bool,
        kind: &str,
        issuer: &str,
    ) -> Result<Self, ProofError> {
        let kind: ProofKind = kind.parse()?;
        let artifact = Self {
            kind,
            verified,
            raw_proof,
            timestamp: now_millis(),
            issuer: issuer.to_string(),
            attestation: None,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check an artifact that arrived already assembled (the upload path).
    pub fn validate(&self) -> Result<(), ProofError> {
        if self.issuer.trim().is_empty() {
            return Err(ProofError::InvalidArgument("issuer must not be empty".to_string()));
        }
        if self.timestamp == 0 {
            return Err(ProofError::InvalidArgument("timestamp must be set".to_string()));
        }
        self.claims().map(|_| ())
    }

    pub fn claims(&self) -> Result<ProofClaims, ProofError> {
        ProofClaims::parse(self.kind, &self.raw_proof)
    }

    /// Copy of this artifact carrying a witness statement.
    pub fn attest(&self, verifier_id: &str, verifier_address: &str, verified_at: u64) -> Self {
        Self {
            attestation: Some(Attestation {
                verifier_id: verifier_id.to_string(),
                verified_at,
                verifier_address: verifier_address.to_string(),
            }),
            ..self.clone()
        }
    }
}

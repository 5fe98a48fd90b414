//! Typed views over the passport SDK result, one per proof kind.
//!
//! The raw JSON is what gets hashed and stored. These types only exist to
//! reject payloads that do not have the shape their `type` promises.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::artifact::ProofKind;
use super::ProofError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Outcome<T> {
    pub result: T,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Disclosed<T> {
    pub disclose: Outcome<T>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Passed {
    pub passed: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgeBound {
    pub gte: Outcome<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgeClaim {
    pub age: AgeBound,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NationalityClaim {
    pub nationality: Disclosed<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EqCheck {
    pub eq: Outcome<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InCheck {
    #[serde(rename = "in")]
    pub within: Outcome<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EuResidentClaim {
    pub document_type: EqCheck,
    pub issuing_country: InCheck,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Sanctions {
    pub passed: bool,
    #[serde(default)]
    pub countries: BTreeMap<String, Passed>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KycClaim {
    pub fullname: Disclosed<Value>,
    pub nationality: Disclosed<Value>,
    pub birthdate: Disclosed<Value>,
    pub expiry_date: Disclosed<Value>,
    pub document_number: Disclosed<Value>,
    pub sanctions: Sanctions,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FaceMatchClaim {
    pub facematch: Passed,
}

/// Schema-checked view of `rawProof`, tagged by proof kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ProofClaims {
    Age(AgeClaim),
    Nationality(NationalityClaim),
    EuResident(EuResidentClaim),
    Kyc(KycClaim),
    FaceMatch(FaceMatchClaim),
}

fn parse<T: DeserializeOwned>(kind: ProofKind, raw: &Value) -> Result<T, ProofError> {
    T::deserialize(raw).map_err(|e| {
        ProofError::InvalidArgument(format!("rawProof does not match the {} schema: {}", kind, e))
    })
}

impl ProofClaims {
    pub fn parse(kind: ProofKind, raw: &Value) -> Result<Self, ProofError> {
        if !raw.is_object() {
            return Err(ProofError::InvalidArgument(
                "rawProof must be a JSON object".to_string(),
            ));
        }

        Ok(match kind {
            ProofKind::Age => Self::Age(parse(kind, raw)?),
            ProofKind::Nationality => Self::Nationality(parse(kind, raw)?),
            ProofKind::EuResident => Self::EuResident(parse(kind, raw)?),
            ProofKind::Kyc => Self::Kyc(parse(kind, raw)?),
            ProofKind::FaceMatch => Self::FaceMatch(parse(kind, raw)?),
        })
    }

    /// Whether every check the claim carries came back positive.
    pub fn satisfied(&self) -> bool {
        match self {
            Self::Age(c) => c.age.gte.result,
            Self::Nationality(_) => true,
            Self::EuResident(c) => c.document_type.eq.result && c.issuing_country.within.result,
            Self::Kyc(c) => c.sanctions.passed,
            Self::FaceMatch(c) => c.facematch.passed,
        }
    }

    /// One-line human summary for front desk display.
    pub fn summary(&self) -> String {
        match self {
            Self::Age(c) if c.age.gte.result => "Verified 18+".to_string(),
            Self::Age(_) => "Under 18".to_string(),
            Self::Nationality(c) => format!("Nationality: {}", c.nationality.disclose.result),
            Self::EuResident(c) => {
                if c.issuing_country.within.result && c.document_type.eq.result {
                    "EU resident (residence permit)".to_string()
                } else {
                    "Non-resident".to_string()
                }
            }
            Self::Kyc(c) => {
                let name = match &c.fullname.disclose.result {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let flagged: Vec<&str> = c
                    .sanctions
                    .countries
                    .iter()
                    .filter(|(_, p)| !p.passed)
                    .map(|(code, _)| code.as_str())
                    .collect();
                if c.sanctions.passed {
                    format!("{}: sanctions cleared", name)
                } else if flagged.is_empty() {
                    format!("{}: sanctions flagged", name)
                } else {
                    format!("{}: sanctions flagged ({})", name, flagged.join(", "))
                }
            }
            Self::FaceMatch(c) if c.facematch.passed => "Biometric match confirmed".to_string(),
            Self::FaceMatch(_) => "Biometric match failed".to_string(),
        }
    }
}

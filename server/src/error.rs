//! Error types for the proof vault server
//!
//! Every error carries a stable `ErrorKind` so callers can branch without
//! matching on message text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::proof::ProofError;
use crate::services::registry::RegistryError;
use crate::services::storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    NetworkError,
    SigningError,
    VerificationMismatch,
    AlreadyRegistered,
    AlreadyRevoked,
    NotRegistered,
    NotRegistrant,
    InsufficientFunds,
    TransactionFailed,
    StorageRejected,
    RegistryDisabled,
    Internal,
}

impl ErrorKind {
    /// Only transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkError)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound | ErrorKind::NotRegistered => StatusCode::NOT_FOUND,
            ErrorKind::NetworkError | ErrorKind::RegistryDisabled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::SigningError | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::VerificationMismatch
            | ErrorKind::AlreadyRegistered
            | ErrorKind::AlreadyRevoked => StatusCode::CONFLICT,
            ErrorKind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::NotRegistrant => StatusCode::FORBIDDEN,
            ErrorKind::TransactionFailed | ErrorKind::StorageRejected => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Serializable error value, used both in error responses and inside
/// partial results (verdicts, upload receipts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Proof(ProofError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            AppError::Proof(ProofError::Signing(_)) => ErrorKind::SigningError,
            AppError::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            AppError::Storage(StorageError::Network(_)) => ErrorKind::NetworkError,
            AppError::Storage(StorageError::Rejected(_)) => ErrorKind::StorageRejected,
            AppError::Storage(StorageError::Corrupt(_)) => ErrorKind::VerificationMismatch,
            AppError::Storage(StorageError::Io(_)) => ErrorKind::Internal,
            AppError::Registry(e) => match e {
                RegistryError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
                RegistryError::NotRegistered(_) => ErrorKind::NotRegistered,
                RegistryError::NotRegistrant(_) => ErrorKind::NotRegistrant,
                RegistryError::AlreadyRevoked(_) => ErrorKind::AlreadyRevoked,
                RegistryError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
                RegistryError::Network(_) => ErrorKind::NetworkError,
                RegistryError::TransactionFailed(_) => ErrorKind::TransactionFailed,
                RegistryError::Signing(_) => ErrorKind::SigningError,
                RegistryError::Disabled => ErrorKind::RegistryDisabled,
            },
            AppError::BadRequest(_) => ErrorKind::InvalidArgument,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let message = match self.kind() {
            ErrorKind::Internal => "Internal error".to_string(),
            _ => self.to_string(),
        };
        ErrorBody {
            kind: self.kind(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.body().message,
            "kind": kind,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::ContentHash;

    #[test]
    fn kinds_map_to_status_codes() {
        let h = ContentHash::digest(b"k");
        let cases = [
            (AppError::from(ProofError::InvalidArgument("x".into())), StatusCode::BAD_REQUEST),
            (AppError::from(StorageError::NotFound(h)), StatusCode::NOT_FOUND),
            (AppError::from(StorageError::Network("x".into())), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::from(StorageError::Rejected("413".into())), StatusCode::BAD_GATEWAY),
            (AppError::from(RegistryError::NotRegistrant(h)), StatusCode::FORBIDDEN),
            (AppError::from(RegistryError::AlreadyRevoked(h)), StatusCode::CONFLICT),
            (AppError::from(RegistryError::NotRegistered(h)), StatusCode::NOT_FOUND),
            (AppError::from(RegistryError::InsufficientFunds("x".into())), StatusCode::PAYMENT_REQUIRED),
            (AppError::from(RegistryError::Disabled), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.kind().status(), status, "{}", err);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let body = AppError::Internal("db password wrong".into()).body();
        assert_eq!(body.kind, ErrorKind::Internal);
        assert_eq!(body.message, "Internal error");
    }

    #[test]
    fn kind_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::VerificationMismatch).unwrap(),
            "\"VERIFICATION_MISMATCH\""
        );
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::StorageRejected.is_retryable());
    }
}

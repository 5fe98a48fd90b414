//! ZK Proof Vault
//!
//! Seals zero-knowledge identity proofs with a custodial attestation, stores
//! them content-addressed by `proofHash`, and tracks their lifecycle in an
//! on-chain registry.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod proof;
pub mod services;

pub use handlers::AppState;

/// Uploads carry whole SDK results, so the limit sits well above axum's default.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Proof lifecycle
        .route("/api/upload", post(handlers::upload))
        .route("/api/proof/:hash", get(handlers::get_proof))
        .route("/api/verify/:hash", get(handlers::verify))
        // Registry
        .route("/api/registry/revoke", post(handlers::revoke))
        .route("/api/registry/:hash", get(handlers::registry_status))
        // Signer account
        .route("/api/wallet", get(handlers::wallet))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

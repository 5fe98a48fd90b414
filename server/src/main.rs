//! Proof Vault Server
//!
//! HTTP API for sealing, storing, verifying and revoking identity proofs.

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proof_vault::config::Config;
use proof_vault::services::Services;
use proof_vault::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proof_vault=debug,server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Proof Vault Server");
    tracing::info!("Network: {} ({})", config.network_name, config.rpc_url);
    tracing::info!(
        "Storage: {:?}, registry: {:?}",
        config.storage_mode,
        config.registry_mode
    );

    let services = Services::from_config(&config)?;
    if let Some(address) = services.vault.signer_address() {
        tracing::info!("Attestation signer: {}", address);
    }

    let state = AppState::new(services);
    let app = proof_vault::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

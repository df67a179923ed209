//! Coffer API Server
//!
//! Main entry point for the wallet ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coffer_api::{AppState, create_router};
use coffer_core::WalletEngine;
use coffer_db::{PgWalletStore, connect};
use coffer_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coffer=debug,coffer_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let store = Arc::new(PgWalletStore::new(db));
    let engine = WalletEngine::new(store, config.wallet);
    info!(
        min_withdrawal = %config.wallet.min_withdrawal,
        max_commit_retries = config.wallet.max_commit_retries,
        "Wallet engine configured"
    );

    let app = create_router(AppState {
        engine: Arc::new(engine),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

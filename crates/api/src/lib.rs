//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes over the wallet engine
//! - Mapping of engine errors to JSON error responses

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use coffer_core::WalletEngine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Wallet engine; owns the store and the per-wallet locks.
    pub engine: Arc<WalletEngine>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

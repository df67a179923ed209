//! Health check endpoints.

use axum::{Json, Router, extract::State, routing::get};
use coffer_shared::types::Money;
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Smallest withdrawal the service accepts, so clients can validate up front.
    pub min_withdrawal: Money,
}

/// GET `/health`
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        min_withdrawal: state.engine.config().min_withdrawal,
    })
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

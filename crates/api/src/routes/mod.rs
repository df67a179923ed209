//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod health;
pub mod reconciliations;
pub mod settlements;
pub mod shippers;
pub mod wallets;
pub mod withdrawals;

#[cfg(test)]
mod tests;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(wallets::routes())
        .merge(settlements::routes())
        .merge(withdrawals::routes())
        .merge(reconciliations::routes())
        .merge(shippers::routes())
}

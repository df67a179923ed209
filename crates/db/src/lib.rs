//! Database layer with `SeaORM` entities and the PostgreSQL wallet store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the wallet ledger tables
//! - `PgWalletStore`, the PostgreSQL implementation of the engine's storage port
//! - Database migrations, including the append-only and invariant guards

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::PgWalletStore;

use coffer_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}

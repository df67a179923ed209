//! Application configuration management.

use serde::Deserialize;

use crate::types::Money;

/// Minimum withdrawal amount in minor units when none is configured.
pub const DEFAULT_MIN_WITHDRAWAL: Money = Money::new(50_000);

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Wallet business rules.
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Wallet business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WalletConfig {
    /// Smallest amount an owner may withdraw, in minor units.
    #[serde(default = "default_min_withdrawal")]
    pub min_withdrawal: Money,
    /// How many times a commit is retried after an optimistic version conflict.
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
}

fn default_min_withdrawal() -> Money {
    DEFAULT_MIN_WITHDRAWAL
}

fn default_max_commit_retries() -> u32 {
    3
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            min_withdrawal: default_min_withdrawal(),
            max_commit_retries: default_max_commit_retries(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COFFER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

//! Configuration management for the ledger services.
//!
//! Hierarchical loading:
//! 1. Default values in code
//! 2. `config/ledger.toml` (optional)
//! 3. Environment variable overrides with the `BACKOFFICE__` prefix,
//!    e.g. `BACKOFFICE__DATABASE__URL`, `BACKOFFICE__TRANSACTIONS__CONFLICT_RETRIES`

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use backoffice_observability::LogConfig;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    pub database: DatabaseConfig,
    pub transactions: TransactionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Empty means "use the in-memory store".
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TransactionConfig {
    /// How many times a conflicting transaction is re-validated and re-run.
    pub conflict_retries: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 1,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from `config/ledger.toml` and the environment.
    ///
    /// A `.env` file, when present, is read first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_from("config/ledger")
    }

    /// Load with an explicit config file stem (extension is inferred).
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("transactions.conflict_retries", 1)?
            .set_default("log.filter", "info")?
            .set_default("log.json", true)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("BACKOFFICE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

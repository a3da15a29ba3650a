//! Application configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;

/// Process-level configuration for anything that opens the Gestion database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_secs: u64,

    /// Apply embedded migrations on connect
    pub run_migrations: bool,

    /// tracing-subscriber filter directive
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig {
            database_path: lookup("GESTION_DATABASE_PATH")
                .unwrap_or_else(|| "./gestion.db".to_string())
                .into(),

            max_connections: lookup("GESTION_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GESTION_DB_MAX_CONNECTIONS".to_string()))?,

            busy_timeout_secs: lookup("GESTION_DB_BUSY_TIMEOUT_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GESTION_DB_BUSY_TIMEOUT_SECS".to_string()))?,

            run_migrations: lookup("GESTION_RUN_MIGRATIONS")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GESTION_RUN_MIGRATIONS".to_string()))?,

            log_filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "GESTION_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Pool configuration derived from these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
            .run_migrations(self.run_migrations)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

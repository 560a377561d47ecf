//! API server configuration.
//!
//! Configuration is loaded from environment variables (after an optional
//! `.env` file) with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use kasir_db::DbConfig;
use tracing::warn;

const DEV_JWT_SECRET: &str = "kasir-dev-secret-change-in-production";
const DEV_ADMIN_PASSWORD: &str = "admin123";

/// `tracing` filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "kasir_api=info,kasir_db=info,tower_http=info";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    pub db_max_connections: u32,

    /// How long a writer waits for SQLite's write lock
    pub db_busy_timeout_ms: u64,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Token lifetime in seconds (default: 24 hours)
    pub jwt_expiry_secs: i64,

    /// Admin account created when the user table is empty
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = ApiConfig {
            port: value("KASIR_PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KASIR_PORT".to_string()))?,

            database_path: PathBuf::from(value("DATABASE_PATH", "./kasir.db")),

            db_max_connections: value("DB_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,

            db_busy_timeout_ms: value("DB_BUSY_TIMEOUT_MS", "5000")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_BUSY_TIMEOUT_MS".to_string()))?,

            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| {
                // In production, this MUST be set via environment variable
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }),

            jwt_expiry_secs: value("JWT_EXPIRY_SECS", "86400")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_EXPIRY_SECS".to_string()))?,

            admin_email: value("ADMIN_EMAIL", "admin@kasir.com"),

            admin_password: lookup("ADMIN_PASSWORD").unwrap_or_else(|| DEV_ADMIN_PASSWORD.to_string()),

            admin_name: value("ADMIN_NAME", "Administrator"),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if config.jwt_expiry_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_EXPIRY_SECS".to_string()));
        }

        if config.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for [`kasir_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_millis(self.db_busy_timeout_ms))
    }

    pub fn uses_default_admin_password(&self) -> bool {
        self.admin_password == DEV_ADMIN_PASSWORD
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

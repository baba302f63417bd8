//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use poker_floor::{db::DatabaseConfig, notify::SUBSCRIBER_BUFFER};
use std::{net::SocketAddr, str::FromStr, time::Duration};

const DEFAULT_TICK_SECS: u64 = 5;

/// Where tournaments are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory, lost on restart
    Memory,
    /// PostgreSQL through `DATABASE_URL`
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("unknown backend '{}' (memory | postgres)", other),
            }),
        }
    }
}

/// Values given on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub storage: Option<StorageBackend>,
    pub tick_secs: Option<u64>,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub storage: StorageBackend,
    /// Database configuration, used with the Postgres backend
    pub database: DatabaseConfig,
    /// Clock scheduler period in seconds
    pub tick_secs: u64,
    /// Prometheus exporter address, exporter disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Per-watcher event buffer
    pub watcher_buffer: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let storage = match overrides.storage {
            Some(storage) => storage,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => StorageBackend::Memory,
            },
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = overrides.database_url {
            database = database.with_url(url);
        }

        let tick_secs = overrides
            .tick_secs
            .unwrap_or_else(|| parse_env_or("CLOCK_TICK_SECS", DEFAULT_TICK_SECS));

        let config = Self {
            bind,
            storage,
            database,
            tick_secs,
            metrics_bind: parse_addr("METRICS_BIND")?,
            watcher_buffer: parse_env_or("WATCHER_BUFFER", SUBSCRIBER_BUFFER),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "CLOCK_TICK_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.watcher_buffer == 0 {
            return Err(ConfigError::Invalid {
                var: "WATCHER_BUFFER".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.storage == StorageBackend::Postgres {
            if self.database.database_url.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "e.g. postgres://postgres@localhost/poker_floor".to_string(),
                });
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "must not exceed DB_MAX_CONNECTIONS ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Parse an optional socket address variable; set but malformed is an error
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("'{}' is not IP:PORT ({})", value, e),
                })
        }
        _ => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

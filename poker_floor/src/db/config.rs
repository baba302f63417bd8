//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("{} is not a valid value ({:?}), using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (default: development URL)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 1)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// Unparsable values fall back to their default with a warning.
    pub fn from_env() -> Self {
        let dev = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(dev.database_url),
            max_connections: env_or("DB_MAX_CONNECTIONS", dev.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", dev.min_connections),
            connection_timeout_secs: env_or("DB_CONNECTION_TIMEOUT", dev.connection_timeout_secs),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", dev.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", dev.max_lifetime_secs),
        }
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/poker_floor` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/poker_floor".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Replace the connection URL, keeping pool settings
    pub fn with_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert!(config.database_url.ends_with("/poker_floor"));
        assert!(config.max_connections >= config.min_connections);
    }

    #[test]
    fn test_with_url_keeps_pool_settings() {
        let config = DatabaseConfig::development().with_url("postgres://floor@db/floor");
        assert_eq!(config.database_url, "postgres://floor@db/floor");
        assert_eq!(config.max_connections, 10);
    }
}

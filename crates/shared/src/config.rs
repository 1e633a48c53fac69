//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
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

/// Event-ingestion worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Milliseconds to sleep between polling iterations.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of queued events claimed per polling iteration.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Delivery attempts before a retryable failure is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seconds a retryable failure stays invisible before redelivery.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    /// Upper bound on automatic follow-up transitions within one event.
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
            max_cascade_depth: default_max_cascade_depth(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_secs() -> u64 {
    30
}

fn default_max_cascade_depth() -> u32 {
    25
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("GRANARY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap().try_deserialize().unwrap()
    }

    #[test]
    fn test_worker_defaults() {
        let config = config_from(&[("database.url", "postgres://localhost/granary")]);
        assert_eq!(config.worker.poll_interval_ms, 1000);
        assert_eq!(config.worker.batch_size, 10);
        assert_eq!(config.worker.max_attempts, 5);
        assert_eq!(config.worker.retry_backoff_secs, 30);
        assert_eq!(config.worker.max_cascade_depth, 25);
    }

    #[test]
    fn test_database_defaults() {
        let config = config_from(&[("database.url", "postgres://localhost/granary")]);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 1);
    }

    #[test]
    fn test_worker_overrides() {
        let config = config_from(&[
            ("database.url", "postgres://localhost/granary"),
            ("worker.batch_size", "50"),
            ("worker.max_cascade_depth", "8"),
        ]);
        assert_eq!(config.worker.batch_size, 50);
        assert_eq!(config.worker.max_cascade_depth, 8);
    }

    #[test]
    fn test_missing_database_url_fails() {
        let result: Result<AppConfig, _> = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize();
        assert!(result.is_err());
    }
}

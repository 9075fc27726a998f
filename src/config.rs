//! Configuration management for the prime collector
//!
//! Values come from built-in defaults, an optional `config.toml`, then
//! `PRIME_COLLECTOR_*` environment variables, in increasing precedence.
//! Command-line overrides are applied on top by the binary.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Default location of the optional configuration file (extension inferred).
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Collector configuration, fixed for the lifetime of the process.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// IP address to bind the listener to
    pub bind_address: String,

    /// Port to listen on; 0 picks a free one
    pub port: u16,

    /// Number of distinct values to collect before shutting down
    pub capacity: usize,

    /// Maximum accepted size of a PEM public key, in bytes
    pub max_key_length: usize,

    /// How long shutdown waits for sessions to finish
    pub shutdown_grace_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            capacity: 800,
            max_key_length: 4096,
            shutdown_grace_ms: 1000,
        }
    }
}

impl CollectorConfig {
    /// Load configuration from `path` (if it exists) with environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("capacity", defaults.capacity as i64)?
            .set_default("max_key_length", defaults.max_key_length as i64)?
            .set_default("shutdown_grace_ms", defaults.shutdown_grace_ms as i64)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("PRIME_COLLECTOR").try_parsing(true))
            .build()?;

        let config: CollectorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Message(
                "capacity must be greater than 0".into(),
            ));
        }

        if self.max_key_length == 0 {
            return Err(ConfigError::Message(
                "max_key_length must be greater than 0".into(),
            ));
        }

        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Message("bind_address cannot be empty".into()));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

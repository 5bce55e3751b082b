//! Configuration management for docflow
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use docflow::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Talking to: {}", config.api.base_url);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `DOCFLOW__<section>__<key>`
//!
//! Examples:
//! - `DOCFLOW__API__BASE_URL=https://example.com/api`
//! - `DOCFLOW__API__TRIAL_MODE=true`
//! - `DOCFLOW__POLLING__INTERVAL_MS=500`
//! - `DOCFLOW__OUTPUT__MAX_DOWNLOAD_BYTES=1GB`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/docflow.toml`.
//! This can be overridden using the `DOCFLOW_CONFIG` environment variable.
//!
//! Credentials are not part of this file; see [`crate::credentials`].

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{ApiConfig, Config, HttpSettings, OutputConfig, PollingConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("docflow.toml");

        let toml_content = r#"
[api]
base_url = "https://docs.example.com/api"
credentials_path = "secrets/credentials.json"

[http]
connect_timeout_secs = 10
request_timeout_secs = 120
user_agent = "docflow-test"

[polling]
interval_ms = 1000
max_attempts = 60

[output]
max_download_bytes = "1GB"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.api.credentials_path.to_str(), Some("secrets/credentials.json"));
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.http.user_agent.as_deref(), Some("docflow-test"));
        assert_eq!(config.polling.max_attempts, 60);
        assert_eq!(config.output.max_download_bytes.as_u64(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_validation_runs_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("docflow.toml");

        fs::write(&config_path, "[polling]\ninterval_ms = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError(ValidationError::ZeroPollInterval))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("docflow.toml");

        fs::write(&config_path, "[polling\ninterval_ms = ").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}

use super::models::Config;
use config::{ConfigError, Environment, File, Map};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "DOCFLOW_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/docflow.toml";
const ENV_PREFIX: &str = "DOCFLOW";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    layered(config_path, None)?.try_deserialize()
}

/// File layer plus the `DOCFLOW__` environment layer. `env` replaces the
/// process environment when given.
pub(crate) fn layered(
    config_path: PathBuf,
    env: Option<Map<String, String>>,
) -> Result<config::Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // DOCFLOW__POLLING__INTERVAL_MS -> polling.interval_ms
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env),
    );

    builder.build()
}

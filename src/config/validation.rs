use super::models::Config;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Polling interval must be positive")]
    ZeroPollInterval,

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("Timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("max_download_bytes must be positive")]
    ZeroDownloadLimit,

    #[error("trial_mode is enabled but trial_signature is empty")]
    EmptyTrialSignature,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api(config)?;
    validate_http(config)?;
    validate_polling(config)?;
    validate_output(config)?;
    Ok(())
}

fn validate_api(config: &Config) -> Result<(), ValidationError> {
    let raw = &config.api.base_url;
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidBaseUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidBaseUrl {
            url: raw.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if config.api.trial_mode && config.api.trial_signature.trim().is_empty() {
        return Err(ValidationError::EmptyTrialSignature);
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    if config.http.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout_secs",
        });
    }
    if config.http.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout_secs",
        });
    }
    Ok(())
}

fn validate_polling(config: &Config) -> Result<(), ValidationError> {
    if config.polling.interval_ms == 0 {
        return Err(ValidationError::ZeroPollInterval);
    }
    if config.polling.max_attempts == 0 {
        return Err(ValidationError::ZeroMaxAttempts);
    }
    Ok(())
}

fn validate_output(config: &Config) -> Result<(), ValidationError> {
    if config.output.max_download_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroDownloadLimit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBaseUrl { .. })
        ));

        config.api.base_url = "ftp://example.com/api".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_polling() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;
        assert!(matches!(validate(&config), Err(ValidationError::ZeroPollInterval)));

        let mut config = Config::default();
        config.polling.max_attempts = 0;
        assert!(matches!(validate(&config), Err(ValidationError::ZeroMaxAttempts)));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.http.request_timeout_secs = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroTimeout {
                field: "request_timeout_secs"
            })
        ));
    }

    #[test]
    fn test_rejects_zero_download_limit() {
        let mut config = Config::default();
        config.output.max_download_bytes = ByteSize(0);
        assert!(matches!(validate(&config), Err(ValidationError::ZeroDownloadLimit)));
    }

    #[test]
    fn test_trial_mode_requires_placeholder() {
        let mut config = Config::default();
        config.api.trial_mode = true;
        config.api.trial_signature = String::new();
        assert!(matches!(validate(&config), Err(ValidationError::EmptyTrialSignature)));

        // Unused placeholder is irrelevant when signing
        config.api.trial_mode = false;
        assert!(validate(&config).is_ok());
    }
}

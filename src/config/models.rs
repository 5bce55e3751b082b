use crate::client::HttpConfig;
use crate::humanize::ByteSize;
use crate::poller::PollPolicy;
use crate::signing::{DEFAULT_TRIAL_SIGNATURE, SignatureMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Send `trial_signature` instead of signing requests
    #[serde(default)]
    pub trial_mode: bool,
    #[serde(default = "default_trial_signature")]
    pub trial_signature: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials_path: default_credentials_path(),
            trial_mode: false,
            trial_signature: default_trial_signature(),
        }
    }
}

fn default_base_url() -> String {
    "https://servicesapi.foxitsoftware.cn/api".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_trial_signature() -> String {
    DEFAULT_TRIAL_SIGNATURE.to_string()
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            request_timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// Poll loop bounds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub deadline_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            deadline_secs: None,
        }
    }
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    150 // 5 minutes at the default interval
}

/// Download limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: ByteSize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

fn default_max_download_bytes() -> ByteSize {
    ByteSize(512 * 1024 * 1024) // 512 MB
}

impl Config {
    pub fn signature_mode(&self) -> SignatureMode {
        if self.api.trial_mode {
            SignatureMode::Trial {
                placeholder: self.api.trial_signature.clone(),
            }
        } else {
            SignatureMode::Signed
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        let mut http = HttpConfig {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            ..HttpConfig::default()
        };
        if let Some(agent) = &self.http.user_agent {
            http.user_agent = agent.clone();
        }
        http
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::builder()
            .interval(Duration::from_millis(self.polling.interval_ms))
            .max_attempts(self.polling.max_attempts)
            .maybe_deadline(self.polling.deadline_secs.map(Duration::from_secs))
            .build()
    }
}

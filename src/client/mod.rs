//! HTTP client for the document service
//!
//! Wraps a `reqwest::Client` with the credentials and signing mode, and
//! implements [`TaskService`]: the three calls every workflow is made of.

mod download;
pub mod envelope;
mod status;
mod submit;

pub use status::classify_status_response;
pub use submit::parse_submit_response;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::operation::Operation;
use crate::signing::SignatureMode;
use crate::task::{StatusOutcome, TaskHandle};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("docflow/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The remote side of a workflow
///
/// [`ApiClient`] talks HTTP; tests plug in scripted implementations.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Upload the operation payload and create a task
    async fn submit(&self, operation: &Operation) -> Result<TaskHandle>;

    /// Read the task status once
    async fn query_status(&self, handle: &TaskHandle) -> StatusOutcome;

    /// Fetch the produced artifact in full
    async fn download(&self, result_id: &str, file_name: &str) -> Result<Bytes>;
}

pub struct ApiClient {
    http: Client,
    base_url: Url,
    credentials: Credentials,
    mode: SignatureMode,
    max_download_bytes: u64,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        mode: SignatureMode,
        config: &HttpConfig,
        max_download_bytes: u64,
    ) -> std::result::Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url,
            credentials,
            mode,
            max_download_bytes,
        })
    }

    /// `base_url` with `endpoint` appended as path segments
    fn endpoint_url(&self, endpoint: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(endpoint.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    /// Endpoint URL carrying `sn`, `clientId` and the extra `query` pairs.
    /// `signed` must already contain `clientId`.
    fn signed_url(&self, endpoint: &str, signed: &BTreeMap<String, String>, query: &[(&str, &str)]) -> Url {
        let sn = self.mode.signature(signed, self.credentials.secret());

        let mut url = self.endpoint_url(endpoint);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("sn", &sn);
            pairs.append_pair("clientId", self.credentials.client_id());
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// `clientId` plus the given pairs, ready for signing
    fn signing_params(&self, pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("clientId".to_string(), self.credentials.client_id().to_string());
        for (key, value) in pairs {
            params.insert(key.to_string(), value.to_string());
        }
        params
    }
}

#[async_trait]
impl TaskService for ApiClient {
    async fn submit(&self, operation: &Operation) -> Result<TaskHandle> {
        self.submit_operation(operation).await
    }

    async fn query_status(&self, handle: &TaskHandle) -> StatusOutcome {
        self.fetch_status(handle).await
    }

    async fn download(&self, result_id: &str, file_name: &str) -> Result<Bytes> {
        self.fetch_result(result_id, file_name).await
    }
}

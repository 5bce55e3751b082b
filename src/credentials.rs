//! API credentials (client id + shared secret)

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CLIENT_ID_ENV_VAR: &str = "DOCFLOW_CLIENT_ID";
const SECRET_ENV_VAR: &str = "DOCFLOW_SECRET_ID";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("cannot read credentials file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed credentials file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("credentials are missing a client id")]
    Missing,

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Client id and secret, fixed for the lifetime of a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    secret: String,
}

#[derive(Deserialize)]
struct CredentialsFile {
    client_credentials: ClientCredentials,
}

#[derive(Deserialize)]
struct ClientCredentials {
    client_id: String,
    secret_id: String,
}

impl Credentials {
    /// An empty secret is accepted (trial accounts), an empty client id is not.
    pub fn new(
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(CredentialsError::Missing);
        }

        Ok(Self {
            client_id,
            secret: secret.into(),
        })
    }

    /// Load from a JSON document of the form
    /// `{"client_credentials": {"client_id": "...", "secret_id": "..."}}`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed: CredentialsFile =
            serde_json::from_str(&raw).map_err(|source| CredentialsError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Loaded credentials file");

        Self::new(
            parsed.client_credentials.client_id,
            parsed.client_credentials.secret_id,
        )
    }

    /// Load from `DOCFLOW_CLIENT_ID` / `DOCFLOW_SECRET_ID`
    pub fn from_env() -> Result<Self, CredentialsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Credentials::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CredentialsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id =
            lookup(CLIENT_ID_ENV_VAR).ok_or(CredentialsError::MissingEnv(CLIENT_ID_ENV_VAR))?;
        let secret = lookup(SECRET_ENV_VAR).unwrap_or_default();
        Self::new(client_id, secret)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

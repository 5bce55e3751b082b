//! Submit, poll, download, persist
//!
//! A [`Workflow`] runs one [`Operation`] end to end and writes the produced
//! artifact to a destination path. Runs are strictly sequential; a workflow
//! may be reused for several runs and shares its [`Metrics`] across them.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::client::{ApiClient, ClientError, TaskService};
use crate::config::Config;
use crate::credentials::{Credentials, CredentialsError};
use crate::error::{Result, Stage, WorkflowError};
use crate::humanize::ByteSize;
use crate::observability::Metrics;
use crate::operation::Operation;
use crate::poller::{PollPolicy, ProgressObserver, poll_until_done};
use crate::task::TaskHandle;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("Failed to create API client: {0}")]
    Client(#[from] ClientError),
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub run_id: Uuid,
    pub task_id: String,
    pub result_id: String,
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct Workflow {
    service: Arc<dyn TaskService>,
    policy: PollPolicy,
    metrics: Arc<Metrics>,
}

impl Workflow {
    pub fn new(service: Arc<dyn TaskService>, policy: PollPolicy) -> Self {
        Self {
            service,
            policy,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// HTTP-backed workflow. Credentials are validated by the caller, so a
    /// missing or empty credential set never gets this far.
    pub fn from_config(config: &Config, credentials: Credentials) -> std::result::Result<Self, SetupError> {
        let client = ApiClient::new(
            &config.api.base_url,
            credentials,
            config.signature_mode(),
            &config.http_config(),
            config.output.max_download_bytes.as_u64(),
        )?;

        Ok(Self::new(Arc::new(client), config.poll_policy()))
    }

    /// Load credentials from `api.credentials_path`, or from the environment
    /// when that file does not exist, then build the HTTP-backed workflow
    pub fn connect(config: &Config) -> std::result::Result<Self, SetupError> {
        Self::connect_with(config, |key| std::env::var(key).ok())
    }

    fn connect_with<F>(config: &Config, lookup: F) -> std::result::Result<Self, SetupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = &config.api.credentials_path;
        let credentials = if path.exists() {
            Credentials::from_file(path)?
        } else {
            info!(path = %path.display(), "Credentials file not found, reading environment");
            Credentials::from_lookup(lookup)?
        };

        Self::from_config(config, credentials)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run `operation` and write its artifact to `destination`
    ///
    /// The destination is only touched once the full artifact is in memory,
    /// and is replaced atomically (temp file + rename).
    pub async fn run<O>(
        &self,
        operation: &Operation,
        destination: &Path,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport>
    where
        O: ProgressObserver + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow", %run_id, operation = operation.name());

        let result = self
            .run_stages(run_id, operation, destination, observer, cancel)
            .instrument(span)
            .await;

        match &result {
            Ok(_) => self.metrics.run_completed(),
            Err(err) => {
                self.metrics.run_failed();
                warn!(%run_id, operation = operation.name(), stage = %err.stage(), error = %err, "Workflow failed");
            }
        }

        result
    }

    async fn run_stages<O>(
        &self,
        run_id: Uuid,
        operation: &Operation,
        destination: &Path,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport>
    where
        O: ProgressObserver + ?Sized,
    {
        let file_name = destination_file_name(destination)?;

        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled { stage: Stage::Submit }),
            handle = self.service.submit(operation) => handle?,
        };
        self.metrics.task_submitted();

        let metered = Metered {
            inner: observer,
            metrics: &self.metrics,
        };
        let result_id =
            poll_until_done(self.service.as_ref(), &handle, &self.policy, &metered, cancel).await?;

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled { stage: Stage::Download }),
            bytes = self.service.download(&result_id, &file_name) => bytes?,
        };

        persist(destination, &bytes).await?;

        info!(
            task_id = %handle,
            result_id = %result_id,
            path = %destination.display(),
            size = %ByteSize(bytes.len() as u64),
            "Result saved"
        );

        Ok(WorkflowReport {
            run_id,
            task_id: handle.task_id().to_string(),
            result_id,
            path: destination.to_path_buf(),
            bytes: bytes.len() as u64,
        })
    }
}

/// Forwards to the caller's observer while counting status reads
struct Metered<'a, O: ?Sized> {
    inner: &'a O,
    metrics: &'a Metrics,
}

impl<O: ProgressObserver + ?Sized> ProgressObserver for Metered<'_, O> {
    fn on_progress(&self, task: &TaskHandle, percentage: u8) {
        self.metrics.status_read();
        self.inner.on_progress(task, percentage);
    }

    fn on_busy(&self, task: &TaskHandle, detail: &str) {
        self.metrics.busy_reply();
        self.inner.on_busy(task, detail);
    }
}

/// The service names the artifact after the destination's file name
fn destination_file_name(destination: &Path) -> Result<String> {
    destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| WorkflowError::Io {
            stage: Stage::Persist,
            path: destination.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
        })
}

/// Write `bytes` next to `destination`, then rename over it
async fn persist(destination: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |path: &Path, source: io::Error| WorkflowError::Io {
        stage: Stage::Persist,
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }

    let temp = temp_path(destination);
    let written = async {
        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|e| io_error(&temp, e))?;
        tokio::fs::rename(&temp, destination)
            .await
            .map_err(|e| io_error(destination, e))
    }
    .await;

    // no stray `.part` file on failure
    if written.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    written
}

fn temp_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persist_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("out/combine/result.pdf");

        persist(&destination, b"%PDF-1.7").await.unwrap();

        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"%PDF-1.7");
        let leftovers: Vec<_> = std::fs::read_dir(destination.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("result.pdf");
        std::fs::write(&destination, b"old").unwrap();

        persist(&destination, b"new contents").await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"new contents");
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // Renaming a file over a non-empty directory fails
        let destination = temp_dir.path().join("result.pdf");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep"), b"x").unwrap();

        let result = persist(&destination, b"%PDF-1.7").await;
        assert!(matches!(
            result,
            Err(WorkflowError::Io {
                stage: Stage::Persist,
                ..
            })
        ));

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["result.pdf".to_string()]);
    }

    #[test]
    fn test_connect_falls_back_to_environment() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.api.credentials_path = temp_dir.path().join("absent.json");

        let env = HashMap::from([
            ("DOCFLOW_CLIENT_ID", "abc"),
            ("DOCFLOW_SECRET_ID", "secret"),
        ]);
        let workflow = Workflow::connect_with(&config, |key| env.get(key).map(|v| v.to_string()));
        assert!(workflow.is_ok());

        let result = Workflow::connect_with(&config, |_| None);
        assert!(matches!(
            result,
            Err(SetupError::Credentials(CredentialsError::MissingEnv(
                "DOCFLOW_CLIENT_ID"
            )))
        ));
    }

    #[test]
    fn test_connect_prefers_credentials_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"client_credentials":{"client_id":"from-file","secret_id":"s"}}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.api.credentials_path = path;

        // The environment is never consulted when the file exists
        let workflow = Workflow::connect_with(&config, |key| {
            panic!("unexpected environment lookup of {key}")
        });
        assert!(workflow.is_ok());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path(Path::new("/tmp/out/result.pdf"));
        assert_eq!(temp.parent(), Some(Path::new("/tmp/out")));

        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".result.pdf."));
        assert!(name.ends_with(".part"));
    }

    #[test]
    fn test_destination_without_file_name() {
        let result = destination_file_name(Path::new("/"));
        assert!(matches!(
            result,
            Err(WorkflowError::Io {
                stage: Stage::Persist,
                ..
            })
        ));
    }
}

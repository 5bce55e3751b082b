//! Error taxonomy for the submit / poll / download pipeline

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Poll,
    Download,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Submit => "submit",
            Stage::Poll => "poll",
            Stage::Download => "download",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{stage}: transport error: {message}")]
    Transport { stage: Stage, message: String },

    #[error("{stage}: remote error (http {status}, code {code:?}): {body}")]
    Remote {
        stage: Stage,
        status: u16,
        code: Option<i64>,
        body: String,
    },

    #[error("{stage}: protocol error: {message}")]
    Protocol {
        stage: Stage,
        message: String,
        body: Option<String>,
    },

    #[error("poll: task {task_id} still running after {attempts} status queries")]
    AttemptsExhausted { task_id: String, attempts: u32 },

    #[error("poll: task {task_id} still running after {elapsed:?}")]
    DeadlineElapsed { task_id: String, elapsed: Duration },

    #[error("{stage}: cancelled")]
    Cancelled { stage: Stage },

    #[error("submit: cannot read input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: i/o error on {}: {source}", path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::Transport { stage, .. }
            | WorkflowError::Remote { stage, .. }
            | WorkflowError::Protocol { stage, .. }
            | WorkflowError::Cancelled { stage }
            | WorkflowError::Io { stage, .. } => *stage,
            WorkflowError::AttemptsExhausted { .. } | WorkflowError::DeadlineElapsed { .. } => {
                Stage::Poll
            }
            WorkflowError::Input { .. } => Stage::Submit,
        }
    }

    pub(crate) fn protocol(stage: Stage, message: impl Into<String>, body: Option<String>) -> Self {
        WorkflowError::Protocol {
            stage,
            message: message.into(),
            body,
        }
    }

    /// Map a reqwest failure onto a transport error for `stage`
    pub(crate) fn transport(stage: Stage, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        WorkflowError::Transport { stage, message }
    }
}

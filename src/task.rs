//! Task handles and status snapshots

use std::fmt;

use crate::error::WorkflowError;

/// Opaque identifier of a server-side task
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    task_id: String,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.task_id)
    }
}

/// One status read. Never mutated; every poll produces a fresh value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub percentage: u8,
    /// Only present once `percentage == 100`
    pub result_id: Option<String>,
    pub raw_detail: Option<String>,
}

/// Result of a single status query
#[derive(Debug)]
pub enum StatusOutcome {
    /// Successful read, task below 100%
    Running(TaskStatus),
    /// The service refused the query because the task is still working
    Busy { detail: String },
    Completed { status: TaskStatus, result_id: String },
    Failed(WorkflowError),
}

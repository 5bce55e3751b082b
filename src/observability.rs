//! Tracing setup and workflow counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters shared by every run of a [`crate::workflow::Workflow`]
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_submitted: AtomicU64,
    status_reads: AtomicU64,
    busy_replies: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_submitted", "Metric incremented");
    }

    pub fn status_read(&self) {
        self.status_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn busy_reply(&self) {
        self.busy_replies.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "busy_replies", "Metric incremented");
    }

    pub fn run_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_completed", "Metric incremented");
    }

    pub fn run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            status_reads: self.status_reads.load(Ordering::Relaxed),
            busy_replies: self.busy_replies.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tasks_submitted: u64,
    pub status_reads: u64,
    pub busy_replies: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
}

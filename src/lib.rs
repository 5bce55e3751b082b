pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod humanize;
pub mod observability;
pub mod operation;
pub mod poller;
pub mod signing;
pub mod task;
pub mod workflow;

pub use client::{ApiClient, HttpConfig, TaskService};
pub use credentials::Credentials;
pub use error::{Stage, WorkflowError};
pub use operation::Operation;
pub use poller::{LogProgress, PollPolicy, ProgressObserver, poll_until_done};
pub use task::{StatusOutcome, TaskHandle, TaskStatus};
pub use workflow::{Workflow, WorkflowReport};

//! Status polling
//!
//! Queries a task until it completes, fails, runs out of attempts, passes its
//! deadline or is cancelled. "Busy" replies (the service refusing a status
//! query while the task works) are treated exactly like a running status.

use bon::Builder;
use std::future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::TaskService;
use crate::error::{Result, Stage, WorkflowError};
use crate::task::{StatusOutcome, TaskHandle};

/// Bounds on a poll loop. Both `interval` and `max_attempts` are required.
#[derive(Debug, Clone, Builder)]
pub struct PollPolicy {
    /// Fixed delay between status queries
    pub interval: Duration,
    /// Maximum number of status queries; values below 1 are treated as 1
    pub max_attempts: u32,
    /// Wall-clock budget for the whole loop
    pub deadline: Option<Duration>,
}

/// Receives progress from the poll loop
pub trait ProgressObserver: Send + Sync {
    /// Called on every successful status read, including the final 100%
    fn on_progress(&self, task: &TaskHandle, percentage: u8);

    fn on_busy(&self, _task: &TaskHandle, _detail: &str) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&TaskHandle, u8) + Send + Sync,
{
    fn on_progress(&self, task: &TaskHandle, percentage: u8) {
        self(task, percentage)
    }
}

/// Observer that reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, task: &TaskHandle, percentage: u8) {
        info!(task_id = %task, percentage, "Task progress");
    }

    fn on_busy(&self, task: &TaskHandle, detail: &str) {
        debug!(task_id = %task, detail, "Task busy");
    }
}

/// Poll `handle` until it completes and return the result identifier
pub async fn poll_until_done<S, O>(
    service: &S,
    handle: &TaskHandle,
    policy: &PollPolicy,
    observer: &O,
    cancel: &CancellationToken,
) -> Result<String>
where
    S: TaskService + ?Sized,
    O: ProgressObserver + ?Sized,
{
    let started = Instant::now();
    let deadline_at = policy.deadline.map(|budget| started + budget);
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled { stage: Stage::Poll }),
            _ = wait_until(deadline_at) => return Err(deadline_elapsed(handle, started)),
            outcome = service.query_status(handle) => outcome,
        };

        match outcome {
            StatusOutcome::Completed { status, result_id } => {
                observer.on_progress(handle, status.percentage);
                info!(task_id = %handle, attempt, result_id = %result_id, "Task completed");
                return Ok(result_id);
            }
            StatusOutcome::Running(status) => {
                observer.on_progress(handle, status.percentage);
                debug!(task_id = %handle, attempt, percentage = status.percentage, "Task running");
            }
            StatusOutcome::Busy { detail } => {
                observer.on_busy(handle, &detail);
                debug!(
                    task_id = %handle,
                    attempt,
                    retry_in_ms = policy.interval.as_millis() as u64,
                    "Task is running, retrying"
                );
            }
            StatusOutcome::Failed(err) => {
                warn!(task_id = %handle, attempt, error = %err, "Status query failed");
                return Err(err);
            }
        }

        if attempt >= max_attempts {
            warn!(task_id = %handle, attempts = attempt, "Giving up on task");
            return Err(WorkflowError::AttemptsExhausted {
                task_id: handle.task_id().to_string(),
                attempts: attempt,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled { stage: Stage::Poll }),
            _ = wait_until(deadline_at) => return Err(deadline_elapsed(handle, started)),
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending().await,
    }
}

fn deadline_elapsed(handle: &TaskHandle, started: Instant) -> WorkflowError {
    WorkflowError::DeadlineElapsed {
        task_id: handle.task_id().to_string(),
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use crate::task::TaskStatus;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    enum Reply {
        Percent(u8),
        Done(&'static str),
        Busy,
        Error,
    }

    /// Replays a fixed sequence of status replies; repeats the last one
    struct Scripted {
        replies: Mutex<VecDeque<Reply>>,
        queries: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                queries: AtomicU32::new(0),
            }
        }

        fn queries(&self) -> u32 {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskService for Scripted {
        async fn submit(&self, _operation: &Operation) -> Result<TaskHandle> {
            Ok(TaskHandle::new("t1"))
        }

        async fn query_status(&self, _handle: &TaskHandle) -> StatusOutcome {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                match replies.front().unwrap() {
                    Reply::Percent(p) => Reply::Percent(*p),
                    Reply::Done(id) => Reply::Done(*id),
                    Reply::Busy => Reply::Busy,
                    Reply::Error => Reply::Error,
                }
            };

            match reply {
                Reply::Percent(percentage) => StatusOutcome::Running(TaskStatus {
                    percentage,
                    result_id: None,
                    raw_detail: None,
                }),
                Reply::Done(id) => StatusOutcome::Completed {
                    status: TaskStatus {
                        percentage: 100,
                        result_id: Some(id.to_string()),
                        raw_detail: None,
                    },
                    result_id: id.to_string(),
                },
                Reply::Busy => StatusOutcome::Busy {
                    detail: "The task is running".to_string(),
                },
                Reply::Error => StatusOutcome::Failed(WorkflowError::Remote {
                    stage: Stage::Poll,
                    status: 400,
                    code: Some(40001),
                    body: r#"{"data":{"detail":"Task not found"}}"#.to_string(),
                }),
            }
        }

        async fn download(&self, _result_id: &str, _file_name: &str) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::builder()
            .interval(Duration::from_millis(10))
            .max_attempts(max_attempts)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_sequence_until_complete() {
        let service = Scripted::new(vec![Reply::Percent(30), Reply::Percent(30), Reply::Done("X")]);
        let seen = Mutex::new(Vec::new());
        let observer = |_: &TaskHandle, p: u8| seen.lock().unwrap().push(p);

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy(10),
            &observer,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result, "X");
        assert_eq!(service.queries(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![30, 30, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_replies_are_retried() {
        let service = Scripted::new(vec![Reply::Busy, Reply::Busy, Reply::Done("Y")]);
        let seen = Mutex::new(Vec::new());
        let observer = |_: &TaskHandle, p: u8| seen.lock().unwrap().push(p);

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy(10),
            &observer,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result, "Y");
        assert_eq!(service.queries(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_stops_immediately() {
        let service = Scripted::new(vec![Reply::Error, Reply::Done("never")]);

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy(10),
            &LogProgress,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(WorkflowError::Remote { stage: Stage::Poll, .. })));
        assert_eq!(service.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_exhausted() {
        let service = Scripted::new(vec![Reply::Percent(10)]);

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy(4),
            &LogProgress,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(WorkflowError::AttemptsExhausted { attempts: 4, .. })
        ));
        assert_eq!(service.queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapsed() {
        let service = Scripted::new(vec![Reply::Busy]);
        let policy = PollPolicy::builder()
            .interval(Duration::from_secs(1))
            .max_attempts(1000)
            .deadline(Duration::from_millis(3500))
            .build();

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy,
            &LogProgress,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(WorkflowError::DeadlineElapsed { .. })));
        assert_eq!(service.queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let service = Scripted::new(vec![Reply::Percent(50)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            trigger.cancel();
        });

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy(1000),
            &LogProgress,
            &cancel,
        )
        .await;

        assert!(matches!(
            result,
            Err(WorkflowError::Cancelled { stage: Stage::Poll })
        ));
        assert!(service.queries() < 1000);
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_query() {
        let service = Scripted::new(vec![Reply::Done("Z")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = poll_until_done(
            &service,
            &TaskHandle::new("t1"),
            &policy(10),
            &LogProgress,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(WorkflowError::Cancelled { .. })));
        assert_eq!(service.queries(), 0);
    }
}

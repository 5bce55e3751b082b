//! Task status queries

use tracing::debug;

use super::ApiClient;
use super::envelope::{Envelope, busy_detail, envelope_code};
use crate::error::{Stage, WorkflowError};
use crate::task::{StatusOutcome, TaskHandle, TaskStatus};

impl ApiClient {
    pub(super) async fn fetch_status(&self, handle: &TaskHandle) -> StatusOutcome {
        let params = self.signing_params(&[("taskId", handle.task_id())]);
        let url = self.signed_url("task", &params, &[("taskId", handle.task_id())]);

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => return StatusOutcome::Failed(WorkflowError::transport(Stage::Poll, e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return StatusOutcome::Failed(WorkflowError::transport(Stage::Poll, e)),
        };

        debug!(task_id = %handle, status = status.as_u16(), "Status response received");
        classify_status_response(status.as_u16(), &body)
    }
}

/// Turn one status response into a [`StatusOutcome`]
///
/// - HTTP 2xx with `code == 0`: `Running` below 100%, `Completed` at 100%.
/// - Any failure whose `data.detail` contains the running marker: `Busy`.
/// - Anything else is `Failed`.
pub fn classify_status_response(http_status: u16, body: &str) -> StatusOutcome {
    let http_ok = (200..300).contains(&http_status);

    let envelope = match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) if http_ok && envelope.code == 0 => envelope,
        _ => return classify_failure(http_status, body, http_ok),
    };

    let raw_detail = envelope.detail().or_else(|| envelope.msg.clone());
    let Some(info) = envelope.task_info() else {
        return protocol_failure("response is missing data.taskInfo", body);
    };

    let Some(percentage) = info.percentage else {
        return protocol_failure("response is missing data.taskInfo.percentage", body);
    };

    let percentage = match u8::try_from(percentage) {
        Ok(p) if p <= 100 => p,
        _ => {
            return protocol_failure(format!("percentage {} outside 0..=100", percentage), body);
        }
    };

    if percentage < 100 {
        return StatusOutcome::Running(TaskStatus {
            percentage,
            result_id: None,
            raw_detail,
        });
    }

    match info.doc_id.as_deref().filter(|id| !id.is_empty()) {
        Some(result_id) => StatusOutcome::Completed {
            status: TaskStatus {
                percentage,
                result_id: Some(result_id.to_string()),
                raw_detail,
            },
            result_id: result_id.to_string(),
        },
        None => protocol_failure("completed task is missing data.taskInfo.docId", body),
    }
}

fn classify_failure(http_status: u16, body: &str, http_ok: bool) -> StatusOutcome {
    if let Some(detail) = busy_detail(body) {
        return StatusOutcome::Busy { detail };
    }

    let code = envelope_code(body);
    if http_ok && code.is_none_or(|code| code == 0) {
        return protocol_failure("invalid status response body", body);
    }

    StatusOutcome::Failed(WorkflowError::Remote {
        stage: Stage::Poll,
        status: http_status,
        code,
        body: body.to_string(),
    })
}

fn protocol_failure(message: impl Into<String>, body: &str) -> StatusOutcome {
    StatusOutcome::Failed(WorkflowError::protocol(
        Stage::Poll,
        message,
        Some(body.to_string()),
    ))
}

//! Task submission

use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use super::ApiClient;
use super::envelope::{Envelope, envelope_code};
use crate::error::{Result, Stage, WorkflowError};
use crate::operation::Operation;
use crate::task::TaskHandle;

impl ApiClient {
    /// Single multipart POST, no retry
    pub(super) async fn submit_operation(&self, operation: &Operation) -> Result<TaskHandle> {
        let params = operation.signing_params(self.credentials.client_id());
        let url = self.signed_url(operation.endpoint(), &params, &[]);
        let form = build_form(operation).await?;

        debug!(
            operation = operation.name(),
            endpoint = operation.endpoint(),
            files = operation.files().len(),
            "Submitting task"
        );

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| WorkflowError::transport(Stage::Submit, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WorkflowError::transport(Stage::Submit, e))?;

        if !status.is_success() {
            warn!(operation = operation.name(), status = status.as_u16(), "Submission rejected");
            return Err(WorkflowError::Remote {
                stage: Stage::Submit,
                status: status.as_u16(),
                code: envelope_code(&body),
                body,
            });
        }

        let handle = parse_submit_response(&body)?;
        info!(operation = operation.name(), task_id = %handle, "Task submitted");
        Ok(handle)
    }
}

async fn build_form(operation: &Operation) -> Result<Form> {
    let mut form = Form::new();

    for file in operation.files() {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|source| WorkflowError::Input {
                path: file.path.clone(),
                source,
            })?;

        let part = Part::bytes(data)
            .file_name(file.file_name())
            .mime_str(file.mime.as_ref())
            .map_err(|e| {
                WorkflowError::protocol(Stage::Submit, format!("invalid content type: {}", e), None)
            })?;

        form = form.part(file.field.clone(), part);
    }

    for (name, value) in operation.fields() {
        form = form.text(name.clone(), value.clone());
    }

    Ok(form)
}

/// Extract the task id from a submission body
///
/// A non-zero `code` or a missing `data.taskInfo.taskId` is a protocol error
/// carrying the body.
pub fn parse_submit_response(body: &str) -> Result<TaskHandle> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        WorkflowError::protocol(
            Stage::Submit,
            format!("invalid response body: {}", e),
            Some(body.to_string()),
        )
    })?;

    if envelope.code != 0 {
        let message = match &envelope.msg {
            Some(msg) => format!("service returned code {}: {}", envelope.code, msg),
            None => format!("service returned code {}", envelope.code),
        };
        return Err(WorkflowError::protocol(Stage::Submit, message, Some(body.to_string())));
    }

    envelope
        .task_info()
        .and_then(|info| info.task_id.as_deref())
        .filter(|id| !id.is_empty())
        .map(TaskHandle::new)
        .ok_or_else(|| {
            WorkflowError::protocol(
                Stage::Submit,
                "response is missing data.taskInfo.taskId",
                Some(body.to_string()),
            )
        })
}

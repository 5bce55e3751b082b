//! Result download

use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::ApiClient;
use super::envelope::envelope_code;
use crate::error::{Result, Stage, WorkflowError};
use crate::humanize::ByteSize;

impl ApiClient {
    /// Fetch the artifact in full. An empty body, one above the configured
    /// limit, or a JSON error envelope is rejected rather than handed to the
    /// caller.
    pub(super) async fn fetch_result(&self, result_id: &str, file_name: &str) -> Result<Bytes> {
        let query = [("docId", result_id), ("fileName", file_name)];
        let params = self.signing_params(&query);
        let url = self.signed_url("download", &params, &query);

        debug!(result_id, file_name, "Starting download");

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WorkflowError::transport(Stage::Download, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(result_id, status = status.as_u16(), "Download rejected");
            return Err(WorkflowError::Remote {
                stage: Stage::Download,
                status: status.as_u16(),
                code: envelope_code(&body),
                body,
            });
        }

        if let Some(length) = response.content_length() {
            self.check_size(length)?;
        }
        let json_body = is_json(&response);

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WorkflowError::transport(Stage::Download, e))?
        {
            self.check_size((body.len() + chunk.len()) as u64)?;
            body.extend_from_slice(&chunk);
        }
        let bytes = body.freeze();

        if bytes.is_empty() {
            return Err(WorkflowError::protocol(
                Stage::Download,
                "service returned an empty artifact",
                None,
            ));
        }

        // A failed download can still come back as 200 with an error envelope
        if json_body {
            let text = String::from_utf8_lossy(&bytes);
            if let Some(code) = envelope_code(&text).filter(|code| *code != 0) {
                warn!(result_id, code, "Download returned an error envelope");
                return Err(WorkflowError::Remote {
                    stage: Stage::Download,
                    status: status.as_u16(),
                    code: Some(code),
                    body: text.into_owned(),
                });
            }
        }

        debug!(result_id, size = %ByteSize(bytes.len() as u64), "Download completed");
        Ok(bytes)
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_download_bytes {
            return Err(WorkflowError::protocol(
                Stage::Download,
                format!(
                    "artifact of {} exceeds limit of {}",
                    ByteSize(size),
                    ByteSize(self.max_download_bytes)
                ),
                None,
            ));
        }
        Ok(())
    }
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_json_content_type)
}

fn is_json_content_type(value: &str) -> bool {
    value.parse::<mime::Mime>().is_ok_and(|content_type| {
        content_type.type_() == mime::APPLICATION
            && (content_type.subtype() == mime::JSON || content_type.suffix() == Some(mime::JSON))
    })
}

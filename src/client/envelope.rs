//! JSON envelopes returned by the service
//!
//! Field casing differs between endpoints (`taskid` / `taskId`,
//! `docid` / `docId`); both spellings are accepted everywhere.

use serde::Deserialize;
use serde_json::Value;

/// Substring the status endpoint puts in `data.detail` when it refuses a
/// query because the task has not finished yet
pub const TASK_RUNNING_MARKER: &str = "The task is running";

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<EnvelopeData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvelopeData {
    #[serde(rename = "taskInfo", default)]
    pub task_info: Option<TaskInfo>,
    #[serde(default)]
    pub detail: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskInfo {
    #[serde(rename = "taskId", alias = "taskid", default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub percentage: Option<i64>,
    #[serde(rename = "docId", alias = "docid", default)]
    pub doc_id: Option<String>,
}

impl Envelope {
    pub fn task_info(&self) -> Option<&TaskInfo> {
        self.data.as_ref().and_then(|data| data.task_info.as_ref())
    }

    pub fn detail(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.detail.as_ref())
            .map(|detail| match detail {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
    }
}

/// The `data.detail` text when an error body carries the "still running"
/// signal
///
/// Only `data.detail` is inspected; the body need not parse as a full
/// [`Envelope`] since error responses are not guaranteed to carry `code`.
pub fn busy_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value.get("data")?.get("detail")?.as_str()?;
    detail
        .contains(TASK_RUNNING_MARKER)
        .then(|| detail.to_string())
}

/// Application code of an arbitrary body, if it is JSON and carries one
pub fn envelope_code(body: &str) -> Option<i64> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("code")?.as_i64()
}

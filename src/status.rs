//! Classification of the `Status` section GENESIS attaches to most JSON answers.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{GenesisError, Result};

pub const SYSTEM_ERROR_CODE: i64 = -1;
pub const ADJUSTED_CODE: i64 = 22;
pub const TOO_LARGE_CODE: i64 = 98;
pub const JOB_ACCEPTED_CODE: i64 = 99;
pub const NO_OBJECT_CODE: i64 = 104;

const ERROR_TYPES: [&str; 2] = ["Error", "Fehler"];
const WARNING_TYPES: [&str; 2] = ["Warning", "Warnung"];

const SYSTEM_ERROR_MESSAGE: &str = "There is a system error. Please check your query parameters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Information,
    Warning,
    DeferredJob,
    Error,
    SystemError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusClassification {
    pub code: i64,
    pub kind: String,
    pub content: String,
}

/// The `Status` object as sent. Any field may be absent or `null`.
#[derive(Deserialize)]
struct RawStatus {
    #[serde(rename = "Code", default)]
    code: Option<i64>,
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(rename = "Content", default)]
    content: Option<String>,
}

impl From<RawStatus> for StatusClassification {
    fn from(raw: RawStatus) -> Self {
        Self {
            code: raw.code.unwrap_or(SYSTEM_ERROR_CODE),
            kind: raw.kind.unwrap_or_default(),
            content: raw.content.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct StatusEnvelope {
    #[serde(rename = "Status", default)]
    status: Option<Value>,
}

impl StatusClassification {
    pub fn category(&self) -> StatusKind {
        let kind = self.kind.trim();
        let is = |set: &[&str]| set.iter().any(|t| t.eq_ignore_ascii_case(kind));

        if self.code == SYSTEM_ERROR_CODE {
            StatusKind::SystemError
        } else if self.code == NO_OBJECT_CODE || is(&ERROR_TYPES[..]) {
            StatusKind::Error
        } else if self.code == TOO_LARGE_CODE {
            StatusKind::DeferredJob
        } else if self.code == ADJUSTED_CODE || is(&WARNING_TYPES[..]) {
            StatusKind::Warning
        } else if kind.eq_ignore_ascii_case("Information") {
            StatusKind::Information
        } else {
            StatusKind::Success
        }
    }
}

/// Reads the status section of a response body.
///
/// Returns `None` for bodies that are not JSON objects or carry no `Status`; those are plain
/// data payloads such as cube or CSV files. A `Status` that cannot be read is a system error.
pub fn interpret(body: &str) -> Option<StatusClassification> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    // `"Status": null` deserializes to `None` as well
    let status = serde_json::from_str::<StatusEnvelope>(trimmed).ok()?.status?;

    match serde_json::from_value::<RawStatus>(status) {
        Ok(raw) => Some(raw.into()),
        Err(e) => {
            tracing::debug!("unreadable status section: {}", e);
            Some(StatusClassification {
                code: SYSTEM_ERROR_CODE,
                kind: String::new(),
                content: String::new(),
            })
        }
    }
}

/// Raises the fatal categories and logs the informative ones.
///
/// `DeferredJob` is returned to the caller untouched, it is the job driver's business.
pub(crate) fn surface(status: &StatusClassification) -> Result<StatusKind> {
    let category = status.category();
    match category {
        StatusKind::SystemError => {
            let msg = if status.content.trim().is_empty() {
                SYSTEM_ERROR_MESSAGE.to_string()
            } else {
                status.content.clone()
            };
            return Err(GenesisError::ServiceSystem(msg));
        }
        StatusKind::Error => return Err(GenesisError::ServiceQuery(status.content.clone())),
        StatusKind::Warning => {
            tracing::warn!(code = status.code, "{}", status.content);
        }
        StatusKind::Information | StatusKind::Success => {
            if !status.content.is_empty() {
                tracing::info!(code = status.code, "{}", status.content);
            }
        }
        StatusKind::DeferredJob => {}
    }
    Ok(category)
}

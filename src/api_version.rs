//! Differences between the supported REST API versions.
//!
//! Endpoint, method names and the status response shape all hang off
//! [`ApiVersion`], so the client itself stays version-agnostic.

use crate::{error::Result, model::ReportDescription};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const SAINT_CREATE_EXPORT: &str = "Saint.ExportCreateJob";
pub const SAINT_CHECK_STATUS: &str = "Saint.CheckJobStatus";
pub const SAINT_GET_SEGMENT: &str = "Saint.ExportGetFileSegment";

const NOT_READY_ERROR: &str = "report_not_ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "1.3")]
    V1_3,
    #[default]
    #[serde(rename = "1.4")]
    V1_4,
}

/// How a version reports report-job progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusShape {
    /// A status call answers `{status}`; the report is fetched with a second call.
    Separate,
    /// A single call answers with the report, or with a `report_not_ready` error.
    Inline,
}

impl ApiVersion {
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::V1_3 => "https://api.omniture.com/admin/1.3/rest/",
            Self::V1_4 => "https://api.omniture.com/admin/1.4/rest/",
        }
    }

    pub fn status_shape(self) -> StatusShape {
        match self {
            Self::V1_3 => StatusShape::Separate,
            Self::V1_4 => StatusShape::Inline,
        }
    }

    pub fn queue_method(self, trended: bool) -> &'static str {
        match (self, trended) {
            (Self::V1_3, true) => "Report.QueueTrended",
            (Self::V1_3, false) => "Report.QueueOvertime",
            (Self::V1_4, _) => "Report.Queue",
        }
    }

    pub fn status_method(self) -> &'static str {
        match self {
            Self::V1_3 => "Report.GetStatus",
            Self::V1_4 => "Report.Get",
        }
    }

    /// Only versions with a separate status call need a fetch call.
    pub fn fetch_method(self) -> Option<&'static str> {
        match self {
            Self::V1_3 => Some("Report.GetReport"),
            Self::V1_4 => None,
        }
    }

    pub fn queue_payload(self, description: &ReportDescription) -> Result<Value> {
        let description = serde_json::to_value(description)?;
        Ok(match self {
            // validation rejects reports that would otherwise have been returned
            Self::V1_3 => json!({ "validate": 0, "reportDescription": description }),
            Self::V1_4 => json!({ "reportDescription": description }),
        })
    }

    /// Describes the API-level error carried by `body`, if any.
    ///
    /// A transport-level success says nothing about this; every response must be checked.
    pub fn error_marker(self, body: &Value) -> Option<String> {
        if let Some(code) = body.get("error").and_then(Value::as_str) {
            let detail = body
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Some(if detail.is_empty() {
                code.to_string()
            } else {
                format!("{code}: {detail}")
            });
        }
        if self == Self::V1_3 {
            let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
            if status.to_ascii_lowercase().starts_with("error") {
                let msg = body.get("statusMsg").and_then(Value::as_str).unwrap_or(status);
                return Some(msg.to_string());
            }
        }
        None
    }

    pub fn is_not_ready(self, body: &Value) -> bool {
        body.get("error").and_then(Value::as_str) == Some(NOT_READY_ERROR)
    }

    pub fn report_id(self, body: &Value) -> Option<String> {
        scalar_id(body.get("reportID")?)
    }
}

/// Job and file ids come back as numbers or strings depending on the call.
pub fn scalar_id(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Sends numeric ids back as numbers, the way the API handed them out.
pub fn id_value(id: &str) -> Value {
    id.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(id))
}

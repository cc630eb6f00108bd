use crate::error::{Result, SiteCatError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateGranularity {
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
}

impl From<&str> for ItemRef {
    fn from(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// A report request in the vendor's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDescription {
    #[serde(rename = "reportSuiteID")]
    pub report_suite_id: String,
    pub date_from: String,
    pub date_to: String,
    #[serde(default)]
    pub date_granularity: DateGranularity,
    pub metrics: Vec<ItemRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ItemRef>,
    #[serde(rename = "segment_id", default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
}

impl ReportDescription {
    /// Dates may be given as ISO-8601 dates or datetimes; only the date part is sent.
    pub fn new<M, S>(report_suite_id: &str, date_from: &str, date_to: &str, metrics: M) -> Result<Self>
    where
        M: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            report_suite_id: report_suite_id.to_string(),
            date_from: crate::util::iso_date(date_from)?,
            date_to: crate::util::iso_date(date_to)?,
            date_granularity: DateGranularity::default(),
            metrics: metrics.into_iter().map(|m| ItemRef::from(m.as_ref())).collect(),
            elements: Vec::new(),
            segment_id: None,
        })
    }

    pub fn with_granularity(mut self, granularity: DateGranularity) -> Self {
        self.date_granularity = granularity;
        self
    }

    pub fn with_elements<E, S>(mut self, elements: E) -> Self
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.elements = elements.into_iter().map(|e| ItemRef::from(e.as_ref())).collect();
        self
    }

    pub fn with_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = Some(segment_id.into());
        self
    }

    /// Reports broken down by at least one element are "trended".
    pub fn is_trended(&self) -> bool {
        !self.elements.is_empty()
    }
}

/// Outcome of a single report status probe.
#[derive(Debug, Clone)]
pub enum ReportStatus {
    Done(RawReportResult),
    Pending,
    Failed(Value),
    Unknown(Value),
}

impl ReportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Done(_) => "done",
            Self::Pending => "pending",
            Self::Failed(_) => "failed",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Outcome of a single SAINT export status probe.
#[derive(Debug, Clone, PartialEq)]
pub enum SaintStatus {
    Pending,
    /// The job completed but the status carried no file entry yet.
    ReadyNoFile,
    Ready { file_id: String, page_count: u32 },
    Failed(Value),
}

impl SaintStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ReadyNoFile => "ready_no_file",
            Self::Ready { .. } => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReportResult {
    #[serde(default)]
    pub metrics: Vec<MetricInfo>,
    #[serde(default)]
    pub elements: Vec<ElementInfo>,
    #[serde(default)]
    pub data: Vec<DataNode>,
}

impl RawReportResult {
    /// Accepts either a full `Report.Get*` response or the bare `report` object.
    pub fn from_response(body: Value) -> Result<Self> {
        let report = match body {
            Value::Object(mut map) if map.contains_key("report") => {
                map.remove("report").unwrap_or(Value::Null)
            }
            other => other,
        };
        if !report.is_object() {
            return Err(SiteCatError::malformed(format!(
                "expected a report object, got {report}"
            )));
        }
        Ok(serde_json::from_value(report)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

/// One node of the report data tree. Leaves have no `breakdown`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counts: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<DataNode>>,
}

/// One page of a SAINT classification export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSegment {
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub data: Vec<SegmentRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    #[serde(default)]
    pub row: Vec<Value>,
}

impl FileSegment {
    /// `Saint.ExportGetFileSegment` answers with a list of segments; a bare object is accepted too.
    pub fn from_response(body: Value) -> Result<Vec<Self>> {
        match body {
            Value::Array(items) => items
                .into_iter()
                .map(|v| serde_json::from_value(v).map_err(SiteCatError::from))
                .collect(),
            v @ Value::Object(_) => Ok(vec![serde_json::from_value(v)?]),
            other => Err(SiteCatError::malformed(format!(
                "unexpected file segment payload: {other}"
            ))),
        }
    }
}

/// Which asynchronous job a poll loop is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Report,
    SaintExport,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report => f.write_str("report"),
            Self::SaintExport => f.write_str("saint_export"),
        }
    }
}

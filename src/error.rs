//! Error taxonomy for the reporting client.
//!
//! Every variant that originates from the server carries the raw response
//! payload so a failed job can be diagnosed without re-running it.

use serde_json::Value;

pub type Result<T> = std::result::Result<T, SiteCatError>;

#[derive(Debug, thiserror::Error)]
pub enum SiteCatError {
    /// The endpoint answered with something that is not a usable JSON body.
    #[error("transport error (status {status}): {body}")]
    Transport { status: u16, body: String },

    /// The request never produced a response.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the request; not retried beyond the submission cap.
    #[error("invalid request for {method}: {payload}")]
    InvalidRequest { method: String, payload: Value },

    /// Polling ran out of checks before the job reached a terminal state.
    #[error("job {job_id} not ready after {checks} queue checks")]
    QueueTimeout { job_id: String, checks: u32 },

    /// The server reported the job as failed.
    #[error("job {job_id} failed: {payload}")]
    JobFailed { job_id: String, payload: Value },

    #[error("malformed report result: {0}")]
    MalformedResult(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SiteCatError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResult(msg.into())
    }

    /// The raw server payload attached to this error, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::InvalidRequest { payload, .. } | Self::JobFailed { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

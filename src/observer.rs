use crate::model::JobKind;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Receives progress events from the submit/poll/fetch loops.
///
/// All methods default to doing nothing.
pub trait PollObserver {
    fn submitted(&self, _kind: JobKind, _job_id: &str) {}
    fn queue_check(&self, _kind: JobKind, _job_id: &str, _check: u32, _max_checks: u32) {}
    fn status(&self, _kind: JobKind, _job_id: &str, _status: &str) {}
    fn unexpected_status(&self, _kind: JobKind, _job_id: &str, _payload: &Value) {}
    fn retry(&self, _method: &str, _attempt: u32, _reason: &str) {}
    fn segment_fetched(&self, _file_id: &str, _page: u32, _pages: u32) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PollObserver for TracingObserver {
    fn submitted(&self, kind: JobKind, job_id: &str) {
        info!(%kind, job_id, "job queued");
    }

    fn queue_check(&self, kind: JobKind, job_id: &str, check: u32, max_checks: u32) {
        info!(%kind, job_id, "queue check {check}/{max_checks}");
    }

    fn status(&self, kind: JobKind, job_id: &str, status: &str) {
        debug!(%kind, job_id, status, "job status");
    }

    fn unexpected_status(&self, kind: JobKind, job_id: &str, payload: &Value) {
        warn!(%kind, job_id, "unrecognized status response: {payload}");
    }

    fn retry(&self, method: &str, attempt: u32, reason: &str) {
        warn!(method, attempt, "retrying: {reason}");
    }

    fn segment_fetched(&self, file_id: &str, page: u32, pages: u32) {
        debug!(file_id, "fetched segment {page}/{pages}");
    }
}

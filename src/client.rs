use crate::{
    api_version::{
        ApiVersion, SAINT_CHECK_STATUS, SAINT_CREATE_EXPORT, SAINT_GET_SEGMENT, StatusShape,
        id_value, scalar_id,
    },
    auth::{self, Credentials, WSSE_HEADER},
    clock::{Clock, SystemClock},
    error::{Result, SiteCatError},
    model::{FileSegment, JobKind, RawReportResult, ReportDescription, ReportStatus, SaintStatus},
    observer::{PollObserver, TracingObserver},
    transport::{HttpResponse, Transport},
};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TRANSPORT_ATTEMPTS: u32 = 5;
pub const DEFAULT_SUBMIT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub max_queue_checks: u32,
    pub queue_check_interval: Duration,
    /// Submit and hand back the job id without polling.
    pub queue_only: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_queue_checks: 20,
            queue_check_interval: Duration::from_secs(1),
            queue_only: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Queued(String),
    Finished(RawReportResult),
}

#[derive(Debug, Clone)]
pub enum SaintOutcome {
    Queued(String),
    Finished(Vec<FileSegment>),
}

/// Signed RPC against the reporting endpoint plus the queue/poll/fetch
/// lifecycles for report jobs and SAINT exports.
pub struct ReportClient<T: Transport, C: Clock = SystemClock> {
    creds: Credentials,
    transport: T,
    clock: C,
    version: ApiVersion,
    endpoint: String,
    transport_attempts: u32,
    submit_attempts: u32,
    observer: Box<dyn PollObserver>,
}

impl<T: Transport> ReportClient<T, SystemClock> {
    pub fn new(creds: Credentials, transport: T, version: ApiVersion) -> Self {
        Self {
            creds,
            transport,
            clock: SystemClock,
            version,
            endpoint: version.default_endpoint().to_string(),
            transport_attempts: DEFAULT_TRANSPORT_ATTEMPTS,
            submit_attempts: DEFAULT_SUBMIT_ATTEMPTS,
            observer: Box::new(TracingObserver),
        }
    }
}

impl<T: Transport, C: Clock> ReportClient<T, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ReportClient<T, C2> {
        ReportClient {
            creds: self.creds,
            transport: self.transport,
            clock,
            version: self.version,
            endpoint: self.endpoint,
            transport_attempts: self.transport_attempts,
            submit_attempts: self.submit_attempts,
            observer: self.observer,
        }
    }

    pub fn with_observer(mut self, observer: impl PollObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_transport_attempts(mut self, attempts: u32) -> Self {
        self.transport_attempts = attempts.max(1);
        self
    }

    pub fn with_submit_attempts(mut self, attempts: u32) -> Self {
        self.submit_attempts = attempts.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fresh nonce and timestamp on every call; a reused nonce is rejected server-side.
    pub fn sign_request(&self, method: &str, body: &str) -> Vec<(String, String)> {
        let created = auth::format_created(self.clock.now_utc());
        let token = auth::sign(&self.creds, &auth::fresh_nonce(), &created);
        debug!(method, body_bytes = body.len(), created = %created, "signed request");
        vec![
            (WSSE_HEADER.to_string(), token.header_value()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }

    /// Performs one signed request, retrying 5xx answers up to the attempt cap.
    ///
    /// On exhaustion the last response is returned as-is. The body may still
    /// carry an API error; callers check for that themselves.
    pub fn call(&self, method: &str, payload: &Value) -> Result<Value> {
        let body = serde_json::to_string(payload)?;
        let query = [("method".to_string(), method.to_string())];

        let mut attempt = 1;
        let resp = loop {
            let headers = self.sign_request(method, &body);
            debug!(method, attempt, "POST {}", self.endpoint);
            let resp = self.transport.post(&self.endpoint, &body, &headers, &query)?;
            if !resp.is_server_error() || attempt >= self.transport_attempts {
                break resp;
            }
            self.observer
                .retry(method, attempt, &format!("server answered {}", resp.status));
            attempt += 1;
        };
        json_body(resp)
    }

    /// Calls `method` until the response carries no API error, up to the submit cap.
    fn call_checked(&self, method: &str, payload: &Value) -> Result<Value> {
        let mut attempt = 1;
        loop {
            let body = self.call(method, payload)?;
            match self.version.error_marker(&body) {
                None => return Ok(body),
                // The API sometimes complains about a repeated nonce; a fresh signature fixes it.
                Some(reason) if attempt < self.submit_attempts => {
                    self.observer.retry(method, attempt, &reason);
                    attempt += 1;
                }
                Some(_) => {
                    return Err(SiteCatError::InvalidRequest {
                        method: method.to_string(),
                        payload: body,
                    });
                }
            }
        }
    }

    pub fn submit_report_job(&self, description: &ReportDescription) -> Result<String> {
        let method = self.version.queue_method(description.is_trended());
        let payload = self.version.queue_payload(description)?;
        let body = self.call_checked(method, &payload)?;
        let id = self
            .version
            .report_id(&body)
            .ok_or_else(|| SiteCatError::InvalidRequest {
                method: method.to_string(),
                payload: body.clone(),
            })?;
        self.observer.submitted(JobKind::Report, &id);
        Ok(id)
    }

    /// A single status probe. "Not ready" is `Pending`, not an error.
    pub fn poll_report_status(&self, report_id: &str) -> Result<ReportStatus> {
        let req = json!({ "reportID": id_value(report_id) });
        let body = self.call(self.version.status_method(), &req)?;

        let status = match self.version.status_shape() {
            StatusShape::Inline => {
                if body.get("report").is_some_and(Value::is_object) {
                    ReportStatus::Done(RawReportResult::from_response(body)?)
                } else if self.version.is_not_ready(&body) {
                    ReportStatus::Pending
                } else if self.version.error_marker(&body).is_some() {
                    ReportStatus::Failed(body)
                } else {
                    ReportStatus::Unknown(body)
                }
            }
            StatusShape::Separate => {
                let status = body
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                match status.as_str() {
                    "done" => self.fetch_report(report_id)?,
                    "queued" | "running" | "not ready" | "not_ready" => ReportStatus::Pending,
                    s if s == "failed" || s.starts_with("error") => ReportStatus::Failed(body),
                    _ => ReportStatus::Unknown(body),
                }
            }
        };
        self.observer.status(JobKind::Report, report_id, status.label());
        Ok(status)
    }

    fn fetch_report(&self, report_id: &str) -> Result<ReportStatus> {
        let Some(method) = self.version.fetch_method() else {
            return Err(SiteCatError::malformed(format!(
                "API {:?} has no separate fetch call",
                self.version
            )));
        };
        let body = self.call(method, &json!({ "reportID": id_value(report_id) }))?;
        if self.version.error_marker(&body).is_some() {
            return Ok(ReportStatus::Failed(body));
        }
        Ok(ReportStatus::Done(RawReportResult::from_response(body)?))
    }

    /// Probes up to `max_checks` times with `interval` between probes.
    pub fn await_report(
        &self,
        report_id: &str,
        max_checks: u32,
        interval: Duration,
    ) -> Result<RawReportResult> {
        for check in 1..=max_checks {
            if check > 1 {
                self.clock.sleep(interval);
            }
            self.observer
                .queue_check(JobKind::Report, report_id, check, max_checks);
            match self.poll_report_status(report_id)? {
                ReportStatus::Done(raw) => return Ok(raw),
                ReportStatus::Pending => {}
                ReportStatus::Failed(payload) => {
                    return Err(SiteCatError::JobFailed {
                        job_id: report_id.to_string(),
                        payload,
                    });
                }
                ReportStatus::Unknown(payload) => {
                    self.observer
                        .unexpected_status(JobKind::Report, report_id, &payload);
                }
            }
        }
        Err(SiteCatError::QueueTimeout {
            job_id: report_id.to_string(),
            checks: max_checks,
        })
    }

    pub fn get_report(
        &self,
        description: &ReportDescription,
        options: &ReportOptions,
    ) -> Result<ReportOutcome> {
        let id = self.submit_report_job(description)?;
        if options.queue_only {
            return Ok(ReportOutcome::Queued(id));
        }
        let raw = self.await_report(&id, options.max_queue_checks, options.queue_check_interval)?;
        Ok(ReportOutcome::Finished(raw))
    }

    /// Like [`get_report`](Self::get_report) but refuses descriptions without elements.
    pub fn get_trended_report(
        &self,
        description: &ReportDescription,
        options: &ReportOptions,
    ) -> Result<ReportOutcome> {
        if !description.is_trended() {
            return Err(SiteCatError::InvalidRequest {
                method: self.version.queue_method(true).to_string(),
                payload: json!({ "error": "trended reports need elements defined" }),
            });
        }
        self.get_report(description, options)
    }

    pub fn submit_saint_export(&self, request: &Value) -> Result<String> {
        let body = self.call_checked(SAINT_CREATE_EXPORT, request)?;
        let id = scalar_id(&body)
            .or_else(|| body.get("job_id").and_then(scalar_id))
            .ok_or_else(|| SiteCatError::InvalidRequest {
                method: SAINT_CREATE_EXPORT.to_string(),
                payload: body.clone(),
            })?;
        self.observer.submitted(JobKind::SaintExport, &id);
        Ok(id)
    }

    /// The status answer lists the job first and, once one exists, its file.
    pub fn poll_saint_status(&self, job_id: &str) -> Result<SaintStatus> {
        let body = self.call(SAINT_CHECK_STATUS, &json!({ "job_id": id_value(job_id) }))?;

        let status = match body.as_array() {
            None if self.version.error_marker(&body).is_some() => SaintStatus::Failed(body),
            None => {
                self.observer
                    .unexpected_status(JobKind::SaintExport, job_id, &body);
                SaintStatus::Pending
            }
            Some(entries) => {
                let job_status = entries
                    .first()
                    .and_then(|j| j.get("status"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                match job_status.as_str() {
                    "completed" => match entries.get(1) {
                        None => SaintStatus::ReadyNoFile,
                        Some(file) => file_status(file)?,
                    },
                    "failed" => SaintStatus::Failed(body.clone()),
                    _ => SaintStatus::Pending,
                }
            }
        };
        self.observer.status(JobKind::SaintExport, job_id, status.label());
        Ok(status)
    }

    /// Fetches pages `1..=page_count` one request at a time.
    pub fn fetch_saint_segments(&self, file_id: &str, page_count: u32) -> Result<Vec<FileSegment>> {
        let mut segments = Vec::new();
        for page in 1..=page_count {
            let req = json!({ "file_id": id_value(file_id), "segment_id": page });
            let body = self.call(SAINT_GET_SEGMENT, &req)?;
            if self.version.error_marker(&body).is_some() {
                return Err(SiteCatError::JobFailed {
                    job_id: file_id.to_string(),
                    payload: body,
                });
            }
            segments.extend(FileSegment::from_response(body)?);
            self.observer.segment_fetched(file_id, page, page_count);
        }
        Ok(segments)
    }

    pub fn await_saint_export(
        &self,
        job_id: &str,
        max_checks: u32,
        interval: Duration,
    ) -> Result<Vec<FileSegment>> {
        for check in 1..=max_checks {
            if check > 1 {
                self.clock.sleep(interval);
            }
            self.observer
                .queue_check(JobKind::SaintExport, job_id, check, max_checks);
            match self.poll_saint_status(job_id)? {
                SaintStatus::Ready {
                    file_id,
                    page_count,
                } => return self.fetch_saint_segments(&file_id, page_count),
                SaintStatus::Pending | SaintStatus::ReadyNoFile => {}
                SaintStatus::Failed(payload) => {
                    return Err(SiteCatError::JobFailed {
                        job_id: job_id.to_string(),
                        payload,
                    });
                }
            }
        }
        Err(SiteCatError::QueueTimeout {
            job_id: job_id.to_string(),
            checks: max_checks,
        })
    }

    pub fn get_saint_export(&self, request: &Value, options: &ReportOptions) -> Result<SaintOutcome> {
        let id = self.submit_saint_export(request)?;
        if options.queue_only {
            return Ok(SaintOutcome::Queued(id));
        }
        let segments =
            self.await_saint_export(&id, options.max_queue_checks, options.queue_check_interval)?;
        Ok(SaintOutcome::Finished(segments))
    }
}

fn file_status(file: &Value) -> Result<SaintStatus> {
    let ready = file
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("ready"));
    if !ready {
        return Ok(SaintStatus::Pending);
    }
    let file_id = file
        .get("id")
        .and_then(scalar_id)
        .ok_or_else(|| SiteCatError::malformed(format!("ready file without id: {file}")))?;
    let page_count = match file.get("viewable_pages") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        None => Some(0),
        _ => None,
    }
    .ok_or_else(|| SiteCatError::malformed(format!("bad viewable_pages in {file}")))?;
    Ok(SaintStatus::Ready {
        file_id,
        page_count,
    })
}

fn json_body(resp: HttpResponse) -> Result<Value> {
    serde_json::from_str(&resp.body).map_err(|_| SiteCatError::Transport {
        status: resp.status,
        body: resp.body,
    })
}

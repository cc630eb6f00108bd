#![allow(dead_code)]

use serde_json::Value;
use sitecat::{
    ApiVersion, Credentials, ReportClient, SiteCatError,
    clock::Clock,
    transport::{HttpResponse, Transport},
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

pub struct Recorded {
    pub method: String,
    pub body: Value,
    pub wsse: String,
}

/// Answers requests from a fixed queue and records what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    pub requests: RefCell<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        self.responses.borrow_mut().push_back(HttpResponse {
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn ok(self, body: Value) -> Self {
        self.reply(200, &body.to_string())
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.method.clone()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn post(
        &self,
        _url: &str,
        body: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
    ) -> sitecat::Result<HttpResponse> {
        let method = query
            .iter()
            .find(|(k, _)| k == "method")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let wsse = headers
            .iter()
            .find(|(k, _)| k == "X-WSSE")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        self.requests.borrow_mut().push(Recorded {
            method: method.clone(),
            body: serde_json::from_str(body).unwrap_or(Value::Null),
            wsse,
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| SiteCatError::Transport {
                status: 0,
                body: format!("no scripted response for {method}"),
            })
    }
}

/// Fixed clock that counts sleeps instead of sleeping.
#[derive(Default)]
pub struct CountingClock {
    pub sleeps: Cell<u32>,
    pub slept: Cell<Duration>,
}

impl Clock for CountingClock {
    fn now_utc(&self) -> OffsetDateTime {
        datetime!(2024-01-01 0:00 UTC)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.slept.set(self.slept.get() + duration);
    }
}

pub fn client<'a>(
    transport: &'a ScriptedTransport,
    clock: &'a CountingClock,
    version: ApiVersion,
) -> ReportClient<&'a ScriptedTransport, &'a CountingClock> {
    ReportClient::new(Credentials::new("user:Company", "s3cret"), transport, version)
        .with_clock(clock)
}

pub fn finished_report() -> Value {
    serde_json::json!({
        "report": {
            "metrics": [{ "id": "visits", "name": "Visits" }],
            "elements": [{ "id": "datetime", "name": "Date" }],
            "data": [{ "year": 2024, "month": 1, "day": 1, "counts": ["10"] }]
        }
    })
}

pub fn not_ready() -> Value {
    serde_json::json!({
        "error": "report_not_ready",
        "error_description": "Report not ready"
    })
}

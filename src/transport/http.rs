use super::{HttpResponse, Transport};
use crate::error::Result;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::trace;

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
    ) -> Result<HttpResponse> {
        let mut req = self.client.post(url).query(query).body(body.to_string());
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        trace!("POST {url} -> {status} ({} bytes)", body.len());
        Ok(HttpResponse { status, body })
    }
}

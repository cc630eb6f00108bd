pub mod http;

use crate::error::Result;

pub use http::HttpTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// The one network capability the client needs.
pub trait Transport {
    fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
    ) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
    ) -> Result<HttpResponse> {
        (**self).post(url, body, headers, query)
    }
}

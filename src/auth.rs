//! WSSE UsernameToken signing.
//!
//! Each request carries `PasswordDigest = base64(sha1(nonce ++ created ++ secret))`.
//! The server rejects a nonce it has already seen, so a token must never be
//! reused across requests.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha1::{Digest, Sha1};
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const WSSE_HEADER: &str = "X-WSSE";

#[derive(Clone)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsseToken {
    pub username: String,
    pub password_digest: String,
    /// Base64 of the raw nonce, as sent on the wire.
    pub nonce: String,
    pub created: String,
}

impl WsseToken {
    pub fn header_value(&self) -> String {
        format!(
            "UsernameToken Username=\"{}\", PasswordDigest=\"{}\", Nonce=\"{}\", Created=\"{}\"",
            self.username, self.password_digest, self.nonce, self.created
        )
    }
}

pub fn password_digest(nonce: &str, created: &str, secret: &str) -> String {
    let mut h = Sha1::new();
    h.update(nonce.as_bytes());
    h.update(created.as_bytes());
    h.update(secret.as_bytes());
    STANDARD.encode(h.finalize())
}

/// Builds a token from an explicit nonce and timestamp.
pub fn sign(creds: &Credentials, nonce: &str, created: &str) -> WsseToken {
    WsseToken {
        username: creds.username.clone(),
        password_digest: password_digest(nonce, created, &creds.secret),
        nonce: STANDARD.encode(nonce.as_bytes()),
        created: created.to_string(),
    }
}

pub fn fresh_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn format_created(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

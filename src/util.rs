use crate::error::{Result, SiteCatError};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::Date;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

pub fn ensure_dir(p: &Path) -> anyhow::Result<()> {
    use anyhow::Context;
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Reduces an ISO-8601 date or datetime to its `YYYY-MM-DD` date part.
pub fn iso_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let invalid = || SiteCatError::InvalidRequest {
        method: "reportDescription".to_string(),
        payload: serde_json::json!({ "error": "invalid ISO-8601 date", "value": raw }),
    };

    let date_part = raw.get(..10).ok_or_else(invalid)?;
    if raw.len() > 10 && !matches!(raw.as_bytes()[10], b'T' | b' ') {
        return Err(invalid());
    }
    Date::parse(date_part, format_description!("[year]-[month]-[day]")).map_err(|_| invalid())?;
    Ok(date_part.to_string())
}

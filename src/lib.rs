//! Client for the SiteCatalyst reporting API.
//!
//! [`ReportClient`] signs requests, queues report and SAINT export jobs and
//! polls them to completion; [`flatten`] turns a finished report's nested
//! data tree into a time-indexed [`Table`].

pub mod api_version;
pub mod auth;
pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod flatten;
pub mod model;
pub mod observer;
pub mod reader;
pub mod saint;
pub mod table;
pub mod transport;
pub mod util;

pub use api_version::ApiVersion;
pub use auth::Credentials;
pub use client::{ReportClient, ReportOptions, ReportOutcome, SaintOutcome};
pub use error::{Result, SiteCatError};
pub use model::{RawReportResult, ReportDescription};
pub use reader::SiteCat;
pub use table::{Cell, Table, TimeKey};

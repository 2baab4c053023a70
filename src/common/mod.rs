//! Common utilities shared by the catalog, infrastructure and session code

pub mod config;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Current UTC time as an RFC 3339 string, the timestamp format used in reports
pub fn utc_now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

//! Error types for the manual test runner
//!
//! Only setup problems are errors. Infrastructure hiccups and failed
//! verification checks are reported inline and the session keeps going.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the manual test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Catalog Errors ===
    #[error("Test definitions not found at {}", .0.display())]
    CatalogNotFound(PathBuf),

    #[error("No test definitions found in {}", .0.display())]
    CatalogEmpty(PathBuf),

    #[error("No tests match {0}")]
    NoMatchingTests(String),

    #[error("Failed to parse test definitions in '{path}': {message}")]
    CatalogParse { path: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Infrastructure Errors ===
    #[error("Infrastructure error: {0}")]
    Infra(String),

    // === Report Errors ===
    #[error("Failed to write report '{path}': {error}")]
    ReportWrite { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a catalog parse error for a file
    pub fn catalog_parse(path: &std::path::Path, message: impl ToString) -> Self {
        Self::CatalogParse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: impl ToString) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a report write error
    pub fn report_write(path: &std::path::Path, error: impl ToString) -> Self {
        Self::ReportWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_keep_the_path() {
        let err = Error::report_write(std::path::Path::new("/tmp/r.json"), "disk full");
        assert_eq!(err.to_string(), "Failed to write report '/tmp/r.json': disk full");
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = Error::CatalogNotFound(PathBuf::from("/repo/tests/manual"));
        assert_eq!(
            err.to_string(),
            "Test definitions not found at /repo/tests/manual"
        );
    }
}

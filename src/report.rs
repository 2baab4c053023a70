//! Session reports
//!
//! A report is rebuilt from the result list after every verdict and written
//! over the session's report file, so an interrupted session always leaves
//! a readable report behind. A previous report can seed a new session with
//! the ids it already covered.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Report format version
pub const REPORT_VERSION: &str = "1";

/// Note attached to tests carried over from a resumed report
pub const RESUMED_NOTE: &str = "Skipped (completed in previous session)";

/// `verification_type` of tests carried over from a resumed report
pub const RESUMED_TYPE: &str = "resumed";

/// Timestamp layout used in session ids and report file names
const COMPACT_TIMESTAMP: &str = "%Y-%m-%dT%H%M%S";

/// Outcome of a single test
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    NotRun,
}

impl TestStatus {
    /// Whether a resumed session treats the test as done
    pub fn is_completed(&self) -> bool {
        !matches!(self, TestStatus::NotRun)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::NotRun => "not_run",
        }
    }
}

/// One entry in the report's result list
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: TestStatus,
    /// RFC 3339 UTC time the verdict was recorded
    pub timestamp: String,
    pub duration_seconds: u64,
    pub note: Option<String>,
    pub verification_type: String,
}

/// Where the session ran
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Environment {
    pub platform: String,
    pub arch: String,
    pub os_version: String,
    pub docker_available: bool,
    pub serial_available: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = Summary {
            total: results.len(),
            ..Summary::default()
        };
        for result in results {
            match result.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::NotRun => summary.not_run += 1,
            }
        }
        summary
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub id: String,
    pub started_at: String,
    pub completed_at: String,
    pub duration_seconds: u64,
}

/// The persisted session report
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub version: String,
    pub session: SessionInfo,
    pub environment: Environment,
    pub summary: Summary,
    pub results: Vec<TestResult>,
}

/// Assemble a report from the results so far
pub fn build_report(
    results: &[TestResult],
    environment: &Environment,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
) -> Report {
    let duration = (completed_at - started_at).num_seconds().max(0) as u64;

    Report {
        version: REPORT_VERSION.to_string(),
        session: SessionInfo {
            id: format!("session-{}", started_at.format(COMPACT_TIMESTAMP)),
            started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            completed_at: completed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: duration,
        },
        environment: environment.clone(),
        summary: Summary::from_results(results),
        results: results.to_vec(),
    }
}

/// `manual-<start>-<platform>-<arch>.json`
pub fn report_file_name(started_at: DateTime<Utc>, platform: &str, arch: &str) -> String {
    format!(
        "manual-{}-{}-{}.json",
        started_at.format(COMPACT_TIMESTAMP),
        platform,
        arch
    )
}

/// Writes one session's report file
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(dir: &Path, started_at: DateTime<Utc>, environment: &Environment) -> Self {
        Self {
            path: dir.join(report_file_name(
                started_at,
                &environment.platform,
                &environment.arch,
            )),
        }
    }

    /// File every save of this session goes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `report`, replacing the previous save
    ///
    /// The JSON is written to a temporary file beside the target and renamed
    /// into place, so readers never see a partial report.
    pub fn save(&self, report: &Report) -> Result<PathBuf> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Internal(format!("Report path has no parent: {}", self.path.display())))?;
        std::fs::create_dir_all(dir).map_err(|e| Error::report_write(&self.path, e))?;

        let json = serde_json::to_string_pretty(report)?;
        let mut file =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::report_write(&self.path, e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| Error::report_write(&self.path, e))?;
        file.persist(&self.path)
            .map_err(|e| Error::report_write(&self.path, e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            results = report.results.len(),
            "Saved report"
        );
        Ok(self.path.clone())
    }
}

/// Ids a previous report already covered (passed, failed or skipped)
///
/// A missing or unreadable report is not fatal: the session just starts
/// from scratch after a warning.
pub fn load_resume_ids(path: &Path) -> HashSet<String> {
    match read_resume_ids(path) {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!("Could not load resume file: {}", e);
            HashSet::new()
        }
    }
}

/// Only `id` and `status` are needed, so older or hand-edited reports with
/// extra or missing fields elsewhere still resume.
#[derive(Deserialize)]
struct ResumeReport {
    #[serde(default)]
    results: Vec<ResumeEntry>,
}

#[derive(Deserialize)]
struct ResumeEntry {
    id: String,
    status: TestStatus,
}

fn read_resume_ids(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    let report: ResumeReport = serde_json::from_str(&content)?;
    Ok(report
        .results
        .into_iter()
        .filter(|r| r.status.is_completed())
        .map(|r| r.id)
        .collect())
}

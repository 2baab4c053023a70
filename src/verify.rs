//! Automated verification
//!
//! Evaluates a test's `verification` block against the live system.
//! Nothing here mutates state, and nothing here fails: a probe that cannot
//! run (missing file, missing tool, socket error) is a failed check with a
//! message saying why.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

use crate::catalog::Verification;
use crate::common::config::VerificationConfig;

/// Outcome of one automated check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub description: String,
    pub passed: bool,
}

impl CheckResult {
    fn new(description: impl Into<String>, passed: bool) -> Self {
        Self {
            description: description.into(),
            passed,
        }
    }
}

/// Tunables for the probes
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Connect timeout for `port_listening`
    pub port_timeout: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self::from(&VerificationConfig::default())
    }
}

impl From<&VerificationConfig> for VerifyOptions {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            port_timeout: config.port_timeout(),
        }
    }
}

/// A single runnable probe; `Combined` is flattened into these
#[derive(Debug)]
enum Probe<'a> {
    File {
        path: &'a Path,
        description: Option<&'a str>,
    },
    Json {
        path: &'a Path,
        query: Option<&'a str>,
        description: Option<&'a str>,
    },
    Process {
        name: &'a str,
        description: Option<&'a str>,
    },
    Port {
        port: u16,
        description: Option<&'a str>,
    },
}

fn collect_probes<'a>(verification: &'a Verification, probes: &mut Vec<Probe<'a>>) {
    match verification {
        Verification::Manual => {}
        Verification::FileExists { path, description } => probes.push(Probe::File {
            path,
            description: description.as_deref(),
        }),
        Verification::JsonCheck {
            path,
            query,
            description,
        } => probes.push(Probe::Json {
            path,
            query: query.as_deref(),
            description: description.as_deref(),
        }),
        Verification::ProcessRunning { name, description } => probes.push(Probe::Process {
            name,
            description: description.as_deref(),
        }),
        Verification::PortListening { port, description } => probes.push(Probe::Port {
            port: *port,
            description: description.as_deref(),
        }),
        Verification::Combined { automated, .. } => {
            for entry in automated {
                collect_probes(entry, probes);
            }
        }
    }
}

/// Run every automated check in `verification`, in declaration order
///
/// `Manual` yields no checks; the caller falls back to the operator. For
/// `Combined` the manual prompt is not evaluated here.
pub async fn run_verification(verification: &Verification, opts: &VerifyOptions) -> Vec<CheckResult> {
    let mut probes = Vec::new();
    collect_probes(verification, &mut probes);

    let mut checks = Vec::with_capacity(probes.len());
    for probe in probes {
        let check = run_probe(probe, opts).await;
        tracing::debug!(passed = check.passed, "{}", check.description);
        checks.push(check);
    }
    checks
}

/// Whether every check passed; an empty list trivially passes
pub fn all_passed(checks: &[CheckResult]) -> bool {
    checks.iter().all(|c| c.passed)
}

async fn run_probe(probe: Probe<'_>, opts: &VerifyOptions) -> CheckResult {
    match probe {
        Probe::File { path, description } => {
            let desc = description
                .map(str::to_string)
                .unwrap_or_else(|| format!("File {} exists", path.display()));
            check_file_exists(path, desc).await
        }
        Probe::Json {
            path,
            query,
            description,
        } => {
            let desc = description.map(str::to_string).unwrap_or_else(|| match query {
                Some(q) => format!("JSON check: {}", q),
                None => format!("JSON check: {}", path.display()),
            });
            check_json(path, query, desc).await
        }
        Probe::Process { name, description } => {
            let desc = description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Process '{}' is running", name));
            check_process(name, desc).await
        }
        Probe::Port { port, description } => {
            let desc = description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Port {} is listening", port));
            CheckResult::new(desc, port_open(port, opts.port_timeout).await)
        }
    }
}

async fn check_file_exists(path: &Path, desc: String) -> CheckResult {
    let passed = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    CheckResult::new(desc, passed)
}

async fn check_json(path: &Path, query: Option<&str>, desc: String) -> CheckResult {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => return CheckResult::new(format!("{} (cannot read {}: {})", desc, path.display(), e), false),
    };

    if let Err(e) = serde_json::from_str::<serde_json::Value>(&content) {
        return CheckResult::new(format!("{} (invalid JSON: {})", desc, e), false);
    }

    let Some(query) = query else {
        return CheckResult::new(format!("{} (no query, JSON valid)", desc), true);
    };

    let jq = match which::which("jq") {
        Ok(jq) => jq,
        Err(_) => return CheckResult::new(format!("{} (jq not available, JSON valid)", desc), true),
    };

    let status = Command::new(jq)
        .arg("-e")
        .arg(query)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) => CheckResult::new(desc, status.success()),
        Err(e) => CheckResult::new(format!("{} (jq failed to run: {})", desc, e), false),
    }
}

#[cfg(windows)]
async fn check_process(name: &str, desc: String) -> CheckResult {
    let output = Command::new("tasklist")
        .args(["/FI", &format!("IMAGENAME eq {}*", name)])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) => {
            let listing = String::from_utf8_lossy(&output.stdout).to_lowercase();
            CheckResult::new(desc, listing.contains(&name.to_lowercase()))
        }
        Err(e) => CheckResult::new(format!("{} (tasklist not available: {})", desc, e), false),
    }
}

#[cfg(not(windows))]
async fn check_process(name: &str, desc: String) -> CheckResult {
    let status = Command::new("pgrep")
        .args(["-f", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) => CheckResult::new(desc, status.success()),
        Err(e) => CheckResult::new(format!("{} (pgrep not available: {})", desc, e), false),
    }
}

/// Whether `127.0.0.1:port` accepts a TCP connection within `limit`
pub async fn port_open(port: u16, limit: Duration) -> bool {
    matches!(
        timeout(limit, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

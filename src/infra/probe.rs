//! Capability probes
//!
//! Read-only questions about the machine. They can be asked before, and
//! independently of, any infrastructure lifecycle call.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::catalog::Platform;

/// Docker is installed and the daemon answers `docker info`
pub async fn docker_available() -> bool {
    if which::which("docker").is_err() {
        return false;
    }

    Command::new("docker")
        .arg("info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// `socat` is on PATH, so a virtual serial pair can be created
pub fn serial_available() -> bool {
    which::which("socat").is_ok()
}

/// Where a release build of the app lands for `platform`
pub fn default_app_path(root: &Path, platform: Platform) -> PathBuf {
    let release = root.join("src-tauri").join("target").join("release");
    match platform {
        Platform::MacOS => release
            .join("bundle")
            .join("macos")
            .join("termiHub.app")
            .join("Contents")
            .join("MacOS")
            .join("termiHub"),
        Platform::Linux => release.join("termihub"),
        Platform::Windows => release.join("termihub.exe"),
    }
}

/// Locate the app binary
///
/// An explicit `--app-path` wins and is never second-guessed: if it does not
/// exist, there is no binary. Otherwise the platform's release build path is
/// tried.
pub fn find_app_binary(app_path: Option<&Path>, root: &Path, platform: Platform) -> Option<PathBuf> {
    let candidate = match app_path {
        Some(path) => path.to_path_buf(),
        None => default_app_path(root, platform),
    };
    candidate.exists().then_some(candidate)
}

//! Repository and configuration paths
//!
//! The runner works relative to the termiHub checkout it is started from:
//! - `tests/manual/*.yaml` holds the catalog
//! - `tests/reports/` receives session reports
//! - `tests/docker/docker-compose.yml` describes the test containers

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Name used for the configuration directory
const APP_NAME: &str = "termihub-manual-tests";

/// Locate the repository root
///
/// Asks git first, then walks up from the current directory looking for a
/// `.git` entry. Falls back to the current directory.
pub fn repo_root() -> PathBuf {
    if let Some(root) = git_toplevel() {
        return root;
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_git_ancestor(&cwd).unwrap_or(cwd)
}

fn git_toplevel() -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!root.is_empty()).then(|| PathBuf::from(root))
}

/// Walk up from `start` to the first directory containing `.git`
pub fn find_git_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Directory holding the YAML test catalog
pub fn tests_dir(root: &Path) -> PathBuf {
    root.join("tests").join("manual")
}

/// Default output directory for session reports
pub fn default_report_dir(root: &Path) -> PathBuf {
    root.join("tests").join("reports")
}

/// Docker compose file for the test containers
pub fn compose_file(root: &Path) -> PathBuf {
    root.join("tests").join("docker").join("docker-compose.yml")
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/termihub-manual-tests/`
/// - macOS: `~/Library/Application Support/termihub-manual-tests/`
/// - Windows: `%APPDATA%\termihub-manual-tests\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_git_ancestor_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_git_ancestor(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_git_ancestor_none_without_repo() {
        let dir = tempfile::tempdir().unwrap();
        // A stray .git higher up (e.g. the temp dir inside a checkout) would
        // make this meaningless, so only assert when nothing is found above.
        if dir.path().ancestors().skip(1).all(|p| !p.join(".git").exists()) {
            assert_eq!(find_git_ancestor(dir.path()), None);
        }
    }

    #[test]
    fn test_repo_layout() {
        let root = Path::new("/repo");
        assert_eq!(tests_dir(root), PathBuf::from("/repo/tests/manual"));
        assert_eq!(default_report_dir(root), PathBuf::from("/repo/tests/reports"));
        assert_eq!(
            compose_file(root),
            PathBuf::from("/repo/tests/docker/docker-compose.yml")
        );
    }

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}

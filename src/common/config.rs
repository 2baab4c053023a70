//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Infrastructure settings
    #[serde(default)]
    pub infra: InfraConfig,

    /// Automated verification settings
    #[serde(default)]
    pub verification: VerificationConfig,
}

/// Infrastructure settings
#[derive(Debug, Deserialize, Clone)]
pub struct InfraConfig {
    /// Port the SSH test container listens on; used as the readiness signal
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// How long to wait for the container stack to accept connections
    #[serde(default = "default_docker_ready_timeout")]
    pub docker_ready_timeout_secs: u64,

    /// Interval between readiness probes
    #[serde(default = "default_docker_poll_interval")]
    pub docker_poll_interval_ms: u64,

    /// Override for the docker compose file
    #[serde(default)]
    pub compose_file: Option<PathBuf>,

    /// First end of the virtual serial pair
    #[serde(default = "default_serial_link_a")]
    pub serial_link_a: PathBuf,

    /// Second end of the virtual serial pair
    #[serde(default = "default_serial_link_b")]
    pub serial_link_b: PathBuf,

    /// How long to wait for the serial links to appear
    #[serde(default = "default_serial_timeout")]
    pub serial_timeout_ms: u64,

    /// Interval between serial link checks
    #[serde(default = "default_serial_poll_interval")]
    pub serial_poll_interval_ms: u64,

    /// Grace period between terminate and kill for spawned processes
    #[serde(default = "default_process_grace")]
    pub process_grace_secs: u64,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            ssh_port: default_ssh_port(),
            docker_ready_timeout_secs: default_docker_ready_timeout(),
            docker_poll_interval_ms: default_docker_poll_interval(),
            compose_file: None,
            serial_link_a: default_serial_link_a(),
            serial_link_b: default_serial_link_b(),
            serial_timeout_ms: default_serial_timeout(),
            serial_poll_interval_ms: default_serial_poll_interval(),
            process_grace_secs: default_process_grace(),
        }
    }
}

impl InfraConfig {
    pub fn docker_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.docker_ready_timeout_secs)
    }

    pub fn docker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.docker_poll_interval_ms)
    }

    pub fn serial_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_timeout_ms)
    }

    pub fn serial_poll_interval(&self) -> Duration {
        Duration::from_millis(self.serial_poll_interval_ms)
    }

    pub fn process_grace(&self) -> Duration {
        Duration::from_secs(self.process_grace_secs)
    }
}

fn default_ssh_port() -> u16 {
    2201
}
fn default_docker_ready_timeout() -> u64 {
    30
}
fn default_docker_poll_interval() -> u64 {
    1000
}
fn default_serial_link_a() -> PathBuf {
    PathBuf::from("/tmp/termihub-serial-a")
}
fn default_serial_link_b() -> PathBuf {
    PathBuf::from("/tmp/termihub-serial-b")
}
fn default_serial_timeout() -> u64 {
    10_000
}
fn default_serial_poll_interval() -> u64 {
    500
}
fn default_process_grace() -> u64 {
    5
}

/// Automated verification settings
#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Connect timeout for `port_listening` checks, capped at two seconds
    #[serde(default = "default_port_timeout")]
    pub port_timeout_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            port_timeout_ms: default_port_timeout(),
        }
    }
}

impl VerificationConfig {
    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms.min(default_port_timeout()))
    }
}

fn default_port_timeout() -> u64 {
    2000
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| super::Error::file_read(path, e))?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.infra.ssh_port, 2201);
        assert_eq!(config.infra.docker_ready_timeout(), Duration::from_secs(30));
        assert_eq!(config.infra.docker_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.infra.serial_timeout(), Duration::from_secs(10));
        assert_eq!(config.infra.serial_poll_interval(), Duration::from_millis(500));
        assert_eq!(config.verification.port_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [infra]
            ssh_port = 2222
            docker_ready_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.infra.ssh_port, 2222);
        assert_eq!(config.infra.docker_ready_timeout_secs, 5);
        assert_eq!(config.infra.process_grace_secs, 5);
        assert_eq!(
            config.infra.serial_link_a,
            PathBuf::from("/tmp/termihub-serial-a")
        );
    }

    #[test]
    fn test_port_timeout_is_capped() {
        let config: Config = toml::from_str("[verification]\nport_timeout_ms = 9000\n").unwrap();
        assert_eq!(config.verification.port_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, super::super::Error::FileRead { .. }));
    }
}

//! Infrastructure lifecycle
//!
//! `InfraManager` is the single owner of every external resource a session
//! creates: the docker compose stack, the socat serial bridge, an optional
//! app process, and the generated config directory. Nothing else touches
//! those handles.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::catalog::TestDefinition;
use crate::common::config::InfraConfig;
use crate::common::interrupt::Interrupt;
use crate::common::{Error, Result};

use super::connections::{build_connection_bundle, write_bundle};
use super::probe::serial_available;
use super::wait::{wait_for_paths, wait_for_port};
use super::Provisioner;

/// Prefix of the generated config directory
const CONFIG_DIR_PREFIX: &str = "termihub-manual-test-";

/// Environment variable the app reads its config directory from
pub const CONFIG_DIR_ENV: &str = "TERMIHUB_CONFIG_DIR";

/// How the manager is allowed to behave for this session
#[derive(Debug, Clone)]
pub struct InfraOptions {
    /// Never start or stop the container stack
    pub skip_infra: bool,
    /// Leave the container stack running after the session
    pub keep_infra: bool,
    /// docker compose file describing the test containers
    pub compose_file: PathBuf,
    /// Timeouts, ports and link paths
    pub config: InfraConfig,
}

/// Owner of all external test infrastructure
pub struct InfraManager {
    opts: InfraOptions,
    interrupt: Interrupt,
    docker_started: bool,
    serial_bridge: Option<Child>,
    app: Option<Child>,
    config_dir: Option<TempDir>,
}

impl InfraManager {
    pub fn new(opts: InfraOptions, interrupt: Interrupt) -> Self {
        Self {
            opts,
            interrupt,
            docker_started: false,
            serial_bridge: None,
            app: None,
            config_dir: None,
        }
    }

    pub fn docker_started(&self) -> bool {
        self.docker_started
    }

    pub fn serial_running(&self) -> bool {
        self.serial_bridge.is_some()
    }

    /// Generated config directory, once `generate_connections` has run
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_ref().map(TempDir::path)
    }

    /// Start the docker compose stack and wait for the SSH container
    ///
    /// Returns the current status without doing anything when the stack is
    /// already up or infrastructure is disabled.
    pub async fn start_containers(&mut self) -> bool {
        if self.opts.skip_infra || self.docker_started {
            return self.docker_started;
        }

        let compose_file = &self.opts.compose_file;
        if !compose_file.exists() {
            tracing::warn!("{} not found, cannot start containers", compose_file.display());
            return false;
        }

        println!("  {}", "Starting Docker test containers...".cyan());
        match self.compose(&["up", "-d", "--build"]).await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!("docker compose up failed with exit code {:?}", status.code());
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to run docker compose: {}", e);
                return false;
            }
        }
        self.docker_started = true;

        let port = self.opts.config.ssh_port;
        let limit = self.opts.config.docker_ready_timeout();
        let ready = wait_for_port(
            port,
            limit,
            self.opts.config.docker_poll_interval(),
            &self.interrupt,
        )
        .await;

        if ready {
            println!("  {} SSH ready on port {}", "✓".green(), port);
        } else {
            tracing::warn!("SSH on port {} not ready after {}s", port, limit.as_secs());
        }
        ready
    }

    /// Create a virtual serial port pair with socat
    pub async fn start_serial(&mut self) -> bool {
        if self.serial_bridge.is_some() {
            return true;
        }
        if !serial_available() {
            tracing::warn!("socat not found, virtual serial ports unavailable");
            return false;
        }

        self.remove_serial_links();

        let links = self.serial_links();
        let child = Command::new("socat")
            .arg("-d")
            .arg("-d")
            .arg(format!("pty,raw,echo=0,link={}", links[0].display()))
            .arg(format!("pty,raw,echo=0,link={}", links[1].display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match child {
            Ok(child) => self.serial_bridge = Some(child),
            Err(e) => {
                tracing::warn!("Failed to spawn socat: {}", e);
                return false;
            }
        }

        let appeared = wait_for_paths(
            &links,
            self.opts.config.serial_timeout(),
            self.opts.config.serial_poll_interval(),
            &self.interrupt,
        )
        .await;

        if appeared {
            println!(
                "  {} Virtual serial ports: {} <-> {}",
                "✓".green(),
                links[0].display(),
                links[1].display()
            );
        } else {
            tracing::warn!("Virtual serial ports did not appear");
            // Let a later serial prerequisite try again from scratch
            self.stop_serial().await;
        }
        appeared
    }

    /// Write the session's connection bundle to a fresh temp directory
    ///
    /// Meant to be called once per session; a second call returns the
    /// directory generated by the first.
    pub fn generate_connections(&mut self, tests: &[TestDefinition]) -> Result<PathBuf> {
        if let Some(dir) = &self.config_dir {
            tracing::warn!("Connections already generated in {}", dir.path().display());
            return Ok(dir.path().to_path_buf());
        }

        let dir = tempfile::Builder::new()
            .prefix(CONFIG_DIR_PREFIX)
            .tempdir()
            .map_err(|e| Error::Infra(format!("Failed to create config directory: {}", e)))?;

        let bundle = build_connection_bundle(tests);
        write_bundle(dir.path(), &bundle)?;
        tracing::debug!(
            connections = bundle.connection_count(),
            dir = %dir.path().display(),
            "Generated connection bundle"
        );

        let path = dir.path().to_path_buf();
        self.config_dir = Some(dir);
        Ok(path)
    }

    /// Launch the app under test pointed at the generated config directory
    pub fn launch_app(&mut self, binary: &Path) -> Result<()> {
        if self.app.is_some() {
            return Ok(());
        }

        let mut command = Command::new(binary);
        if let Some(dir) = self.config_dir() {
            command.env(CONFIG_DIR_ENV, dir);
        }

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Infra(format!("Failed to launch {}: {}", binary.display(), e)))?;

        tracing::info!(pid = child.id(), "Launched {}", binary.display());
        self.app = Some(child);
        Ok(())
    }

    /// Tear everything down
    ///
    /// Safe to call any number of times; each step runs regardless of how
    /// the previous one went.
    pub async fn cleanup(&mut self) {
        self.stop_serial().await;

        if let Some(mut app) = self.app.take() {
            terminate(&mut app, self.opts.config.process_grace(), "app").await;
        }

        if self.docker_started {
            if self.opts.keep_infra {
                println!("  Keeping Docker containers running (--keep-infra).");
            } else {
                println!("  Stopping Docker containers...");
                match self.compose(&["down"]).await {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        tracing::warn!("docker compose down failed with exit code {:?}", status.code())
                    }
                    Err(e) => tracing::warn!("Failed to run docker compose down: {}", e),
                }
            }
            self.docker_started = false;
        }

        if let Some(dir) = self.config_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    async fn stop_serial(&mut self) {
        if let Some(mut bridge) = self.serial_bridge.take() {
            terminate(&mut bridge, self.opts.config.process_grace(), "socat").await;
            self.remove_serial_links();
        }
    }

    fn serial_links(&self) -> [PathBuf; 2] {
        [
            self.opts.config.serial_link_a.clone(),
            self.opts.config.serial_link_b.clone(),
        ]
    }

    fn remove_serial_links(&self) {
        for link in self.serial_links() {
            match std::fs::remove_file(&link) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", link.display(), e),
            }
        }
    }

    async fn compose(&self, args: &[&str]) -> std::io::Result<std::process::ExitStatus> {
        Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(&self.opts.compose_file)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
    }
}

#[async_trait]
impl Provisioner for InfraManager {
    async fn start_containers(&mut self) -> bool {
        InfraManager::start_containers(self).await
    }

    async fn start_serial(&mut self) -> bool {
        InfraManager::start_serial(self).await
    }
}

impl Drop for InfraManager {
    /// Last-resort teardown when `cleanup` was never reached (e.g. a panic)
    ///
    /// Child processes are `kill_on_drop` and the config directory removes
    /// itself, so only the serial links and the container stack need work.
    fn drop(&mut self) {
        if self.serial_bridge.take().is_some() {
            self.remove_serial_links();
        }

        if self.docker_started && !self.opts.keep_infra {
            tracing::warn!("Stopping Docker containers after an abnormal exit");
            let _ = std::process::Command::new("docker")
                .arg("compose")
                .arg("-f")
                .arg(&self.opts.compose_file)
                .arg("down")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}

/// Ask a child to exit, then kill it after `grace`
async fn terminate(child: &mut Child, grace: Duration, what: &str) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }

    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: pid is our own unreaped child, so it cannot have been recycled
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        if timeout(grace, child.wait()).await.is_ok() {
            return;
        }
        tracing::warn!("{} did not exit within {}s, killing", what, grace.as_secs());
    }

    #[cfg(not(unix))]
    let _ = (grace, what);

    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill {}: {}", what, e);
    }
}

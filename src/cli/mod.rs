//! CLI command handling
//!
//! Turns parsed arguments into either a catalog listing or a full guided
//! session. Infrastructure is torn down here on every path out of a session.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use colored::Colorize;

use crate::catalog::{detect_arch, detect_os_version, load_filtered, Platform, TestDefinition};
use crate::commands::Cli;
use crate::common::config::Config;
use crate::common::interrupt::Interrupt;
use crate::common::{paths, utc_now_rfc3339, Result};
use crate::infra::{
    docker_available, find_app_binary, serial_available, InfraManager, InfraOptions,
    CONFIG_DIR_ENV, CONNECTIONS_FILE,
};
use crate::report::{load_resume_ids, Environment, ReportStore};
use crate::session::display::{print_list, print_overview, print_summary, Overview};
use crate::session::{Operator, Reply, SessionRunner, TerminalOperator};
use crate::verify::VerifyOptions;

/// Run the CLI and return the process exit code
pub async fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let root = paths::repo_root();
    let tests_dir = cli
        .tests_dir
        .clone()
        .unwrap_or_else(|| paths::tests_dir(&root));
    tracing::debug!(root = %root.display(), tests = %tests_dir.display(), "Resolved paths");

    let platform = cli.platform();
    let (tests, catalog_size) = load_filtered(&tests_dir, &cli.filter())?;

    if cli.list {
        print_list(&tests, catalog_size, platform.as_str());
        return Ok(0);
    }

    let resume = match &cli.resume {
        Some(path) => {
            let ids = load_resume_ids(path);
            println!("Resuming session: {} tests already completed", ids.len());
            ids
        }
        None => HashSet::new(),
    };

    let environment = Environment {
        platform: platform.as_str().to_string(),
        arch: detect_arch(),
        os_version: detect_os_version(),
        docker_available: docker_available().await,
        serial_available: serial_available(),
    };
    let app_binary = find_app_binary(cli.app_path.as_deref(), &root, platform);

    let interrupt = Interrupt::new();
    interrupt.listen();

    let mut infra = InfraManager::new(
        InfraOptions {
            skip_infra: cli.infra_disabled(),
            keep_infra: cli.keep_infra,
            compose_file: config
                .infra
                .compose_file
                .clone()
                .unwrap_or_else(|| paths::compose_file(&root)),
            config: config.infra.clone(),
        },
        interrupt.clone(),
    );
    let mut operator = TerminalOperator::new(interrupt);

    let session = Session {
        cli: &cli,
        root: &root,
        config: &config,
        platform,
        tests: &tests,
        catalog_size,
        environment,
        app_binary,
        resume,
    };
    let result = session.run(&mut infra, &mut operator).await;

    infra.cleanup().await;
    result
}

/// Everything a guided session needs besides its infrastructure
struct Session<'a> {
    cli: &'a Cli,
    root: &'a Path,
    config: &'a Config,
    platform: Platform,
    tests: &'a [TestDefinition],
    catalog_size: usize,
    environment: Environment,
    app_binary: Option<PathBuf>,
    resume: HashSet<String>,
}

impl Session<'_> {
    async fn run(self, infra: &mut InfraManager, operator: &mut TerminalOperator) -> Result<i32> {
        print_overview(&Overview {
            environment: &self.environment,
            tests: self.tests,
            catalog_size: self.catalog_size,
            app_found: self.app_binary.is_some(),
            date: utc_now_rfc3339(),
        });

        println!("\nPress Enter to begin, or 'q' to quit.");
        match operator.ask("> ").await {
            Reply::Line(answer) if !answer.eq_ignore_ascii_case("q") => {}
            _ => return Ok(0),
        }

        if !self.cli.skip_setup {
            let dir = infra.generate_connections(self.tests)?;
            self.print_config_hint(&dir);
        }

        if self.cli.launch_app {
            match &self.app_binary {
                Some(binary) => {
                    if let Err(e) = infra.launch_app(binary) {
                        tracing::warn!("{}", e);
                    } else {
                        println!("  {} Launched {}", "✓".green(), binary.display());
                    }
                }
                None => tracing::warn!("App binary not found, launch the app manually"),
            }
        }

        let report_dir = self
            .cli
            .report_dir
            .clone()
            .unwrap_or_else(|| paths::default_report_dir(self.root));
        let started_at = Utc::now();
        let store = ReportStore::new(&report_dir, started_at, &self.environment);

        let outcome = SessionRunner::new(infra, operator, store, self.environment, started_at)
            .with_resume(self.resume)
            .with_verify_options(VerifyOptions::from(&self.config.verification))
            .run(self.tests)
            .await;

        let report_path = outcome
            .report_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(report could not be written)".to_string());
        print_summary(&outcome.results, &report_path, outcome.duration_seconds);

        Ok(if outcome.has_failures() { 1 } else { 0 })
    }

    fn print_config_hint(&self, dir: &Path) {
        println!(
            "\n  Test connections written to: {}",
            dir.join(CONNECTIONS_FILE).display()
        );
        println!(
            "  Launch the app with: {}=\"{}\" pnpm tauri dev",
            CONFIG_DIR_ENV,
            dir.display()
        );
        if self.platform == Platform::Windows {
            println!(
                "  (Windows): set {}={} && pnpm tauri dev",
                CONFIG_DIR_ENV,
                dir.display()
            );
        }
    }
}

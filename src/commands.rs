//! CLI definition
//!
//! Defines the clap arguments for the manual test runner.

use std::path::PathBuf;

use clap::Parser;

use crate::catalog::{Platform, TestFilter};

#[derive(Parser, Debug)]
#[command(name = "test-manual", about = "termiHub guided manual test runner")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Run only tests in a specific category
    #[arg(long)]
    pub category: Option<String>,

    /// Run a single test by ID (e.g. MT-LOCAL-03)
    #[arg(long = "test", value_name = "ID")]
    pub test_id: Option<String>,

    /// Override platform detection
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Skip infrastructure setup and connection generation
    #[arg(long)]
    pub skip_setup: bool,

    /// Skip Docker container management
    #[arg(long)]
    pub skip_infra: bool,

    /// Keep Docker containers running after the session
    #[arg(long)]
    pub keep_infra: bool,

    /// Path to the app binary (overrides auto-detection)
    #[arg(long, value_name = "PATH")]
    pub app_path: Option<PathBuf>,

    /// Output directory for reports
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Resume a previous session from its report file
    #[arg(long, value_name = "REPORT")]
    pub resume: Option<PathBuf>,

    /// List the tests for the platform without running them
    #[arg(long)]
    pub list: bool,

    /// Directory holding the YAML test definitions
    #[arg(long, value_name = "DIR")]
    pub tests_dir: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Launch the app with the generated connections once setup is done
    #[arg(long)]
    pub launch_app: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Platform the session targets
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// Containers are never touched with `--skip-infra` or `--skip-setup`
    pub fn infra_disabled(&self) -> bool {
        self.skip_infra || self.skip_setup
    }

    pub fn filter(&self) -> TestFilter {
        TestFilter {
            platform: self.platform().as_str().to_string(),
            category: self.category.clone(),
            test_id: self.test_id.clone(),
        }
    }
}

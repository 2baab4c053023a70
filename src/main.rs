//! termiHub guided manual test runner
//!
//! Walks an operator through the manual test catalog, brings up the test
//! infrastructure it needs, and records the verdicts in a JSON report.

use clap::Parser;
use colored::Colorize;
use termihub_manual::commands::Cli;
use termihub_manual::{cli, common::logging};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    logging::init_cli(args.verbose);

    let code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}

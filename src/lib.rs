//! termiHub manual test runner
//!
//! Drives an operator through the guided manual test catalog: loads the
//! YAML definitions, provisions containers and virtual serial ports on
//! demand, runs automated checks where a test has them, and keeps a
//! resumable JSON report of the session.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod common;
pub mod infra;
pub mod report;
pub mod session;
pub mod verify;

// Re-export commonly used types for tests
pub use common::{Error, Result};

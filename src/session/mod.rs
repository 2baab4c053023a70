//! Guided test session
//!
//! Presents each test to the operator, collects verdicts and keeps the
//! report on disk up to date.

pub mod display;
pub mod prompt;
mod runner;

pub use prompt::{Operator, Reply, TerminalOperator};
pub use runner::{SessionOutcome, SessionRunner};

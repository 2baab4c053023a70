//! Manual test catalog
//!
//! Reads the YAML test definitions under `tests/manual/`, resolves their
//! loosely shaped entries into typed definitions, and filters them for the
//! platform the session runs on.

mod config;
mod loader;
mod platform;

pub use config::*;
pub use loader::{filter_tests, load_filtered, load_tests, TestFilter};
pub use platform::{detect_arch, detect_os_version, Platform};

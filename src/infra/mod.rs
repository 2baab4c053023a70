//! Test infrastructure
//!
//! Docker containers, virtual serial ports, the generated connection bundle
//! and the app process. All of it is owned by [`InfraManager`]; the session
//! runner only sees the [`Provisioner`] seam.

mod connections;
mod manager;
mod probe;
mod wait;

use async_trait::async_trait;

pub use connections::{build_connection_bundle, write_bundle, ConnectionBundle, CONNECTIONS_FILE, FOLDER_NAME};
pub use manager::{InfraManager, InfraOptions, CONFIG_DIR_ENV};
pub use probe::{default_app_path, docker_available, find_app_binary, serial_available};
pub use wait::{wait_for_paths, wait_for_port, wait_until};

/// Lazy prerequisite provisioning used by the session runner
///
/// Both calls are idempotent and report whether the capability is usable.
/// A `false` is a warning, never a session failure.
#[async_trait]
pub trait Provisioner: Send {
    async fn start_containers(&mut self) -> bool;
    async fn start_serial(&mut self) -> bool;
}

//! Bounded polling waits
//!
//! Every wait has an explicit timeout and interval and returns `false`
//! instead of blocking past its deadline. A raised interrupt ends the wait
//! early with `false`.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::common::interrupt::Interrupt;
use crate::verify::port_open;

/// Upper bound for a single connect attempt while polling a port
const PORT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll `probe` every `interval` until it returns true or `limit` elapses
pub async fn wait_until<F, Fut>(
    limit: Duration,
    interval: Duration,
    interrupt: &Interrupt,
    mut probe: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let attempts = async {
        loop {
            if probe().await {
                return true;
            }
            sleep(interval).await;
        }
    };

    tokio::select! {
        result = timeout(limit, attempts) => result.unwrap_or(false),
        _ = interrupt.raised() => false,
    }
}

/// Wait for `127.0.0.1:port` to accept connections
pub async fn wait_for_port(
    port: u16,
    limit: Duration,
    interval: Duration,
    interrupt: &Interrupt,
) -> bool {
    let attempt = PORT_ATTEMPT_TIMEOUT.min(limit);
    wait_until(limit, interval, interrupt, || port_open(port, attempt)).await
}

/// Wait for every path in `paths` to exist
pub async fn wait_for_paths(
    paths: &[PathBuf],
    limit: Duration,
    interval: Duration,
    interrupt: &Interrupt,
) -> bool {
    wait_until(limit, interval, interrupt, || {
        std::future::ready(paths.iter().all(|p| p.exists()))
    })
    .await
}

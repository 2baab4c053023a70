//! Ctrl+C / SIGTERM handling
//!
//! A signal does not kill the process. It raises a flag that input reads
//! and bounded waits observe, so an interrupt takes the same path as the
//! operator typing `q`: remaining tests become `not_run`, the report is
//! finalized, and infrastructure is cleaned up once by its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared interrupt flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    raised: AtomicBool,
    notify: Notify,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the signal listener; call once at startup
    pub fn listen(&self) {
        let interrupt = self.clone();
        tokio::spawn(async move {
            loop {
                wait_for_signal().await;
                if interrupt.is_raised() {
                    tracing::warn!("Interrupt already received, finishing cleanup");
                } else {
                    tracing::info!("Interrupt received, wrapping up the session");
                }
                interrupt.raise();
            }
        });
    }

    /// Mark the session as interrupted and wake every waiter
    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Resolves once the interrupt has been raised
    pub async fn raised(&self) {
        loop {
            // Registered before the flag check so a concurrent raise is not missed
            let notified = self.inner.notify.notified();
            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

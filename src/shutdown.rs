//! Graceful shutdown coordination.
//!
//! A cloneable [`ShutdownHandle`] is passed from the binary into the
//! download orchestrator so an interrupted run stops scheduling new dataset
//! transfers instead of aborting mid-file. The orchestrator has no deadline
//! of its own; cancellation is always supplied by the surrounding process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable cancellation handle shared across async tasks.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownHandle {
    /// Create a fresh handle with no shutdown requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Wakes every task waiting in [`ShutdownHandle::wait`].
    pub fn request(&self) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested. Returns immediately if it already
    /// was.
    pub async fn wait(&self) {
        if self.is_requested() {
            return;
        }
        self.inner.notify.notified().await;
    }

    /// Spawn a background task that requests shutdown on Ctrl+C.
    pub fn listen_for_ctrl_c(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing in-flight datasets before exiting");
                handle.request();
            }
        });
    }
}

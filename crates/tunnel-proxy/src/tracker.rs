//! Counted barrier over in-flight connections.
//!
//! The accept loop calls [`ConnectionTracker::track`] before spawning a
//! handler and moves the returned [`ConnectionGuard`] into the task. The
//! count drops when the guard does, on every exit path of the handler
//! including panics. Shutdown waits on [`ConnectionTracker::wait_idle`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    active: AtomicUsize,
    idle: Notify,
}

/// Shared count of active connection handlers.
///
/// Cloning yields another handle to the same count.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<Inner>,
}

impl ConnectionTracker {
    /// Create a tracker with no active connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one connection. The registration lasts as long as the guard.
    #[must_use = "dropping the guard immediately releases the registration"]
    pub fn track(&self) -> ConnectionGuard {
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of connections currently registered.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Wait until no connection is registered.
    ///
    /// Returns immediately when the count is already zero.
    pub async fn wait_idle(&self) {
        loop {
            // Create the waiter before checking so a release between the
            // check and the await is not missed.
            let notified = self.inner.idle.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Registration of one in-flight connection; released on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    inner: Arc<Inner>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

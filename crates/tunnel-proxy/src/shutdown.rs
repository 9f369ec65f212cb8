//! Shutdown phases and the OS termination signal.
//!
//! ```text
//! Running --signal--> Draining --last connection closed--> Drained --> Terminated
//!            (listener closed)
//! ```

use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// Lifecycle phase of a running tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    /// Accepting and relaying connections.
    Running,
    /// Listener closed; waiting for in-flight connections.
    Draining,
    /// No connection left.
    Drained,
    /// Shutdown finished; the process may exit.
    Terminated,
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownPhase::Running => "running",
            ShutdownPhase::Draining => "draining",
            ShutdownPhase::Drained => "drained",
            ShutdownPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Future that resolves when the process receives SIGINT or SIGTERM
/// (Ctrl-C elsewhere).
///
/// The handlers are installed when this is called, not when the future is
/// first polled: call it before binding so a signal that arrives right after
/// the listener comes up is not lost to the default action. Must be called
/// inside a Tokio runtime.
///
/// If a signal handler cannot be installed the failure is logged and that
/// signal is ignored; the other one still triggers shutdown.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{signal, SignalKind};

    let sigint = signal(SignalKind::interrupt())
        .map_err(|e| warn!(error = %e, "Failed to install SIGINT handler"))
        .ok();
    let sigterm = signal(SignalKind::terminate())
        .map_err(|e| warn!(error = %e, "Failed to install SIGTERM handler"))
        .ok();

    async move {
        tokio::select! {
            _ = recv_or_pending(sigint) => info!(signal = "SIGINT", "Shutdown signal received"),
            _ = recv_or_pending(sigterm) => info!(signal = "SIGTERM", "Shutdown signal received"),
        }
    }
}

#[cfg(unix)]
async fn recv_or_pending(stream: Option<tokio::signal::unix::Signal>) {
    match stream {
        Some(mut stream) => {
            stream.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Future that resolves on Ctrl-C.
///
/// The handler is installed when this is called. Must be called inside a
/// Tokio runtime.
#[cfg(windows)]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    let ctrl_c = tokio::signal::windows::ctrl_c()
        .map_err(|e| warn!(error = %e, "Failed to listen for Ctrl-C; running until killed"))
        .ok();

    async move {
        match ctrl_c {
            Some(mut ctrl_c) => {
                ctrl_c.recv().await;
                info!(signal = "ctrl-c", "Shutdown signal received");
            }
            None => std::future::pending::<()>().await,
        }
    }
}

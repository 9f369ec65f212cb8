//! Listener lifecycle: bind, accept, drain.
//!
//! # Lifecycle
//!
//! ```text
//! TunnelServer::new(config)
//!       |
//!       v
//! TunnelServer::start() --> TunnelHandle
//!       |                       |
//!       v                       |
//! accept loop (own task)        |
//! one handler task per client   |
//!       |                       v
//!       |               TunnelHandle::shutdown()
//!       |                       |
//!       v                       v
//! listener closed <-------------+
//!       |
//!       v
//! wait for ConnectionTracker to reach zero
//! ```

use crate::{
    handle_connection, shutdown_signal, ConnectionTracker, Dial, ProxyError, Result,
    ShutdownPhase, Socks5Dialer,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Default upper bound on the proxy connect + SOCKS5 handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one run of the tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Local address to listen on (`host:port`).
    pub listen_addr: String,

    /// Target every connection is forwarded to (`host:port`).
    /// Resolved by the proxy, not locally.
    pub remote_addr: String,

    /// SOCKS5 proxy address (`host:port`).
    pub socks_addr: String,

    /// Upstream dial timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,
}

impl TunnelConfig {
    /// Create a config with the default dial timeout.
    pub fn new(
        listen_addr: impl Into<String>,
        remote_addr: impl Into<String>,
        socks_addr: impl Into<String>,
    ) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            remote_addr: remote_addr.into(),
            socks_addr: socks_addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Handle for controlling a running tunnel.
///
/// Dropping the handle without calling [`TunnelHandle::shutdown`] stops the
/// accept loop but does not wait for in-flight connections.
pub struct TunnelHandle {
    /// Actual bound address of the listener.
    local_addr: SocketAddr,

    /// Stop signal for the accept loop.
    stop_tx: Option<oneshot::Sender<()>>,

    /// Accept loop task; owns the listener.
    accept_task: Option<JoinHandle<Result<()>>>,

    /// In-flight connections.
    tracker: ConnectionTracker,

    /// Current lifecycle phase.
    phase: watch::Sender<ShutdownPhase>,
}

impl TunnelHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently being handled.
    pub fn active_connections(&self) -> usize {
        self.tracker.active()
    }

    /// A handle to the in-flight connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Check if the accept loop is still admitting connections.
    pub fn is_accepting(&self) -> bool {
        self.accept_task
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    /// Watch lifecycle phase changes, including those made by `shutdown`.
    pub fn subscribe_phase(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase.subscribe()
    }

    /// Shut down the tunnel gracefully.
    ///
    /// Closes the listener, then waits for every in-flight connection to
    /// finish on its own. There is no deadline: a relay whose peers never
    /// close keeps this pending.
    ///
    /// # Errors
    /// * `ProxyError::Shutdown` - The accept loop task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.stop_tx.take() {
            // The loop may already be gone after an accept failure.
            let _ = tx.send(());
        }

        if let Some(task) = self.accept_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Accept loop had stopped before shutdown");
                }
                Err(e) => {
                    return Err(ProxyError::Shutdown(format!("accept loop task failed: {e}")));
                }
            }
        }
        self.phase.send_replace(ShutdownPhase::Draining);
        info!(listen = %self.local_addr, "Stopped accepting new connections");

        let active = self.tracker.active();
        if active > 0 {
            info!(active, "Waiting for active connections to finish");
        }
        self.tracker.wait_idle().await;
        self.phase.send_replace(ShutdownPhase::Drained);
        info!("All connections closed");

        self.phase.send_replace(ShutdownPhase::Terminated);
        debug!(phase = %ShutdownPhase::Terminated, "Shutdown complete");
        Ok(())
    }
}

/// Local listener that tunnels connections through a dialer.
pub struct TunnelServer<D = Socks5Dialer> {
    /// Server configuration.
    config: TunnelConfig,

    /// Upstream dialer shared by all handlers.
    dialer: Arc<D>,
}

impl TunnelServer<Socks5Dialer> {
    /// Create a tunnel that dials through the configured SOCKS5 proxy.
    ///
    /// # Errors
    /// * `ProxyError::InvalidProxyAddress` - `config.socks_addr` is not
    ///   `host:port`.
    pub fn new(config: TunnelConfig) -> Result<Self> {
        let dialer = Socks5Dialer::new(config.socks_addr.clone(), config.connect_timeout)?;
        Ok(Self::with_dialer(config, dialer))
    }
}

impl<D: Dial> TunnelServer<D> {
    /// Create a tunnel with a custom upstream dialer.
    pub fn with_dialer(config: TunnelConfig, dialer: D) -> Self {
        Self {
            config,
            dialer: Arc::new(dialer),
        }
    }

    /// The configuration this server runs with.
    pub fn config(&self) -> &TunnelConfig {
        &self.config
    }

    /// Bind the listener and start accepting connections.
    ///
    /// # Errors
    /// * `ProxyError::Bind` - If binding `config.listen_addr` fails.
    pub async fn start(self) -> Result<TunnelHandle> {
        let listener = TcpListener::bind(self.config.listen_addr.as_str())
            .await
            .map_err(|e| ProxyError::Bind {
                addr: self.config.listen_addr.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr().map_err(|e| ProxyError::Bind {
            addr: self.config.listen_addr.clone(),
            source: e,
        })?;

        info!(
            listen = %local_addr,
            remote = %self.config.remote_addr,
            socks = %self.config.socks_addr,
            "Tunnel listening"
        );

        let tracker = ConnectionTracker::new();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (phase, _) = watch::channel(ShutdownPhase::Running);

        let accept_task = tokio::spawn(accept_loop(
            listener,
            stop_rx,
            Arc::from(self.config.remote_addr.as_str()),
            self.dialer,
            tracker.clone(),
        ));

        Ok(TunnelHandle {
            local_addr,
            stop_tx: Some(stop_tx),
            accept_task: Some(accept_task),
            tracker,
            phase,
        })
    }

    /// Run until `shutdown` resolves, then drain and return.
    ///
    /// # Errors
    /// * `ProxyError::Bind` - If binding the listener fails.
    /// * `ProxyError::Shutdown` - If the accept loop task panicked.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        shutdown.await;
        info!("Shutting down");
        handle.shutdown().await
    }

    /// Run until SIGINT or SIGTERM, then drain and return.
    ///
    /// # Errors
    /// See [`TunnelServer::run_until`].
    pub async fn run(self) -> Result<()> {
        // Handlers go in before the bind inside `run_until`.
        let signal = shutdown_signal();
        self.run_until(signal).await
    }
}

/// Accept clients until told to stop or accept fails.
///
/// The listener is dropped (closed) when this returns.
async fn accept_loop<D: Dial>(
    listener: TcpListener,
    mut stop_rx: oneshot::Receiver<()>,
    target: Arc<str>,
    dialer: Arc<D>,
    tracker: ConnectionTracker,
) -> Result<()> {
    loop {
        let (client, peer) = tokio::select! {
            biased;
            // Fires on an explicit stop and when the handle is dropped.
            _ = &mut stop_rx => {
                debug!("Accept loop stopping");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "Accept failed; no new connections will be admitted");
                    return Err(ProxyError::Accept(e));
                }
            },
        };

        // Register before spawning so a drain never sees zero while a
        // handler is starting.
        let guard = tracker.track();
        let target = Arc::clone(&target);
        let dialer = Arc::clone(&dialer);

        tokio::spawn(async move {
            handle_connection(client, peer, &target, dialer.as_ref(), guard).await;
        });
    }
}

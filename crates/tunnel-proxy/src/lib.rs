//! Local TCP listener that tunnels every connection through a SOCKS5 proxy.
//!
//! `tunnel-proxy` accepts connections on a local address, dials a fixed
//! remote target through an upstream SOCKS5 proxy, and relays bytes in both
//! directions until either side closes.
//!
//! # Architecture
//!
//! ```text
//! Local client
//!       |
//!       v
//! Accept loop (127.0.0.1:10808)
//!       |
//!       +-- ConnectionTracker.track()   (before spawn)
//!       |
//!       v
//! Connection handler (one task per client)
//!       |
//!       +-- Dial::dial(remote) via SOCKS5 proxy
//!       |      |
//!       |      +-- failed?  --> log, close client, release guard
//!       |
//!       +-- relay(client, upstream) until either side closes
//!       |
//!       v
//! ConnectionGuard dropped --> tracker count decremented
//! ```
//!
//! # Components
//!
//! - [`TunnelServer`]: Binds the listener and starts the accept loop
//! - [`TunnelHandle`]: Controls a running server and sequences shutdown
//! - [`Socks5Dialer`]: Opens upstream streams through an anonymous SOCKS5 proxy
//! - [`ConnectionTracker`]: Counted barrier over in-flight connections
//! - [`relay`]: Bidirectional copy between two TCP streams
//!
//! # Usage
//!
//! ```ignore
//! use tunnel_proxy::{TunnelConfig, TunnelServer};
//!
//! let config = TunnelConfig::new("127.0.0.1:10808", "example.com:80", "127.0.0.1:1080");
//! TunnelServer::new(config)?.run().await?;
//! ```

mod dialer;
mod handler;
mod relay;
mod server;
mod shutdown;
mod tracker;

#[cfg(test)]
mod test_support;

pub use dialer::{Dial, Socks5Dialer};
pub use handler::handle_connection;
pub use relay::{is_teardown_error, relay, Direction, RelayStats};
pub use server::{TunnelConfig, TunnelHandle, TunnelServer, DEFAULT_CONNECT_TIMEOUT};
pub use shutdown::{shutdown_signal, ShutdownPhase};
pub use tracker::{ConnectionGuard, ConnectionTracker};

/// Result type for tunnel operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur in tunnel operations.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Failed to bind the local listener.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The SOCKS5 proxy address is not a usable `host:port`.
    #[error("Invalid SOCKS5 proxy address {addr:?}: {reason}")]
    InvalidProxyAddress { addr: String, reason: String },

    /// Connecting to the target through the proxy failed.
    #[error("Failed to reach {target} through SOCKS5 proxy {proxy}: {source}")]
    Dial {
        target: String,
        proxy: String,
        #[source]
        source: tokio_socks::Error,
    },

    /// The proxy did not complete the handshake in time.
    #[error("Timed out after {timeout:?} reaching {target} through SOCKS5 proxy {proxy}")]
    DialTimeout {
        target: String,
        proxy: String,
        timeout: std::time::Duration,
    },

    /// Accepting a client connection failed for a reason other than shutdown.
    #[error("Accept loop stopped: {0}")]
    Accept(#[source] std::io::Error),

    /// Server shutdown error.
    #[error("Server shutdown error: {0}")]
    Shutdown(String),
}

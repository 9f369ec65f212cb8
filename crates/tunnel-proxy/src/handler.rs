//! Per-connection handling.
//!
//! # Connection Flow
//!
//! ```text
//! accepted client (guard already registered)
//!         |
//!         v
//! dialer.dial(target)
//!         |
//!         +-- error --> log, close client, release guard
//!         |
//!         v
//! relay(client, upstream) until either side closes
//!         |
//!         v
//! both streams closed --> release guard
//! ```

use crate::{relay, ConnectionGuard, Dial};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::{info, info_span, warn, Instrument};

/// Tunnel one accepted client to `target` through `dialer`.
///
/// Owns the client stream and the tracker registration for the whole
/// connection. Both streams are closed before `guard` is released, on every
/// path. Failures are logged, never returned: the client only ever sees its
/// connection close.
pub async fn handle_connection<D: Dial>(
    client: TcpStream,
    peer: SocketAddr,
    target: &str,
    dialer: &D,
    guard: ConnectionGuard,
) {
    info!(client = %peer, remote = target, "Client connected, dialing target through proxy");

    let upstream = match dialer.dial(target).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(client = %peer, remote = target, error = %e, "Upstream dial failed");
            drop(client);
            drop(guard);
            return;
        }
    };
    info!(client = %peer, remote = target, "Upstream link established");

    let stats = relay(client, upstream)
        .instrument(info_span!("relay", client = %peer))
        .await;
    info!(
        client = %peer,
        sent = stats.client_to_upstream,
        received = stats.upstream_to_client,
        "Connection closed"
    );

    drop(guard);
}

//! Bidirectional relay between a client and its upstream.
//!
//! # Relay Flow
//!
//! ```text
//! client.read ---> upstream.write     (ClientToUpstream)
//! client.write <--- upstream.read     (UpstreamToClient)
//!
//! either direction ends (EOF / error)
//!         |
//!         v
//! shut down its destination + CloseSignal::close()
//!         |
//!         v
//! other direction wakes, shuts down its destination, ends
//! ```
//!
//! A direction that finishes always closes the opposite one as well, so a
//! client that stops sending can never keep the upstream half alive.

use std::fmt;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Copy buffer size per direction.
const BUFFER_SIZE: usize = 16 * 1024;

/// Direction of a copy within a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes read from the client, written upstream.
    ClientToUpstream,
    /// Bytes read from upstream, written to the client.
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToUpstream => f.write_str("client->upstream"),
            Direction::UpstreamToClient => f.write_str("upstream->client"),
        }
    }
}

/// Bytes moved by a finished relay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the client to upstream.
    pub client_to_upstream: u64,
    /// Bytes copied from upstream to the client.
    pub upstream_to_client: u64,
}

/// Returns true for errors that only mean the stream was already torn down.
///
/// These happen routinely when the peer (or the opposite relay direction)
/// closes first and are not reported.
pub fn is_teardown_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

/// Idempotent "this pair is closing" flag shared by both directions.
struct CloseSignal {
    tx: watch::Sender<bool>,
}

impl CloseSignal {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Mark the pair closed. Returns true only for the first caller.
    fn close(&self) -> bool {
        !self.tx.send_replace(true)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Relay bytes between `client` and `upstream` until both directions end.
///
/// Consumes both streams; they are closed when this returns. Errors are
/// logged here and never returned: unexpected I/O errors at `warn`, teardown
/// errors at `debug`.
pub async fn relay(client: TcpStream, upstream: TcpStream) -> RelayStats {
    let (client_read, client_write) = client.into_split();
    let (upstream_read, upstream_write) = upstream.into_split();

    let signal = CloseSignal::new();

    let (client_to_upstream, upstream_to_client) = tokio::join!(
        pipe(client_read, upstream_write, &signal, Direction::ClientToUpstream),
        pipe(upstream_read, client_write, &signal, Direction::UpstreamToClient),
    );

    RelayStats {
        client_to_upstream,
        upstream_to_client,
    }
}

/// Copy `src` into `dst` until EOF, an error, or the pair closing.
///
/// Returns the number of bytes written to `dst`.
async fn pipe(
    mut src: OwnedReadHalf,
    mut dst: OwnedWriteHalf,
    signal: &CloseSignal,
    direction: Direction,
) -> u64 {
    let mut closed = signal.subscribe();
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut copied: u64 = 0;

    let outcome: io::Result<()> = loop {
        let step = async {
            let n = src.read(&mut buf).await?;
            if n > 0 {
                dst.write_all(&buf[..n]).await?;
            }
            Ok::<usize, io::Error>(n)
        };

        tokio::select! {
            _ = wait_closed(&mut closed) => break Ok(()),
            result = step => match result {
                Ok(0) => break Ok(()),
                Ok(n) => copied += n as u64,
                Err(e) => break Err(e),
            },
        }
    };

    // Best-effort: the destination may already be gone.
    let _ = dst.shutdown().await;
    if signal.close() {
        debug!(%direction, bytes = copied, "Relay direction finished first, closing pair");
    }

    match outcome {
        Ok(()) => {}
        Err(e) if is_teardown_error(&e) => {
            debug!(%direction, error = %e, "Relay stream torn down");
        }
        Err(e) => {
            warn!(%direction, error = %e, "Relay stream error");
        }
    }

    copied
}

/// Resolve once the pair is marked closed.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    // The sender outlives both directions, so this only returns on close.
    let _ = closed.wait_for(|closed| *closed).await;
}

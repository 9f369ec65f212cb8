//! Upstream dialers.
//!
//! A [`Dial`] implementation opens the upstream half of a tunnel: a TCP
//! stream that is already connected to the remote target. The production
//! implementation, [`Socks5Dialer`], performs an anonymous SOCKS5 CONNECT
//! handshake and hands back the underlying socket.
//!
//! ```text
//! Socks5Dialer::dial("example.com:80")
//!         |
//!         v
//! TCP connect to proxy (127.0.0.1:1080)
//!         |
//!         v
//! greeting: NO_AUTH  -->  CONNECT example.com:80
//!         |
//!         +-- reply SUCCEEDED --> TcpStream (tunnelled)
//!         +-- anything else   --> ProxyError::Dial
//! ```

use crate::{ProxyError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

/// Opens upstream connections to a target address.
pub trait Dial: Send + Sync + 'static {
    /// Connect to `target` (`host:port`) and return a stream tunnelled to it.
    ///
    /// # Errors
    /// Returns an error if the upstream link cannot be established. Callers
    /// treat this as a per-connection failure and never retry.
    fn dial(&self, target: &str) -> impl Future<Output = Result<TcpStream>> + Send;
}

/// Dialer that reaches targets through an anonymous SOCKS5 proxy.
#[derive(Debug, Clone)]
pub struct Socks5Dialer {
    /// Proxy address as `host:port`.
    proxy_addr: String,

    /// Upper bound on proxy connect + handshake.
    connect_timeout: Duration,
}

impl Socks5Dialer {
    /// Create a dialer for the proxy at `proxy_addr`.
    ///
    /// # Errors
    /// * `ProxyError::InvalidProxyAddress` - `proxy_addr` is not `host:port`
    ///   with a non-zero port, or an IPv6 host is missing its brackets.
    pub fn new(proxy_addr: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let proxy_addr = proxy_addr.into();
        validate_host_port(&proxy_addr)?;
        Ok(Self {
            proxy_addr,
            connect_timeout,
        })
    }

    /// The proxy this dialer connects through.
    pub fn proxy_addr(&self) -> &str {
        &self.proxy_addr
    }

    /// The dial timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Dial for Socks5Dialer {
    async fn dial(&self, target: &str) -> Result<TcpStream> {
        let connect = Socks5Stream::connect(self.proxy_addr.as_str(), target);

        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream.into_inner()),
            Ok(Err(source)) => Err(ProxyError::Dial {
                target: target.to_string(),
                proxy: self.proxy_addr.clone(),
                source,
            }),
            Err(_) => Err(ProxyError::DialTimeout {
                target: target.to_string(),
                proxy: self.proxy_addr.clone(),
                timeout: self.connect_timeout,
            }),
        }
    }
}

/// Check that `addr` looks like `host:port`.
///
/// Name resolution is left to the proxy connect; this only rejects strings
/// that could never be dialed.
fn validate_host_port(addr: &str) -> Result<()> {
    let invalid = |reason: &str| ProxyError::InvalidProxyAddress {
        addr: addr.to_string(),
        reason: reason.to_string(),
    };

    let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err(invalid("IPv6 hosts must be written in brackets, e.g. [::1]:1080"));
    }
    if host == "[]" {
        return Err(invalid("missing host"));
    }
    match port.parse::<u16>() {
        Ok(0) => Err(invalid("port 0 cannot be dialed")),
        Ok(_) => Ok(()),
        Err(_) => Err(invalid("port is not a number between 1 and 65535")),
    }
}

//! Loopback servers shared by the unit tests.

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Bind a listener, or `None` when the sandbox forbids binding.
pub(crate) async fn tcp_listener_or_skip(addr: &str) -> Option<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Some(listener),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => None,
        Err(err) => panic!("Failed to bind TCP listener for test: {err}"),
    }
}

/// Start a server that echoes every byte back until the peer closes.
pub(crate) async fn spawn_echo_server() -> Option<SocketAddr> {
    let listener = tcp_listener_or_skip("127.0.0.1:0").await?;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut read, mut write) = stream.split();
                let _ = tokio::io::copy(&mut read, &mut write).await;
            });
        }
    });
    Some(addr)
}

/// Start a minimal anonymous SOCKS5 server (CONNECT only).
///
/// Accepts IPv4, IPv6 and domain targets, connects to them directly and
/// relays until either side closes.
pub(crate) async fn spawn_socks5_server() -> Option<SocketAddr> {
    let listener = tcp_listener_or_skip("127.0.0.1:0").await?;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_socks5(stream));
        }
    });
    Some(addr)
}

async fn serve_socks5(mut client: TcpStream) -> std::io::Result<()> {
    // Greeting: VER NMETHODS METHODS...
    let mut head = [0u8; 2];
    client.read_exact(&mut head).await?;
    let mut methods = vec![0u8; head[1] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[0x05, 0x00]).await?;

    // Request: VER CMD RSV ATYP
    let mut req = [0u8; 4];
    client.read_exact(&mut req).await?;
    let target = match req[3] {
        0x01 => {
            let mut buf = [0u8; 6];
            client.read_exact(&mut buf).await?;
            let ip = std::net::Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
            format!("{}:{}", ip, u16::from_be_bytes([buf[4], buf[5]]))
        }
        0x03 => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            client.read_exact(&mut name).await?;
            let mut port = [0u8; 2];
            client.read_exact(&mut port).await?;
            format!(
                "{}:{}",
                String::from_utf8_lossy(&name),
                u16::from_be_bytes(port)
            )
        }
        0x04 => {
            let mut buf = [0u8; 18];
            client.read_exact(&mut buf).await?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[..16]);
            let ip = std::net::Ipv6Addr::from(octets);
            format!("[{}]:{}", ip, u16::from_be_bytes([buf[16], buf[17]]))
        }
        _ => return Ok(()),
    };

    let mut upstream = match TcpStream::connect(&target).await {
        Ok(stream) => stream,
        Err(_) => {
            // CONNECTION_REFUSED with a 0.0.0.0:0 bound address.
            client
                .write_all(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
                .await?;
            return Ok(());
        }
    };
    client
        .write_all(&[0x05, 0x00, 0x00, 0x01, 127, 0, 0, 1, 0, 0])
        .await?;

    let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
    Ok(())
}

/// A connected loopback pair: `(ours, theirs)`.
pub(crate) async fn tcp_pair() -> Option<(TcpStream, TcpStream)> {
    let listener = tcp_listener_or_skip("127.0.0.1:0").await?;
    let addr = listener.local_addr().unwrap();
    let (ours, theirs) = tokio::join!(TcpStream::connect(addr), listener.accept());
    Some((ours.unwrap(), theirs.unwrap().0))
}

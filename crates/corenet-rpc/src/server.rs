// Path: crates/corenet-rpc/src/server.rs
//! The admin channel's own listening sockets (§4.5): "One listening
//! socket. Per accepted connection, a per-connection state machine." One
//! `tokio::net::TcpListener` serves loopback and remote peers, one
//! optional `UnixListener` serves local Unix-domain peers; both drain each
//! accepted connection through a fresh [`RequestParser`] and hand
//! completed request bodies to [`Dispatcher::dispatch`].

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};

use crate::access::PeerKind;
use crate::conn::RequestParser;
use crate::dispatch::Dispatcher;

const READ_CHUNK: usize = 4096;

/// Accepts TCP connections on `addr` until the listener errors, spawning
/// one task per connection. Each peer's [`PeerKind`] is derived from its
/// socket address, so loopback callers skip the allow-list gate the same
/// way a Unix-domain caller would.
pub async fn serve_tcp(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(target: "rpc", %addr, "admin channel listening on tcp");
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let dispatcher = dispatcher.clone();
        let peer = PeerKind::for_ip(peer_addr.ip());
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, peer, &dispatcher).await {
                tracing::debug!(target: "rpc", %peer_addr, error = %e, "admin connection ended");
            }
        });
    }
}

/// Accepts Unix-domain connections on `path` until the listener errors.
/// Every connection is `PeerKind::UnixDomain`, since the socket itself
/// only a local process with filesystem access could have opened.
pub async fn serve_unix(path: &Path, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path)?;
    tracing::info!(target: "rpc", path = %path.display(), "admin channel listening on unix socket");
    loop {
        let (stream, _) = listener.accept().await?;
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, PeerKind::UnixDomain, &dispatcher).await {
                tracing::debug!(target: "rpc", error = %e, "admin connection ended");
            }
        });
    }
}

/// Drives one connection: read into a buffer, hand it to the connection's
/// `RequestParser`, dispatch each completed request, write the response
/// back, repeat. A zero-length read ends the connection.
async fn serve_connection<S>(mut stream: S, peer: PeerKind, dispatcher: &Dispatcher) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut parser = RequestParser::new();
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        while let Some(body) = parser.advance(&mut buf) {
            parser.reset();
            let (tx, rx) = tokio::sync::oneshot::channel();
            dispatcher.dispatch(peer, &body, move |resp| {
                let _ = tx.send(resp);
            });
            if let Ok(resp) = rx.await {
                stream.write_all(&resp).await?;
            }
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessControl;
    use crate::protocol::ResponseValue;
    use crate::registry::CommandRegistry;
    use std::sync::Arc;
    use tokio::io::duplex;

    fn dispatcher_with_echo() -> Arc<Dispatcher> {
        let registry = CommandRegistry::new();
        registry
            .register("echo", "echoes its first param back", Arc::new(|params| Ok(ResponseValue::Json(params[0].clone()))))
            .unwrap();
        Arc::new(Dispatcher::new(Arc::new(registry), AccessControl::new(false)))
    }

    #[tokio::test]
    async fn a_request_written_to_the_stream_gets_a_response_back() {
        let (mut client, server_side) = duplex(4096);
        let dispatcher = dispatcher_with_echo();
        tokio::spawn(async move {
            let _ = serve_connection(server_side, PeerKind::Loopback, &dispatcher).await;
        });

        let body = br#"{"method":"echo","params":["hi"],"id":1,"version":1}"#;
        let request = format!("Content-Length: {}\r\n\r\n", body.len());
        client.write_all(request.as_bytes()).await.unwrap();
        client.write_all(body).await.unwrap();

        let mut resp = vec![0u8; 4096];
        let n = client.read(&mut resp).await.unwrap();
        let text = String::from_utf8_lossy(&resp[..n]);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("\"result\":\"hi\""));
    }

    #[tokio::test]
    async fn a_second_pipelined_request_on_the_same_connection_also_gets_answered() {
        let (mut client, server_side) = duplex(4096);
        let dispatcher = dispatcher_with_echo();
        tokio::spawn(async move {
            let _ = serve_connection(server_side, PeerKind::Loopback, &dispatcher).await;
        });

        for value in ["first", "second"] {
            let body = format!(r#"{{"method":"echo","params":["{value}"],"id":1,"version":1}}"#);
            let request = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
            client.write_all(request.as_bytes()).await.unwrap();

            let mut resp = vec![0u8; 4096];
            let n = client.read(&mut resp).await.unwrap();
            let text = String::from_utf8_lossy(&resp[..n]);
            assert!(text.contains(&format!("\"result\":\"{value}\"")));
        }
    }
}

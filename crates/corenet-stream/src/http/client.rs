// Path: crates/corenet-stream/src/http/client.rs
use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::parse::{find_header_end, parse_head};

const DEFAULT_CONNECT_TIMEOUT_SEC: u64 = 20;
const DEFAULT_READ_TIMEOUT_SEC: u64 = 5;
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const MAX_REDIRECTS: u32 = 8;
const READ_CHUNK: usize = 8192;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub host: String,
    pub port: u16,
    pub method: HttpMethod,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub cookie: Option<String>,
    pub headers: Vec<(String, String)>,
    pub tls: bool,
    /// Whether a loopback/any/unspecified host is acceptable for this
    /// request; off by default, matching the non-loopback-context reject
    /// rule in the resolution step.
    pub allow_loopback: bool,
}

impl HttpRequest {
    pub fn get(host: impl Into<String>, port: u16, path: impl Into<String>) -> HttpRequest {
        HttpRequest {
            host: host.into(),
            port,
            method: HttpMethod::Get,
            path: path.into(),
            content_type: None,
            body: Vec::new(),
            cookie: None,
            headers: Vec::new(),
            tls: false,
            allow_loopback: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_body_bytes: usize,
    pub max_redirects: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        HttpClientConfig {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SEC),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SEC),
            max_body_bytes: MAX_BODY_BYTES,
            max_redirects: MAX_REDIRECTS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("host resolves to a loopback/unspecified address outside a loopback context")]
    RejectedHost,
    #[error("tls was requested but no tls stack is available in this build")]
    TlsUnavailable,
    #[error("connect timed out")]
    ConnectTimedOut,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("response body exceeded the 10 MiB hard limit (-413)")]
    BodyTooLarge,
    #[error("redirect count exceeded the compile-time cap (-301)")]
    TooManyRedirects,
    #[error("redirect response carried no Location header (-302)")]
    MissingLocation,
    #[error("peer closed with a body expected but undelivered (-6)")]
    PrematureDisconnectDuringBody,
    #[error("peer closed after headers with no Content-Length (-7)")]
    PrematureDisconnectHeadersOnly,
    #[error("peer closed before sending any response (-8)")]
    PrematureDisconnectNothing,
}

fn reject_host(host: &str, allow_loopback: bool) -> bool {
    if allow_loopback {
        return false;
    }
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

fn build_request_bytes(req: &HttpRequest) -> Vec<u8> {
    let mut out = Vec::new();
    let (method_str, path, body): (&str, String, &[u8]) = match req.method {
        HttpMethod::Post => ("POST", req.path.clone(), &req.body),
        HttpMethod::Get => {
            if req.body.is_empty() {
                ("GET", req.path.clone(), &[])
            } else {
                let qs = String::from_utf8_lossy(&req.body);
                let sep = if req.path.contains('?') { "&" } else { "?" };
                ("GET", format!("{}{}{}", req.path, sep, qs), &[])
            }
        }
    };

    out.extend_from_slice(format!("{} {} HTTP/1.1\r\n", method_str, path).as_bytes());
    out.extend_from_slice(format!("Host: {}\r\n", req.host).as_bytes());

    match req.method {
        HttpMethod::Post => {
            let ct = req.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
            out.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
            out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        }
        HttpMethod::Get => {
            out.extend_from_slice(b"User-Agent: corenet/1.0\r\n");
        }
    }
    if let Some(cookie) = &req.cookie {
        out.extend_from_slice(format!("Cookie: {}\r\n", cookie).as_bytes());
    }
    for (name, value) in &req.headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(b"Connection: close\r\n\r\n");
    out.extend_from_slice(body);
    out
}

/// Resolves a `Location` header against the request that produced it.
fn resolve_location(location: &str, original: &HttpRequest) -> (String, u16, String, bool) {
    if let Some(rest) = location.strip_prefix("https://") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = split_authority(authority, 443);
        (host, port, format!("/{}", path), true)
    } else if let Some(rest) = location.strip_prefix("http://") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = split_authority(authority, 80);
        (host, port, format!("/{}", path), false)
    } else if let Some(rest) = location.strip_prefix("//") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = split_authority(authority, if original.tls { 443 } else { 80 });
        (host, port, format!("/{}", path), original.tls)
    } else {
        (original.host.clone(), original.port, location.to_string(), original.tls)
    }
}

fn split_authority(authority: &str, default_port: u16) -> (String, u16) {
    match authority.split_once(':') {
        Some((h, p)) => (h.to_string(), p.parse().unwrap_or(default_port)),
        None => (authority.to_string(), default_port),
    }
}

/// Performs one HTTP/1.1 request, following redirects up to
/// `config.max_redirects`.
pub async fn send(req: HttpRequest, config: &HttpClientConfig) -> Result<HttpResponse, HttpError> {
    send_with_redirects(req, config, 0).await
}

async fn send_with_redirects(
    req: HttpRequest,
    config: &HttpClientConfig,
    redirect_count: u32,
) -> Result<HttpResponse, HttpError> {
    if req.tls {
        return Err(HttpError::TlsUnavailable);
    }
    if reject_host(&req.host, req.allow_loopback) {
        return Err(HttpError::RejectedHost);
    }

    let addr = format!("{}:{}", req.host, req.port);
    let mut stream = timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| HttpError::ConnectTimedOut)??;

    let request_bytes = build_request_bytes(&req);
    stream.write_all(&request_bytes).await?;

    let response = read_response(&mut stream, config).await?;

    if matches!(response.status, 301 | 302 | 307 | 308) {
        let location = response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("location"))
            .map(|(_, v)| v.clone());
        let location = match location {
            Some(l) => l,
            None => return Err(HttpError::MissingLocation),
        };
        if redirect_count + 1 > config.max_redirects {
            return Err(HttpError::TooManyRedirects);
        }
        let (host, port, path, tls) = resolve_location(&location, &req);
        let next = HttpRequest {
            host,
            port,
            path,
            tls,
            ..req
        };
        return Box::pin(send_with_redirects(next, config, redirect_count + 1)).await;
    }

    Ok(response)
}

async fn read_response(stream: &mut TcpStream, config: &HttpClientConfig) -> Result<HttpResponse, HttpError> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let mut header_end = None;

    loop {
        let n = match timeout(config.read_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(HttpError::Io(e)),
            Err(_) => break,
        };
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > config.max_body_bytes {
            return Err(HttpError::BodyTooLarge);
        }
        if header_end.is_none() {
            header_end = find_header_end(&buf);
        }
        if let Some(end) = header_end {
            let head = parse_head(&buf[..end - 4]).ok_or(HttpError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "malformed response head",
            )))?;
            if let Some(len) = head.content_length() {
                if buf.len() - end >= len {
                    return Ok(HttpResponse {
                        status: head.status,
                        headers: head.headers,
                        body: buf[end..end + len].to_vec(),
                    });
                }
            }
        }
    }

    match header_end {
        None if buf.is_empty() => Err(HttpError::PrematureDisconnectNothing),
        None => Err(HttpError::PrematureDisconnectHeadersOnly),
        Some(end) => {
            let head = parse_head(&buf[..end - 4]).ok_or(HttpError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "malformed response head",
            )))?;
            match head.content_length() {
                Some(len) if buf.len() - end < len => Err(HttpError::PrematureDisconnectDuringBody),
                _ => Ok(HttpResponse {
                    status: head.status,
                    headers: head.headers,
                    body: buf[end..].to_vec(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn get_request_round_trips_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            let _ = &buf[..n];
            let body = b"hello";
            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                std::str::from_utf8(body).unwrap()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
        });

        let req = HttpRequest {
            allow_loopback: true,
            ..HttpRequest::get(addr.ip().to_string(), addr.port(), "/")
        };
        let resp = send(req, &HttpClientConfig::default()).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"hello");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_loopback_host_by_default() {
        let req = HttpRequest::get("127.0.0.1", 80, "/");
        let err = send(req, &HttpClientConfig::default()).await.unwrap_err();
        assert!(matches!(err, HttpError::RejectedHost));
    }

    #[tokio::test]
    async fn redirect_without_location_is_dash_302() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(b"HTTP/1.1 302 Found\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let req = HttpRequest {
            allow_loopback: true,
            ..HttpRequest::get(addr.ip().to_string(), addr.port(), "/")
        };
        let err = send(req, &HttpClientConfig::default()).await.unwrap_err();
        assert!(matches!(err, HttpError::MissingLocation));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn premature_close_with_no_headers_is_dash_8() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            drop(sock);
        });

        let req = HttpRequest {
            allow_loopback: true,
            ..HttpRequest::get(addr.ip().to_string(), addr.port(), "/")
        };
        let err = send(req, &HttpClientConfig::default()).await.unwrap_err();
        assert!(matches!(err, HttpError::PrematureDisconnectNothing));
        server.await.unwrap();
    }
}

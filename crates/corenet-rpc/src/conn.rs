// Path: crates/corenet-rpc/src/conn.rs
//! The per-connection request parser (§4.5): state 0 initial, state 1
//! scans for `Content-Length: N\r\n`, state 2 finds the end-of-headers
//! `\r\n\r\n`, state 3 waits for the full body, then Ready extracts it.
//! Mirrors the header-boundary scan in `corenet-stream`'s HTTP client
//! parser, run against a request instead of a response.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Initial,
    ScanningContentLength,
    ScanningHeaderEnd,
    AwaitingBody,
    Ready,
}

/// Drives one connection's request-framing state machine against
/// whatever bytes have accumulated so far (e.g. an `EventSocket::input`
/// buffer). Call [`RequestParser::advance`] on every `read` callback;
/// once it returns a body, call [`RequestParser::reset`] before framing
/// the next request on the same connection.
#[derive(Debug, Clone, Default)]
pub struct RequestParser {
    state_inner: Option<ConnState>,
    content_length: Option<usize>,
    header_end: Option<usize>,
}

impl RequestParser {
    pub fn new() -> RequestParser {
        RequestParser::default()
    }

    pub fn state(&self) -> ConnState {
        self.state_inner.unwrap_or(ConnState::Initial)
    }

    pub fn reset(&mut self) {
        *self = RequestParser::new();
    }

    /// Advances the state machine. On completion, drains the consumed
    /// prefix (headers + body) from `buf` and returns the body bytes;
    /// returns `None` while more input is still needed.
    pub fn advance(&mut self, buf: &mut Vec<u8>) -> Option<Vec<u8>> {
        if self.state_inner.is_none() {
            self.state_inner = Some(ConnState::ScanningContentLength);
        }

        if self.state() == ConnState::ScanningContentLength {
            self.content_length = Some(scan_content_length(buf)?);
            self.state_inner = Some(ConnState::ScanningHeaderEnd);
        }

        if self.state() == ConnState::ScanningHeaderEnd {
            self.header_end = find_header_end(buf);
            if self.header_end.is_none() {
                return None;
            }
            self.state_inner = Some(ConnState::AwaitingBody);
        }

        if self.state() == ConnState::AwaitingBody {
            let header_end = self.header_end?;
            let content_length = self.content_length?;
            if buf.len() < header_end + content_length {
                return None;
            }
            let body = buf[header_end..header_end + content_length].to_vec();
            buf.drain(0..header_end + content_length);
            self.state_inner = Some(ConnState::Ready);
            return Some(body);
        }

        None
    }
}

fn scan_content_length(buf: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(buf).ok()?;
    for line in text.split("\r\n") {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse().ok();
        }
        if line.is_empty() {
            break;
        }
    }
    None
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_request_in_one_shot() {
        let mut parser = RequestParser::new();
        let mut buf = b"Content-Length: 5\r\nHost: x\r\n\r\nhello".to_vec();
        let body = parser.advance(&mut buf).unwrap();
        assert_eq!(body, b"hello");
        assert!(buf.is_empty());
        assert_eq!(parser.state(), ConnState::Ready);
    }

    #[test]
    fn returns_none_until_the_body_arrives_in_pieces() {
        let mut parser = RequestParser::new();
        let mut buf = b"Content-Length: 5\r\n".to_vec();
        assert!(parser.advance(&mut buf).is_none());
        buf.extend_from_slice(b"\r\n");
        assert!(parser.advance(&mut buf).is_none());
        buf.extend_from_slice(b"hel");
        assert!(parser.advance(&mut buf).is_none());
        buf.extend_from_slice(b"lo");
        let body = parser.advance(&mut buf).unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn leaves_a_second_pipelined_request_in_the_buffer() {
        let mut parser = RequestParser::new();
        let mut buf = b"Content-Length: 2\r\n\r\nhiContent-Length: 2\r\n\r\nbye".to_vec();
        let first = parser.advance(&mut buf).unwrap();
        assert_eq!(first, b"hi");
        assert_eq!(buf, b"Content-Length: 2\r\n\r\nbye");
    }
}

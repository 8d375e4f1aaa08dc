// Path: crates/corenet-stream/src/http/parse.rs
//! Response-head parsing: status line, header list, `Content-Length`.

#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.trim().parse().ok())
    }
}

/// Finds the `\r\n\r\n` boundary between headers and body, if present.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Parses the header block (not including the trailing `\r\n\r\n`).
pub fn parse_head(block: &[u8]) -> Option<ResponseHead> {
    let text = std::str::from_utf8(block).ok()?;
    let mut lines = text.split("\r\n");
    let status_line = lines.next()?;
    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next()?;
    let status: u16 = parts.next()?.parse().ok()?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    Some(ResponseHead { status, headers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_header_boundary() {
        let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabc";
        let end = find_header_end(buf).unwrap();
        assert_eq!(&buf[end..], b"abc");
    }

    #[test]
    fn parses_status_and_headers() {
        let head = parse_head(b"HTTP/1.1 301 Moved\r\nLocation: https://x/y\r\nContent-Length: 0").unwrap();
        assert_eq!(head.status, 301);
        assert_eq!(head.header("location"), Some("https://x/y"));
        assert_eq!(head.content_length(), Some(0));
    }
}

// Path: crates/corenet-rpc/src/response.rs
//! Assembles the HTTP-like response line, headers, and body (§4.5, §6).

/// Builds `HTTP/1.1 <status> <reason>\r\nContent-Length: N\r\nProcessing-Time: <nanos>\r\n<extra>\r\n\r\n<body>`.
pub fn build_http_response(
    status: u16,
    processing_time_nanos: u64,
    extra_headers: &[(String, String)],
    body: &[u8],
) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nProcessing-Time: {}\r\n",
        status,
        reason_phrase(status),
        body.len(),
        processing_time_nanos,
    );
    for (name, value) in extra_headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_status_line_and_headers() {
        let resp = build_http_response(200, 1500, &[("X-Extra".into(), "yes".into())], b"{}");
        let text = String::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.contains("Processing-Time: 1500\r\n"));
        assert!(text.contains("X-Extra: yes\r\n"));
        assert!(text.ends_with("\r\n\r\n{}"));
    }

    #[test]
    fn denial_uses_the_403_reason() {
        let resp = build_http_response(403, 0, &[], b"");
        assert!(String::from_utf8(resp).unwrap().starts_with("HTTP/1.1 403 Forbidden\r\n"));
    }
}

use std::collections::HashMap;

use crate::http::request::{Method, Request, normalize_path};

/// Largest request head the parser will buffer before giving up.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidHeader,
    InvalidContentLength,
    HeadTooLarge,
    Incomplete,
}

/// Parses a request line and headers from the front of `buf`.
///
/// Returns the request (with an empty body) and the number of bytes the head
/// occupied. Body framing is left to [`crate::http::body`], which reads the
/// payload off the connection only when a handler needs it.
pub fn parse_request_head(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let Some(headers_end) = find_headers_end(buf) else {
        if buf.len() > MAX_HEAD_BYTES {
            return Err(ParseError::HeadTooLarge);
        }
        return Err(ParseError::Incomplete);
    };
    if headers_end > MAX_HEAD_BYTES {
        return Err(ParseError::HeadTooLarge);
    }

    let headers_str =
        std::str::from_utf8(&buf[..headers_end]).map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    // Headers
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        headers.insert(key.to_string(), value.trim().to_string());
    }

    let request = Request {
        method,
        target: target.to_string(),
        path: normalize_path(target),
        version: version.to_string(),
        headers,
        peer: None,
        body: Default::default(),
    };

    if request.header("Content-Length").is_some() && !request.is_chunked() {
        request
            .header("Content-Length")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or(ParseError::InvalidContentLength)?;
    }

    Ok((request, headers_end + 4))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_request_head(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.header("host"), Some("example.com"));
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn head_consumption_stops_before_body() {
        let req = b"POST /x HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        let (parsed, consumed) = parse_request_head(req).unwrap();

        assert!(parsed.body.is_empty());
        assert_eq!(&req[consumed..], b"abc");
    }
}

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a response. With `head_only` the body bytes are left out but
/// the headers, including `Content-Length`, are unchanged.
fn serialize_response(resp: &Response, head_only: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + if head_only { 0 } else { resp.body.len() });

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    if !head_only {
        buf.extend_from_slice(&resp.body);
    }

    buf
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response, false),
            written: 0,
        }
    }

    /// Writer for a response to a `HEAD` request.
    pub fn head_only(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response, true),
            written: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }

        stream.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{ResponseBuilder, StatusCode};

    #[test]
    fn head_only_keeps_content_length() {
        let resp = ResponseBuilder::new(StatusCode::Ok)
            .body(b"hello".to_vec())
            .build();
        let writer = ResponseWriter::head_only(&resp);
        let text = String::from_utf8_lossy(writer.as_bytes());

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn writes_full_response() {
        let resp = Response::ok("hi");
        let mut writer = ResponseWriter::new(&resp);
        let mut out: Vec<u8> = Vec::new();

        writer.write_to_stream(&mut out).await.unwrap();

        assert!(out.ends_with(b"\r\n\r\nhi"));
    }
}

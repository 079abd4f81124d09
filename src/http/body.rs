//! Request body framing.
//!
//! The connection parses only the request head; the payload stays on the
//! wire until the dispatcher asks for it. [`BodyReader`] pulls it off in
//! `Content-Length` or chunked framing, and whatever the dispatcher did not
//! consume is drained afterwards so the next request on a kept-alive
//! connection starts at a request line.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::request::Request;

const READ_CHUNK: usize = 8192;

/// Longest chunk-size or trailer line accepted before the framing is
/// declared malformed.
const MAX_LINE: usize = 4096;

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("i/o error while reading body: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed before the body was complete")]
    UnexpectedEof,
    #[error("malformed chunked encoding")]
    MalformedChunk,
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(usize),
    ChunkSize,
    ChunkData(usize),
    ChunkEnd,
    Trailers,
    Done,
}

pub struct BodyReader<'a, S> {
    stream: &'a mut S,
    buf: &'a mut BytesMut,
    framing: Framing,
}

impl<'a, S> BodyReader<'a, S>
where
    S: AsyncRead + Unpin,
{
    /// `buf` holds whatever was read past the request head.
    pub fn new(request: &Request, stream: &'a mut S, buf: &'a mut BytesMut) -> Self {
        let framing = if request.is_chunked() {
            Framing::ChunkSize
        } else {
            match request.content_length() {
                0 => Framing::Done,
                n => Framing::Length(n),
            }
        };

        Self {
            stream,
            buf,
            framing,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.framing == Framing::Done
    }

    /// Accumulates the remaining body into one buffer.
    ///
    /// Fails as soon as the declared or received size passes `limit`, so at
    /// most one read past the limit is ever buffered.
    pub async fn collect(&mut self, limit: usize) -> Result<Bytes, BodyError> {
        let mut body = BytesMut::new();

        if let Framing::Length(n) = self.framing {
            if n > limit {
                return Err(BodyError::TooLarge { limit });
            }
            body.reserve(n);
        }

        while let Some(piece) = self.next_piece().await? {
            let declared = match self.framing {
                Framing::Length(left) | Framing::ChunkData(left) => left,
                _ => 0,
            };
            if body.len().saturating_add(piece.len()).saturating_add(declared) > limit {
                return Err(BodyError::TooLarge { limit });
            }
            body.extend_from_slice(&piece);
        }

        Ok(body.freeze())
    }

    /// Reads and discards the rest of the body.
    pub async fn drain(&mut self) -> Result<(), BodyError> {
        while self.next_piece().await?.is_some() {}
        Ok(())
    }

    async fn fill(&mut self) -> Result<(), BodyError> {
        self.buf.reserve(READ_CHUNK);
        let n = self.stream.read_buf(&mut *self.buf).await?;
        if n == 0 {
            return Err(BodyError::UnexpectedEof);
        }
        Ok(())
    }

    /// Position of the CRLF ending the buffered line, or `None` after
    /// reading more input.
    async fn next_line(&mut self) -> Result<Option<usize>, BodyError> {
        if let Some(end) = find_crlf(&self.buf) {
            return Ok(Some(end));
        }
        if self.buf.len() > MAX_LINE {
            return Err(BodyError::MalformedChunk);
        }
        self.fill().await?;
        Ok(None)
    }

    async fn next_piece(&mut self) -> Result<Option<Bytes>, BodyError> {
        loop {
            match self.framing {
                Framing::Done => return Ok(None),

                Framing::Length(remaining) => {
                    if self.buf.is_empty() {
                        self.fill().await?;
                    }
                    let take = remaining.min(self.buf.len());
                    let piece = self.buf.split_to(take).freeze();
                    self.framing = match remaining - take {
                        0 => Framing::Done,
                        left => Framing::Length(left),
                    };
                    return Ok(Some(piece));
                }

                Framing::ChunkSize => {
                    let Some(line_end) = self.next_line().await? else {
                        continue;
                    };
                    let size = parse_chunk_size(&self.buf[..line_end])?;
                    self.buf.advance(line_end + 2);
                    self.framing = if size == 0 {
                        Framing::Trailers
                    } else {
                        Framing::ChunkData(size)
                    };
                }

                Framing::ChunkData(remaining) => {
                    if self.buf.is_empty() {
                        self.fill().await?;
                    }
                    let take = remaining.min(self.buf.len());
                    let piece = self.buf.split_to(take).freeze();
                    self.framing = match remaining - take {
                        0 => Framing::ChunkEnd,
                        left => Framing::ChunkData(left),
                    };
                    return Ok(Some(piece));
                }

                Framing::ChunkEnd => {
                    if self.buf.len() < 2 {
                        self.fill().await?;
                        continue;
                    }
                    if &self.buf[..2] != b"\r\n" {
                        return Err(BodyError::MalformedChunk);
                    }
                    self.buf.advance(2);
                    self.framing = Framing::ChunkSize;
                }

                Framing::Trailers => {
                    let Some(line_end) = self.next_line().await? else {
                        continue;
                    };
                    self.buf.advance(line_end + 2);
                    if line_end == 0 {
                        self.framing = Framing::Done;
                    }
                }
            }
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, BodyError> {
    let line = std::str::from_utf8(line).map_err(|_| BodyError::MalformedChunk)?;
    let digits = line.split(';').next().unwrap_or_default().trim();
    usize::from_str_radix(digits, 16).map_err(|_| BodyError::MalformedChunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{Method, RequestBuilder};

    fn post(headers: &[(&str, &str)]) -> Request {
        let mut builder = RequestBuilder::new().method(Method::POST).path("/upload");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn content_length_body_is_exact() {
        let req = post(&[("Content-Length", "3")]);
        let mut wire: &[u8] = b"bcGET / HTTP/1.1\r\n";
        let mut buf = BytesMut::from(&b"a"[..]);

        let mut reader = BodyReader::new(&req, &mut wire, &mut buf);
        let body = reader.collect(1024).await.unwrap();

        assert_eq!(&body[..], b"abc");
        assert!(reader.is_finished());
        drop(reader);
        assert_eq!(&buf[..], b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn chunked_body_is_decoded() {
        let req = post(&[("Transfer-Encoding", "chunked")]);
        let mut wire: &[u8] = b"3\r\nabc\r\n2;ext=1\r\nde\r\n0\r\nX-Trailer: 1\r\n\r\n";
        let mut buf = BytesMut::new();

        let body = BodyReader::new(&req, &mut wire, &mut buf)
            .collect(1024)
            .await
            .unwrap();

        assert_eq!(&body[..], b"abcde");
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let req = post(&[("Content-Length", "10")]);
        let mut wire: &[u8] = b"0123456789";
        let mut buf = BytesMut::new();

        let err = BodyReader::new(&req, &mut wire, &mut buf)
            .collect(4)
            .await
            .unwrap_err();

        assert!(matches!(err, BodyError::TooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn huge_chunk_size_is_rejected_without_buffering() {
        let req = post(&[("Transfer-Encoding", "chunked")]);
        let mut wire: &[u8] = b"ffffffffffffffff\r\nabc";
        let mut buf = BytesMut::new();

        let err = BodyReader::new(&req, &mut wire, &mut buf)
            .collect(1024)
            .await
            .unwrap_err();

        assert!(matches!(err, BodyError::TooLarge { limit: 1024 }));
    }

    #[tokio::test]
    async fn chunk_size_wider_than_usize_is_malformed() {
        let req = post(&[("Transfer-Encoding", "chunked")]);
        let mut wire: &[u8] = b"1ffffffffffffffffffff\r\nabc";
        let mut buf = BytesMut::new();

        let err = BodyReader::new(&req, &mut wire, &mut buf)
            .collect(1024)
            .await
            .unwrap_err();

        assert!(matches!(err, BodyError::MalformedChunk));
    }

    #[tokio::test]
    async fn partial_chunk_is_yielded_before_it_completes() {
        let req = post(&[("Transfer-Encoding", "chunked")]);
        let mut wire: &[u8] = b"";
        let mut buf = BytesMut::from(&b"10\r\nabcd"[..]);

        let mut reader = BodyReader::new(&req, &mut wire, &mut buf);
        let piece = reader.next_piece().await.unwrap();

        assert_eq!(piece.as_deref(), Some(&b"abcd"[..]));
        assert_eq!(reader.framing, Framing::ChunkData(12));
    }

    #[tokio::test]
    async fn unterminated_size_line_is_malformed() {
        let req = post(&[("Transfer-Encoding", "chunked")]);
        let line = vec![b'1'; MAX_LINE + 1];
        let mut wire: &[u8] = &line;
        let mut buf = BytesMut::new();

        let err = BodyReader::new(&req, &mut wire, &mut buf)
            .drain()
            .await
            .unwrap_err();

        assert!(matches!(err, BodyError::MalformedChunk));
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        let req = post(&[("Content-Length", "10")]);
        let mut wire: &[u8] = b"short";
        let mut buf = BytesMut::new();

        let err = BodyReader::new(&req, &mut wire, &mut buf)
            .collect(1024)
            .await
            .unwrap_err();

        assert!(matches!(err, BodyError::UnexpectedEof));
    }

    #[tokio::test]
    async fn drain_leaves_next_request_in_place() {
        let req = post(&[("Content-Length", "4")]);
        let mut wire: &[u8] = b"";
        let mut buf = BytesMut::from(&b"dataGET /next HTTP/1.1\r\n\r\n"[..]);

        BodyReader::new(&req, &mut wire, &mut buf)
            .drain()
            .await
            .unwrap();

        assert!(buf.starts_with(b"GET /next"));
    }
}

//! Connection classifier.
//!
//! Reads until at least [`PEEK_LEN`] bytes are buffered, compares them with
//! the HTTP method prefixes and returns the connection wrapped in a
//! [`PrefixedStream`] that replays everything buffered so far.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

use crate::server::stream::PrefixedStream;

pub const PEEK_LEN: usize = 4;

/// First four bytes that mark a connection as HTTP.
pub const HTTP_PREFIXES: [&[u8; PEEK_LEN]; 5] = [b"GET ", b"POST", b"HEAD", b"PUT ", b"DEL "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Raw,
}

/// Decides the protocol from the first bytes of a connection.
///
/// Returns `None` while fewer than [`PEEK_LEN`] bytes are available.
pub fn sniff(prefix: &[u8]) -> Option<Protocol> {
    let head = prefix.get(..PEEK_LEN)?;
    if HTTP_PREFIXES.iter().any(|p| p.as_slice() == head) {
        Some(Protocol::Http)
    } else {
        Some(Protocol::Raw)
    }
}

#[derive(Debug)]
pub enum Classified<S> {
    Http(PrefixedStream<S>),
    Raw(PrefixedStream<S>),
    /// Peer closed before sending enough bytes.
    Closed { received: usize },
    /// Nothing classifiable arrived within the timeout.
    TimedOut { received: usize },
}

/// Buffers the start of `stream` and classifies it.
///
/// Transport errors are returned to the caller; short connections and
/// timeouts are not errors.
pub async fn classify<S>(mut stream: S, limit: Duration) -> io::Result<Classified<S>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(1024);
    let deadline = Instant::now() + limit;

    let protocol = loop {
        if let Some(protocol) = sniff(&buffer) {
            break protocol;
        }

        match timeout_at(deadline, stream.read_buf(&mut buffer)).await {
            Ok(Ok(0)) => {
                return Ok(Classified::Closed {
                    received: buffer.len(),
                });
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Ok(Classified::TimedOut {
                    received: buffer.len(),
                });
            }
        }
    };

    let replay = PrefixedStream::new(buffer.freeze(), stream);
    Ok(match protocol {
        Protocol::Http => Classified::Http(replay),
        Protocol::Raw => Classified::Raw(replay),
    })
}

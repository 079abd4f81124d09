//! Event bus for the two server events.
//!
//! `socket` fires with every connection the classifier decided is not HTTP;
//! `error` fires with transport, protocol and handler failures. Listeners
//! run synchronously in registration order. A panicking listener is caught
//! and logged, and the remaining listeners still run.

use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::net::TcpStream;

use crate::error::ServerError;
use crate::server::stream::PrefixedStream;

/// A raw connection with its sniffed bytes pushed back in front.
pub type RawConnection = PrefixedStream<TcpStream>;

pub type SocketListener = Box<dyn Fn(&mut SocketHandoff) + Send + Sync>;
pub type ErrorListener = Box<dyn Fn(&ServerError) + Send + Sync>;

/// Payload of the `socket` event.
///
/// Only one listener can own the connection: the first to call
/// [`SocketHandoff::take`] gets it, later listeners see `None`. A connection
/// nobody takes is closed once emission finishes.
pub struct SocketHandoff {
    peer: SocketAddr,
    stream: Option<RawConnection>,
}

impl SocketHandoff {
    pub fn new(peer: SocketAddr, stream: RawConnection) -> Self {
        Self {
            peer,
            stream: Some(stream),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The bytes already received, if the connection has not been taken.
    pub fn preview(&self) -> Option<&[u8]> {
        self.stream.as_ref().map(|s| s.unread())
    }

    pub fn is_taken(&self) -> bool {
        self.stream.is_none()
    }

    pub fn take(&mut self) -> Option<RawConnection> {
        self.stream.take()
    }
}

/// Typed listener registration, one variant per event.
pub enum Listener {
    Socket(SocketListener),
    Error(ErrorListener),
}

impl Listener {
    pub fn socket<F>(f: F) -> Self
    where
        F: Fn(&mut SocketHandoff) + Send + Sync + 'static,
    {
        Listener::Socket(Box::new(f))
    }

    pub fn error<F>(f: F) -> Self
    where
        F: Fn(&ServerError) + Send + Sync + 'static,
    {
        Listener::Error(Box::new(f))
    }
}

#[derive(Default)]
pub struct EventBus {
    socket: Vec<SocketListener>,
    error: Vec<ErrorListener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, listener: Listener) {
        match listener {
            Listener::Socket(f) => self.socket.push(f),
            Listener::Error(f) => self.error.push(f),
        }
    }

    pub fn socket_listeners(&self) -> usize {
        self.socket.len()
    }

    pub fn error_listeners(&self) -> usize {
        self.error.len()
    }

    pub fn emit_socket(&self, mut handoff: SocketHandoff) {
        let peer = handoff.peer();

        for (index, listener) in self.socket.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(&mut handoff))).is_err() {
                tracing::error!(peer = %peer, listener = index, "socket listener panicked");
            }
        }

        if !handoff.is_taken() {
            tracing::debug!(peer = %peer, "Raw connection not claimed by any listener, closing");
        }
    }

    pub fn emit_error(&self, err: &ServerError) {
        if self.error.is_empty() {
            tracing::error!(error = %err, "Unhandled server error");
            return;
        }

        for (index, listener) in self.error.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(err))).is_err() {
                tracing::error!(error = %err, listener = index, "error listener panicked");
            }
        }
    }
}

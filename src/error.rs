//! Error taxonomy shared by the server and the `error` event.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Port value that is not a non-negative integer within u16 range.
    #[error("invalid port {value:?}: {reason}")]
    InvalidPort { value: String, reason: &'static str },

    /// `publicize` was given a directory that does not exist.
    #[error("static root {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("transport error (peer {}): {source}", display_peer(.peer))]
    Transport {
        peer: Option<SocketAddr>,
        #[source]
        source: io::Error,
    },

    #[error("malformed request from {peer}: {reason}")]
    MalformedRequest { peer: SocketAddr, reason: String },

    /// A route handler failed, panicked, or never finalized its response.
    #[error("handler for {method} {path} failed: {message}")]
    Handler {
        method: String,
        path: String,
        message: String,
    },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ServerError {
    pub fn transport(peer: Option<SocketAddr>, source: io::Error) -> Self {
        Self::Transport { peer, source }
    }
}

fn display_peer(peer: &Option<SocketAddr>) -> String {
    peer.map(|p| p.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub type Result<T> = std::result::Result<T, ServerError>;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::http::connection::Connection;
use crate::server::Shared;
use crate::server::classifier::{Classified, classify};
use crate::server::events::SocketHandoff;

/// Pause after a failed `accept` so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub(crate) async fn run(listener: TcpListener, shared: Arc<Shared>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                shared.events.emit_error(&ServerError::transport(None, e));
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            handle(socket, peer, shared).await;
        });
    }
}

async fn handle(socket: TcpStream, peer: SocketAddr, shared: Arc<Shared>) {
    match classify(socket, shared.classify_timeout).await {
        Ok(Classified::Http(stream)) => {
            debug!(peer = %peer, "Classified as HTTP");
            let mut conn = Connection::new(stream, peer, Arc::clone(&shared));
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
                let source = match e.downcast::<io::Error>() {
                    Ok(io) => io,
                    Err(other) => io::Error::other(other.to_string()),
                };
                shared.events.emit_error(&ServerError::transport(Some(peer), source));
            }
        }
        Ok(Classified::Raw(stream)) => {
            debug!(peer = %peer, "Classified as raw socket");
            shared.events.emit_socket(SocketHandoff::new(peer, stream));
        }
        Ok(Classified::Closed { received }) => {
            debug!(peer = %peer, received, "Connection closed before classification");
        }
        Ok(Classified::TimedOut { received }) => {
            debug!(peer = %peer, received, "Classification timed out, closing");
        }
        Err(e) => {
            shared.events.emit_error(&ServerError::transport(Some(peer), e));
        }
    }
}

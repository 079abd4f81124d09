use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::error::ServerError;
use crate::http::body::BodyReader;
use crate::http::parser::{ParseError, parse_request_head};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::Shared;

/// HTTP side of a classified connection.
///
/// The stream handed in still starts with the bytes the classifier read, so
/// the first request line is parsed from the wire exactly as sent.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
    shared: Arc<Shared>,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

enum ReadOutcome {
    Request(Request),
    Malformed(ParseError),
    Eof,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S, peer: SocketAddr, shared: Arc<Shared>) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            shared,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        ReadOutcome::Request(req) => ConnectionState::Processing(req),
                        ReadOutcome::Malformed(e) => {
                            self.shared.events.emit_error(&ServerError::MalformedRequest {
                                peer: self.peer,
                                reason: format!("{e:?}"),
                            });
                            let mut response = Response::bad_request()
                                .with_headers(self.shared.dispatcher.headers().iter());
                            mark_closing(&mut response);
                            ConnectionState::Writing(ResponseWriter::new(&response), false)
                        }
                        ReadOutcome::Eof => ConnectionState::Closed,
                    };
                }

                ConnectionState::Processing(req) => {
                    self.state = self.process(req).await;
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        loop {
            // Try parsing whatever we already have
            match parse_request_head(&self.buffer) {
                Ok((mut request, consumed)) => {
                    let _ = self.buffer.split_to(consumed);
                    request.peer = Some(self.peer);
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => return Ok(ReadOutcome::Malformed(e)),
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        peer = %self.peer,
                        pending = self.buffer.len(),
                        "Client closed mid-request"
                    );
                }
                return Ok(ReadOutcome::Eof);
            }
        }
    }

    async fn process(&mut self, req: Request) -> ConnectionState {
        let keep_alive = req.keep_alive();
        let head_only = req.method == Method::HEAD;
        let method = req.method.clone();
        let path = req.path.clone();

        let mut body = BodyReader::new(&req, &mut self.stream, &mut self.buffer);
        let dispatched = self
            .shared
            .dispatcher
            .dispatch(req, &mut body, &self.shared.events)
            .await;

        let mut keep_alive = keep_alive && !dispatched.close;
        if keep_alive && !body.is_finished() && body.drain().await.is_err() {
            keep_alive = false;
        }

        tracing::info!(
            peer = %self.peer,
            method = %method,
            path = %path,
            status = dispatched.response.status.as_u16(),
            "Request served"
        );

        let mut response = dispatched.response;
        if !keep_alive {
            mark_closing(&mut response);
        }

        let writer = if head_only {
            ResponseWriter::head_only(&response)
        } else {
            ResponseWriter::new(&response)
        };
        ConnectionState::Writing(writer, keep_alive)
    }
}

fn mark_closing(response: &mut Response) {
    response.set_header("Connection", "close");
}

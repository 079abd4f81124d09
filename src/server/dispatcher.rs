//! Request dispatch.
//!
//! Resolution order, first match wins:
//!
//! 1. GET table, whatever the request method.
//! 2. POST table, for POST requests; the body is accumulated first.
//! 3. The static root, if one is configured.
//! 4. The 404 page.
//!
//! Every branch ends in exactly one finalized [`Response`].

use tokio::io::AsyncRead;
use tokio::sync::oneshot;

use crate::error::ServerError;
use crate::http::body::{BodyError, BodyReader};
use crate::http::request::{Method, Request};
use crate::http::responder::{HeaderSet, Responder};
use crate::http::response::Response;
use crate::server::events::EventBus;
use crate::server::router::{Handler, Router};
use crate::server::statics::{StaticLookup, StaticRoot};

/// A finalized exchange, ready for the connection to write.
#[derive(Debug)]
pub struct Dispatched {
    pub response: Response,
    /// The connection can no longer be trusted to be at a request boundary.
    pub close: bool,
}

impl Dispatched {
    fn keep(response: Response) -> Self {
        Self {
            response,
            close: false,
        }
    }

    fn closing(response: Response) -> Self {
        Self {
            response,
            close: true,
        }
    }
}

pub struct Dispatcher {
    router: Router,
    statics: Option<StaticRoot>,
    headers: HeaderSet,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(
        router: Router,
        statics: Option<StaticRoot>,
        headers: HeaderSet,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            router,
            statics,
            headers,
            max_body_bytes,
        }
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub async fn dispatch<S>(
        &self,
        mut request: Request,
        body: &mut BodyReader<'_, S>,
        events: &EventBus,
    ) -> Dispatched
    where
        S: AsyncRead + Unpin,
    {
        let (mut responder, rx) = Responder::channel(self.headers.clone());

        if let Some(handler) = self.router.get.lookup(&request.path) {
            tracing::debug!(method = %request.method, path = %request.path, "GET route matched");
            return Dispatched::keep(self.run_handler(handler, request, responder, rx, events).await);
        }

        if request.method == Method::POST {
            if let Some(handler) = self.router.post.lookup(&request.path) {
                tracing::debug!(path = %request.path, "POST route matched");
                match body.collect(self.max_body_bytes).await {
                    Ok(bytes) => request.body = bytes,
                    Err(BodyError::TooLarge { limit }) => {
                        events.emit_error(&ServerError::PayloadTooLarge { limit });
                        return Dispatched::closing(self.decorate(Response::payload_too_large()));
                    }
                    Err(e) => {
                        events.emit_error(&body_failure(&request, e));
                        return Dispatched::closing(self.decorate(Response::bad_request()));
                    }
                }
                return Dispatched::keep(self.run_handler(handler, request, responder, rx, events).await);
            }
        }

        if let Some(root) = &self.statics {
            match root.resolve(&request.path).await {
                StaticLookup::File {
                    bytes,
                    content_type,
                } => {
                    tracing::debug!(path = %request.path, content_type, "Serving static file");
                    responder.header("Content-Type", content_type);
                    responder.send(bytes);
                    return Dispatched::keep(self.settle(rx, &request, events).await);
                }
                StaticLookup::Directory => {
                    tracing::debug!(path = %request.path, "Static path is a directory");
                    responder.not_found();
                    return Dispatched::keep(self.settle(rx, &request, events).await);
                }
                StaticLookup::NotFound => {}
            }
        }

        tracing::debug!(method = %request.method, path = %request.path, "No route matched");
        responder.not_found();
        Dispatched::keep(self.settle(rx, &request, events).await)
    }

    /// Runs a handler on its own task so a panic stays contained, then
    /// waits for its finalized response.
    async fn run_handler(
        &self,
        handler: Handler,
        request: Request,
        responder: Responder,
        rx: oneshot::Receiver<Response>,
        events: &EventBus,
    ) -> Response {
        let method = request.method.to_string();
        let path = request.path.clone();
        let peer = request.peer;

        let failure = match tokio::spawn(handler(request, responder)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(join) if join.is_panic() => Some("handler panicked".to_string()),
            Err(_) => Some("handler task was cancelled".to_string()),
        };

        if let Some(message) = &failure {
            tracing::warn!(method = %method, path = %path, error = %message, "Handler failed");
            events.emit_error(&ServerError::Handler {
                method: method.clone(),
                path: path.clone(),
                message: message.clone(),
            });
        }

        match rx.await {
            Ok(response) => response,
            Err(_) => {
                if failure.is_none() {
                    events.emit_error(&ServerError::Handler {
                        method,
                        path,
                        message: "response was never finalized".to_string(),
                    });
                }
                tracing::debug!(peer = ?peer, "Answering with 500 for an unfinalized response");
                self.decorate(Response::internal_error())
            }
        }
    }

    async fn settle(
        &self,
        rx: oneshot::Receiver<Response>,
        request: &Request,
        events: &EventBus,
    ) -> Response {
        match rx.await {
            Ok(response) => response,
            Err(_) => {
                events.emit_error(&ServerError::Handler {
                    method: request.method.to_string(),
                    path: request.path.clone(),
                    message: "response was never finalized".to_string(),
                });
                self.decorate(Response::internal_error())
            }
        }
    }

    fn decorate(&self, response: Response) -> Response {
        response.with_headers(self.headers.iter())
    }
}

fn body_failure(request: &Request, err: BodyError) -> ServerError {
    match err {
        BodyError::Io(source) => ServerError::transport(request.peer, source),
        other => ServerError::transport(
            request.peer,
            std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        ),
    }
}

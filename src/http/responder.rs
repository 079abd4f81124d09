//! Response finalization.
//!
//! Handlers never touch the socket. They get a [`Responder`], and calling
//! [`Responder::send`] or [`Responder::json`] consumes it, builds the
//! response with the server's standard headers and hands it back to the
//! connection that owns the stream. A responder can therefore finalize at
//! most once; the dispatcher covers the "dropped without finalizing" case.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::ServerError;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Headers applied to every response the server writes.
pub type HeaderSet = Arc<[(String, String)]>;

/// CORS headers for the given `Access-Control-Allow-Origin` value.
pub fn standard_headers(origin: &str) -> HeaderSet {
    vec![
        (
            "Access-Control-Allow-Origin".to_string(),
            origin.to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            "OPTIONS, POST, GET".to_string(),
        ),
        ("Access-Control-Max-Age".to_string(), "2592000".to_string()),
    ]
    .into()
}

pub struct Responder {
    headers: HeaderSet,
    extra: Vec<(String, String)>,
    tx: oneshot::Sender<Response>,
}

impl Responder {
    /// Creates a responder and the receiving end the connection waits on.
    pub fn channel(headers: HeaderSet) -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            headers,
            extra: Vec::new(),
            tx,
        };
        (responder, rx)
    }

    /// Sets an extra header on the pending response.
    pub fn header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.extra.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.extra.push((key, value.into()));
        self
    }

    /// Ends the exchange with status 200 and `content` as the body.
    pub fn send(self, content: impl Into<Vec<u8>>) {
        self.finalize(StatusCode::Ok, content.into());
    }

    /// Serializes `value` and sends it.
    ///
    /// A value that serializes to a bare JSON string is sent verbatim, the
    /// same as `send`; anything else gets `Content-Type: application/json`.
    pub fn json<T>(mut self, value: &T) -> Result<(), ServerError>
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(value)? {
            serde_json::Value::String(text) => self.send(text),
            other => {
                self.header("Content-Type", "application/json");
                self.send(serde_json::to_vec(&other)?);
            }
        }
        Ok(())
    }

    /// Ends the exchange with the fixed 404 page.
    pub(crate) fn not_found(self) {
        let Responder { headers, tx, .. } = self;
        deliver(tx, Response::not_found().with_headers(headers.iter()));
    }

    fn finalize(self, status: StatusCode, body: Vec<u8>) {
        let response = ResponseBuilder::new(status)
            .headers(self.headers.iter())
            .headers(self.extra.iter())
            .body(body)
            .build();
        deliver(self.tx, response);
    }
}

fn deliver(tx: oneshot::Sender<Response>, response: Response) {
    if tx.send(response).is_err() {
        tracing::debug!("Response finalized after the exchange was abandoned");
    }
}

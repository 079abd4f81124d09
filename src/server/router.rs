use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::{Request, normalize_path};
use crate::http::responder::Responder;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A route handler. It receives the request and the responder it must
/// finalize.
pub type Handler = Arc<dyn Fn(Request, Responder) -> HandlerFuture + Send + Sync>;

/// Boxes an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |req: Request, res: Responder| Box::pin(f(req, res)) as HandlerFuture)
}

/// Exact-path route table. Keys are stored normalized, so `/foo/` and
/// `/foo` name the same route.
#[derive(Default, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Handler>,
}

impl RouteTable {
    /// Registers `handler` for `path`. Returns true when an earlier handler
    /// for the same path was replaced.
    pub fn insert(&mut self, path: &str, handler: Handler) -> bool {
        self.routes.insert(normalize_path(path), handler).is_some()
    }

    /// Looks up an already-normalized path.
    pub fn lookup(&self, path: &str) -> Option<Handler> {
        self.routes.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

/// The GET and POST tables.
#[derive(Default, Clone)]
pub struct Router {
    pub get: RouteTable,
    pub post: RouteTable,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }
}

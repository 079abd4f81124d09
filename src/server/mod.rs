//! The single-port server.
//!
//! ```text
//!   accept ──▶ classifier ──┬─ "GET " "POST" "HEAD" "PUT " "DEL " ──▶ HTTP connection ──▶ dispatcher
//!                           └─ anything else ──────────────────────▶ `socket` listeners
//! ```
//!
//! Routes, the static root and listeners are configured on [`Server`] before
//! it is bound; binding freezes them into shared, read-only state.
//!
//! # Example
//!
//! ```no_run
//! use polyport::Server;
//!
//! # async fn demo() -> polyport::Result<()> {
//! let mut server = Server::new(8080)?;
//! server
//!     .get("/hello", |_req, res| async move {
//!         res.send("hello");
//!         Ok(())
//!     })
//!     .on_socket(|conn| {
//!         if let Some(stream) = conn.take() {
//!             drop(stream);
//!         }
//!     });
//! server.start(|addr| println!("listening on {addr}")).await
//! # }
//! ```

pub mod classifier;
pub mod dispatcher;
pub mod events;
pub mod listener;
pub mod router;
pub mod statics;
pub mod stream;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::{Config, DEFAULT_CLASSIFY_TIMEOUT_MS, DEFAULT_MAX_BODY_BYTES, Port};
use crate::error::{Result, ServerError};
use crate::http::request::Request;
use crate::http::responder::{Responder, standard_headers};
use crate::server::dispatcher::Dispatcher;
use crate::server::events::{EventBus, Listener, SocketHandoff};
use crate::server::router::{Router, handler};
use crate::server::statics::StaticRoot;

pub use events::RawConnection;

/// State shared by every connection once the server is bound.
pub(crate) struct Shared {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) events: EventBus,
    pub(crate) classify_timeout: Duration,
}

pub struct Server {
    port: Port,
    host: IpAddr,
    origin: String,
    router: Router,
    statics: Option<StaticRoot>,
    events: EventBus,
    classify_timeout: Duration,
    max_body_bytes: usize,
}

impl Server {
    /// Creates a server for `port` with `Access-Control-Allow-Origin: *`.
    pub fn new<P>(port: P) -> Result<Self>
    where
        P: TryInto<Port, Error = ServerError>,
    {
        Self::with_origin(port, "*")
    }

    pub fn with_origin<P>(port: P, origin: impl Into<String>) -> Result<Self>
    where
        P: TryInto<Port, Error = ServerError>,
    {
        Ok(Self {
            port: port.try_into()?,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            origin: origin.into(),
            router: Router::new(),
            statics: None,
            events: EventBus::new(),
            classify_timeout: Duration::from_millis(DEFAULT_CLASSIFY_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut server = Self::with_origin(cfg.port, cfg.origin.clone())?;
        server
            .classify_timeout(cfg.classify_timeout())
            .max_body_bytes(cfg.max_body_bytes);
        if let Some(dir) = &cfg.public_dir {
            server.publicize(dir)?;
        }
        Ok(server)
    }

    pub fn port(&self) -> u16 {
        self.port.get()
    }

    /// Interface to bind; all interfaces by default.
    pub fn host(&mut self, host: IpAddr) -> &mut Self {
        self.host = host;
        self
    }

    /// How long a new connection may take to send its first four bytes.
    pub fn classify_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.classify_timeout = timeout;
        self
    }

    pub fn max_body_bytes(&mut self, limit: usize) -> &mut Self {
        self.max_body_bytes = limit;
        self
    }

    /// Registers a GET route. GET routes answer every method.
    pub fn get<F, Fut>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.router.get.insert(path, handler(f)) {
            tracing::debug!(path, "Replaced GET route");
        }
        self
    }

    /// Registers a POST route. The handler sees the full body in
    /// `Request::body`.
    pub fn post<F, Fut>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.router.post.insert(path, handler(f)) {
            tracing::debug!(path, "Replaced POST route");
        }
        self
    }

    /// Serves files from `root` when no route matches.
    ///
    /// Fails, leaving the server unchanged, if `root` is not an existing
    /// directory.
    pub fn publicize(&mut self, root: impl AsRef<Path>) -> Result<&mut Self> {
        let root = StaticRoot::new(root)?;
        tracing::info!(root = %root.path().display(), "Serving static files");
        self.statics = Some(root);
        Ok(self)
    }

    pub fn static_root(&self) -> Option<&Path> {
        self.statics.as_ref().map(StaticRoot::path)
    }

    pub fn on(&mut self, listener: Listener) -> &mut Self {
        self.events.on(listener);
        self
    }

    pub fn on_socket<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut SocketHandoff) + Send + Sync + 'static,
    {
        self.on(Listener::socket(f))
    }

    pub fn on_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&ServerError) + Send + Sync + 'static,
    {
        self.on(Listener::error(f))
    }

    /// Opens the listening socket. Routes and listeners are frozen here.
    pub async fn bind(self) -> Result<BoundServer> {
        let addr = SocketAddr::new(self.host, self.port.get());
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::transport(None, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::transport(None, e))?;

        tracing::info!("Listening on {}", local_addr);

        let shared = Shared {
            dispatcher: Dispatcher::new(
                self.router,
                self.statics,
                standard_headers(&self.origin),
                self.max_body_bytes,
            ),
            events: self.events,
            classify_timeout: self.classify_timeout,
        };

        Ok(BoundServer {
            listener,
            local_addr,
            shared: Arc::new(shared),
        })
    }

    /// Binds, calls `on_ready` with the bound address, then serves forever.
    pub async fn start<F>(self, on_ready: F) -> Result<()>
    where
        F: FnOnce(SocketAddr),
    {
        let bound = self.bind().await?;
        on_ready(bound.local_addr());
        bound.serve().await
    }
}

/// A server whose socket is open but not yet accepting.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the task is dropped.
    pub async fn serve(self) -> Result<()> {
        listener::run(self.listener, self.shared)
            .await
            .map_err(|e| ServerError::transport(None, std::io::Error::other(e.to_string())))
    }
}

//! Polyport - single-port HTTP and raw socket server
//!
//! Sniffs the first bytes of every accepted connection and either serves it
//! as HTTP (exact-path routes, then a static root, then a 404 page) or hands
//! the untouched stream to the application's `socket` listeners.

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;

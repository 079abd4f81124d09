//! HTTP protocol implementation.
//!
//! Everything the server needs to speak HTTP/1.1 on a connection the
//! classifier has already identified.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection request/response state machine
//! - **`parser`**: parses the request line and headers from a byte buffer
//! - **`body`**: reads `Content-Length` and chunked bodies off the wire on demand
//! - **`request`**: HTTP request representation and path normalization
//! - **`response`**: HTTP response representation with builder pattern
//! - **`responder`**: the finalizer handed to route handlers (`send`, `json`)
//! - **`writer`**: serializes and writes HTTP responses to the client
//! - **`mime`**: content type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request head
//!        └──────┬──────┘
//!               │ Head parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Dispatch; POST routes pull the body here
//!        └──────┬───────────┘
//!               │ Response finalized
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod body;
pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod responder;
pub mod response;
pub mod writer;

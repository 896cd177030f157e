//! # Server Module
//!
//! The embeddable HTTP(S) server: lifecycle, built-in transport, and the
//! adapters between the wire and the dispatcher's model.
//!
//! ## Architecture
//!
//! ```text
//! Connection → conn (HTTP/1.1 read) → request (adapt) → Dispatcher
//!                                                           │
//! Connection ← response (write)  ←  DispatchResponse  ──────┘
//! ```
//!
//! [`HttpServer`] owns the state machine (configured → running → stopped),
//! the endpoint registry and the TLS materials. Starting binds the port and
//! spawns a listener coroutine; every accepted connection runs on its own
//! coroutine, reads one request, dispatches it and writes the response.

pub(crate) mod conn;
/// Server lifecycle and public API.
pub mod http_server;
pub(crate) mod request;
pub(crate) mod response;
/// TLS material types and parsing.
pub mod tls;

pub use http_server::HttpServer;
pub use tls::{SslEncoding, SslKeyAlgorithm};

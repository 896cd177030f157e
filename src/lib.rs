//! Embeddable HTTP(S) server with template-based endpoint routing.
//!
//! Endpoints are path templates whose segments are literals, single-level
//! path variables (`{name}`) or one terminal multi-level wildcard (`#`).
//! Every matched request is handed to a single injected callback together
//! with the matched template, the full URL, and the extracted path data.
//!
//! ```rust,no_run
//! use portico::{HttpMethod, HttpResponse, HttpServer};
//!
//! let server = HttpServer::new(|endpoint, _url, path, _request| {
//!     HttpResponse::new(200)
//!         .with_body(format!("{} -> {:?}", endpoint, path.variables))
//! });
//! server.add_endpoint("/users/{id}", HttpMethod::GET).unwrap();
//! server.add_endpoint("/files/#", HttpMethod::ALL).unwrap();
//! server.start().unwrap();
//! // ... serve ...
//! server.stop();
//! ```

pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod method;
pub mod router;
pub mod server;

pub use dispatcher::{HttpRequest, HttpResponse, PathInfo, ProtocolVersion};
pub use endpoint::EndpointRegistry;
pub use error::{ErrorKind, ServerError};
pub use event::{Event, EventMsg, EventSink, Severity, TracingSink};
pub use method::HttpMethod;
pub use router::UrlMatch;
pub use server::{HttpServer, SslEncoding, SslKeyAlgorithm};

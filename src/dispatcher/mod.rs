//! # Dispatcher Module
//!
//! Request dispatch for the server.
//!
//! For every incoming request the dispatcher matches all registered
//! templates against the path, keeps the most specific match per method,
//! picks the request method's bucket (falling back to `ALL`), invokes the
//! user callback and filters the returned response: status codes outside
//! the standardized set and reserved headers become 500, HEAD responses
//! lose their body.
//!
//! Requests that matched no template at all produce 404; requests whose
//! path matched only under other methods produce 405.

pub mod core;

pub use core::{
    DispatchRequest, DispatchResponse, Dispatcher, HttpRequest, HttpResponse, OnRequest, PathInfo,
    ProtocolVersion,
};

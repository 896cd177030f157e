//! Translation from the dispatcher's response to the wire.

use std::io::{self, Write};

use super::conn::HttpStream;
use crate::dispatcher::DispatchResponse;

/// Server header advertised on every response.
const SERVER_TOKEN: &str = concat!("portico/", env!("CARGO_PKG_VERSION"));

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        410 => "Gone",
        415 => "Unsupported Media Type",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write `response` and flush. The writer owns the reserved headers it
/// emits itself: `Server`, `Connection` and `Content-Length`.
pub(crate) fn write_response(
    stream: &mut HttpStream,
    response: &DispatchResponse,
) -> io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nServer: {}\r\nConnection: close\r\nContent-Length: {}\r\n",
        response.status,
        status_reason(response.status),
        SERVER_TOKEN,
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

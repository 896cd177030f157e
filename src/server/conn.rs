//! Built-in HTTP/1.1 connection handling.
//!
//! One request per connection; every response closes the stream. The stream
//! is plain TCP or TLS depending on server configuration; both variants read
//! and write through the same enum so the parser and writer stay oblivious.

use std::io::{self, BufRead, BufReader, Read, Write};

use may::net::TcpStream;
use rustls::{ServerConnection, StreamOwned};

/// Hard cap on the number of request headers.
const MAX_HEADERS: usize = 100;
/// Hard cap on the total header section size in bytes.
const MAX_HEADER_BYTES: usize = 8192;

/// A connection stream that may be plain TCP or TLS-wrapped. The TLS
/// handshake happens lazily on the first read inside the connection worker.
pub(crate) enum HttpStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl Read for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(stream) => stream.read(buf),
            HttpStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for HttpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(stream) => stream.write(buf),
            HttpStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            HttpStream::Plain(stream) => stream.flush(),
            HttpStream::Tls(stream) => stream.flush(),
        }
    }
}

/// Request as read off the wire. Header names keep their original case and
/// order; the body is an opaque byte buffer.
#[derive(Debug, PartialEq)]
pub(crate) struct WireRequest {
    pub method: String,
    /// Path plus optional query component, still percent-encoded.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Read one HTTP/1.1 request off the stream. `Ok(None)` means the peer
/// closed the connection before sending anything.
pub(crate) fn read_request(stream: &mut HttpStream) -> io::Result<Option<WireRequest>> {
    read_from(&mut BufReader::new(stream))
}

fn invalid(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn read_from<R: Read>(reader: &mut BufReader<R>) -> io::Result<Option<WireRequest>> {
    let mut header_bytes = 0usize;

    let mut request_line = String::new();
    if reader.read_line(&mut request_line)? == 0 {
        return Ok(None);
    }
    header_bytes += request_line.len();

    let mut parts = request_line.trim_end().splitn(3, ' ');
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();
    let version = parts.next().unwrap_or("");
    if method.is_empty() || target.is_empty() || !version.starts_with("HTTP/") {
        return Err(invalid("malformed request line"));
    }

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(invalid("connection closed inside headers"));
        }
        header_bytes += line.len();
        if header_bytes > MAX_HEADER_BYTES {
            return Err(invalid("header section too large"));
        }

        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(invalid("too many headers"));
        }
        match trimmed.split_once(':') {
            Some((name, value)) => {
                let name = name.trim().to_string();
                let value = value.trim().to_string();
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.parse().map_err(|_| invalid("bad content length"))?;
                }
                headers.push((name, value));
            }
            None => return Err(invalid("malformed header")),
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }

    Ok(Some(WireRequest {
        method,
        target,
        headers,
        body,
    }))
}

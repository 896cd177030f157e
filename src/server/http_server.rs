//! Server lifecycle: configuration, start/stop, the listener worker.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use may::coroutine::{self, JoinHandle};
use may::net::{TcpListener, TcpStream};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use tracing::{debug, error, info, warn};

use super::conn::{self, HttpStream};
use super::request;
use super::response;
use super::tls::{self, SslEncoding, SslKeyAlgorithm, TlsMaterials};
use crate::dispatcher::{DispatchResponse, Dispatcher, HttpRequest, HttpResponse, PathInfo};
use crate::endpoint::EndpointRegistry;
use crate::error::{ErrorKind, ServerError};
use crate::event::{Event, EventMsg, EventSink, Severity, TracingSink};
use crate::loc;
use crate::method::HttpMethod;

const COMPONENT: &str = "HttpServer";

static MSG_INVALID_ADDRESS: EventMsg = EventMsg::new(&[
    ("en-US", "The address '%1' is not a valid server address."),
    ("de-DE", "Die Adresse '%1' ist keine gültige Server-Adresse."),
]);

static MSG_INVALID_PORT: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "'%1' is not a valid port number. Port numbers have to between 0 and 65535.",
    ),
    (
        "de-DE",
        "'%1' ist keine gültige Portnummer. Der Wert muss zwischen 0 und 65535 liegen.",
    ),
]);

static MSG_FAILED_TO_START: EventMsg = EventMsg::new(&[
    ("en-US", "Couldn't start http server: \"%1\"."),
    ("de-DE", "Http-Server konnte nicht gestartet werden: \"%1\"."),
]);

static MSG_MISSING_CERTIFICATE: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "HTTP server '%1' has a private key set but is missing a server SSL certificiate.",
    ),
    (
        "de-DE",
        "HTTP-Server '%1' hat einen privaten Schlüssel gesetzt aber es fehlt ein Server SSL-Zertifikat.",
    ),
]);

static MSG_MISSING_PRIVATE_KEY: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "HTTP server '%1' has a server SSL certificate set but is missing a private key.",
    ),
    (
        "de-DE",
        "HTTP-Server '%1' hat ein Server SSL-Zertifikat gesetzt aber es fehlt ein privater Schlüssel.",
    ),
]);

fn invalid_address(address: &str) -> ServerError {
    ServerError::new(
        ErrorKind::InvalidAddress,
        Event::new(COMPONENT, "InvalidAddress", Severity::Error, MSG_INVALID_ADDRESS)
            .arg(address)
            .at(loc!()),
    )
}

fn invalid_port(port: i32) -> ServerError {
    ServerError::new(
        ErrorKind::InvalidPort,
        Event::new(COMPONENT, "InvalidPort", Severity::Error, MSG_INVALID_PORT)
            .arg(port)
            .at(loc!()),
    )
}

fn failed_to_start(detail: impl fmt::Display) -> ServerError {
    ServerError::new(
        ErrorKind::FailedToStart,
        Event::new(COMPONENT, "FailedToStart", Severity::Error, MSG_FAILED_TO_START)
            .arg(detail)
            .at(loc!()),
    )
}

fn missing_certificate(addr: SocketAddr) -> ServerError {
    ServerError::new(
        ErrorKind::MissingCertificate,
        Event::new(COMPONENT, "MissingCertificate", Severity::Error, MSG_MISSING_CERTIFICATE)
            .arg(format!("https://{addr}"))
            .at(loc!()),
    )
}

fn missing_private_key(addr: SocketAddr) -> ServerError {
    ServerError::new(
        ErrorKind::MissingPrivateKey,
        Event::new(COMPONENT, "MissingPrivateKey", Severity::Error, MSG_MISSING_PRIVATE_KEY)
            .arg(format!("https://{addr}"))
            .at(loc!()),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Configured,
    Running,
    Stopped,
}

struct Inner {
    phase: Phase,
    address: IpAddr,
    port: u16,
    registry: EndpointRegistry,
    tls: TlsMaterials,
    server_name: String,
    listener: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<Inner>,
    running: AtomicBool,
    dispatcher: Dispatcher,
}

/// Worker stack size: 64 KiB unless overridden via `PORTICO_STACK_SIZE`
/// (decimal, or hex with a `0x` prefix).
fn worker_stack_size() -> usize {
    std::env::var("PORTICO_STACK_SIZE")
        .ok()
        .and_then(|value| {
            if let Some(hex) = value.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).ok()
            } else {
                value.parse().ok()
            }
        })
        .unwrap_or(0x10000)
}

/// Embeddable HTTP(S) server.
///
/// Construction injects the request callback. Configuration (address, port,
/// endpoints, TLS materials) happens before [`HttpServer::start`]; requests
/// are dispatched while running; [`HttpServer::stop`] joins the listener and
/// is terminal for the instance.
///
/// ```rust,no_run
/// use portico::{HttpMethod, HttpResponse, HttpServer};
///
/// let server = HttpServer::new(|_endpoint, _url, path, _request| {
///     HttpResponse::new(200).with_body(format!("hello {:?}", path.variables.get("id")))
/// });
/// server.add_endpoint("/users/{id}", HttpMethod::GET).unwrap();
/// server.start().unwrap();
/// // ... serve ...
/// server.stop();
/// ```
pub struct HttpServer {
    shared: Arc<Shared>,
}

impl HttpServer {
    /// Create a server that answers every dispatched request with
    /// `callback`. Events are reported through the default tracing sink.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, &str, &PathInfo, &HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        Self::with_reporter(callback, Arc::new(TracingSink))
    }

    /// Create a server with an explicit event sink for request-time
    /// diagnostics.
    pub fn with_reporter<F>(callback: F, reporter: Arc<dyn EventSink>) -> Self
    where
        F: Fn(&str, &str, &PathInfo, &HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    phase: Phase::Configured,
                    address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                    port: 0,
                    registry: EndpointRegistry::new(),
                    tls: TlsMaterials::default(),
                    server_name: String::new(),
                    listener: None,
                }),
                running: AtomicBool::new(false),
                dispatcher: Dispatcher::new(Arc::new(callback), reporter),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configured listen address.
    pub fn address(&self) -> String {
        self.lock().address.to_string()
    }

    /// Set the listen address; IP addresses only.
    pub fn set_address(&self, address: &str) -> Result<(), ServerError> {
        let parsed: IpAddr = address.parse().map_err(|_| invalid_address(address))?;
        self.lock().address = parsed;
        Ok(())
    }

    /// The configured port; after a successful start this is the actually
    /// bound port.
    pub fn port(&self) -> u16 {
        self.lock().port
    }

    /// Set the listen port. `0` requests a kernel-assigned port at start.
    pub fn set_port(&self, port: i32) -> Result<(), ServerError> {
        if !(0..=65535).contains(&port) {
            return Err(invalid_port(port));
        }
        self.lock().port = port as u16;
        Ok(())
    }

    /// Whether the server is configured for HTTPS. True as soon as either
    /// TLS half is set; start still demands both.
    pub fn is_https(&self) -> bool {
        self.lock().tls.configured()
    }

    /// `"http(s)://host:port"` once started; empty before.
    pub fn server_name(&self) -> String {
        self.lock().server_name.clone()
    }

    /// Whether the server is currently accepting requests.
    pub fn running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Register `endpoint` for `method`; [`HttpMethod::ALL`] routes every
    /// supported method. Permitted in every state; a registration while
    /// running is visible to requests dispatched afterwards.
    pub fn add_endpoint(&self, endpoint: &str, method: HttpMethod) -> Result<(), ServerError> {
        self.lock().registry.add(endpoint, method)
    }

    /// Remove the endpoint previously registered with exactly this template
    /// and method. Returns whether such a registration existed.
    pub fn remove_endpoint(&self, endpoint: &str, method: HttpMethod) -> bool {
        self.lock().registry.remove(endpoint, method)
    }

    /// Install the server certificate (chain). Returns `false` while the
    /// server is running or when the data does not parse.
    pub fn set_certificate(&self, data: &[u8], encoding: SslEncoding) -> bool {
        let mut inner = self.lock();
        if inner.phase == Phase::Running {
            return false;
        }
        match tls::parse_certificates(data, encoding) {
            Some(certificates) => {
                inner.tls.certificate = Some(certificates);
                true
            }
            None => false,
        }
    }

    /// Install the private key for the server certificate. Returns `false`
    /// while the server is running, when the data does not parse, or when
    /// the declared algorithm or a passphrase is unsupported by the TLS
    /// backend.
    pub fn set_private_key(
        &self,
        data: &[u8],
        encoding: SslEncoding,
        algorithm: SslKeyAlgorithm,
        passphrase: Option<&str>,
    ) -> bool {
        let mut inner = self.lock();
        if inner.phase == Phase::Running {
            return false;
        }
        match tls::parse_private_key(data, encoding, algorithm, passphrase) {
            Some(key) => {
                inner.tls.private_key = Some(key);
                true
            }
            None => false,
        }
    }

    /// Start the listener.
    ///
    /// Returns `Ok(false)` when the server is not in the configured state:
    /// already running, or stopped (stop is terminal for the instance).
    pub fn start(&self) -> Result<bool, ServerError> {
        let mut inner = self.lock();
        if inner.phase != Phase::Configured {
            return Ok(false);
        }

        let port = probe_port(inner.address, inner.port)?;
        let addr = SocketAddr::new(inner.address, port);

        let tls_config = match (&inner.tls.certificate, &inner.tls.private_key) {
            (None, None) => None,
            (Some(certificates), Some(key)) => Some(
                tls::build_server_config(certificates.clone(), key.clone_key())
                    .map_err(|e| failed_to_start(e))?,
            ),
            (Some(_), None) => return Err(missing_private_key(addr)),
            (None, Some(_)) => return Err(missing_certificate(addr)),
        };

        let listener = TcpListener::bind(addr).map_err(|e| failed_to_start(e))?;
        let scheme = if tls_config.is_some() { "https" } else { "http" };

        // The listener may accept before spawn returns; the flag has to be
        // up before the first connection checks it.
        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        // Safety: spawning a may coroutine; the worker only touches state
        // behind the shared Arc and is joined in stop().
        let handle = unsafe {
            coroutine::Builder::new()
                .stack_size(worker_stack_size())
                .spawn(move || accept_loop(shared, listener, tls_config))
        }
        .map_err(|e| {
            self.shared.running.store(false, Ordering::Release);
            failed_to_start(e)
        })?;

        inner.server_name = format!("{scheme}://{addr}");
        inner.port = port;
        inner.listener = Some(handle);
        inner.phase = Phase::Running;

        info!(address = %addr, scheme, "server started");
        Ok(true)
    }

    /// Stop the listener and join it. Requests already dispatched run to
    /// completion; connections not yet dispatched are refused with 503.
    /// Returns `false` when not running.
    pub fn stop(&self) -> bool {
        let handle = {
            let mut inner = self.lock();
            if inner.phase != Phase::Running {
                return false;
            }
            inner.phase = Phase::Stopped;
            self.shared.running.store(false, Ordering::Release);
            inner.listener.take()
        };

        if let Some(handle) = handle {
            // Safety: cancellation unwinds the listener at its blocking
            // accept; the worker holds no locks across that point.
            unsafe {
                handle.coroutine().cancel();
            }
            let _ = handle.join();
        }

        info!("server stopped");
        true
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Determine the port to bind: probe-bind, take the kernel-assigned port,
/// release the probe socket.
fn probe_port(address: IpAddr, port: u16) -> Result<u16, ServerError> {
    let probe = std::net::TcpListener::bind(SocketAddr::new(address, port))
        .map_err(|e| failed_to_start(e))?;
    let port = probe.local_addr().map_err(|e| failed_to_start(e))?.port();
    Ok(port)
}

fn accept_loop(shared: Arc<Shared>, listener: TcpListener, tls_config: Option<Arc<ServerConfig>>) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(peer = %peer, "connection accepted");
                let shared = Arc::clone(&shared);
                let tls_config = tls_config.clone();
                // Safety: see start(); connection workers are detached and
                // run to completion on their own.
                let spawned = unsafe {
                    coroutine::Builder::new()
                        .stack_size(worker_stack_size())
                        .spawn(move || handle_connection(shared, stream, tls_config))
                };
                if let Err(e) = spawned {
                    error!(error = %e, "failed to spawn connection worker");
                }
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                coroutine::sleep(Duration::from_millis(100));
            }
        }
    }
}

fn handle_connection(shared: Arc<Shared>, stream: TcpStream, tls_config: Option<Arc<ServerConfig>>) {
    let mut stream = match tls_config {
        Some(config) => match ServerConnection::new(config) {
            Ok(session) => HttpStream::Tls(Box::new(StreamOwned::new(session, stream))),
            Err(e) => {
                error!(error = %e, "TLS session setup failed");
                return;
            }
        },
        None => HttpStream::Plain(stream),
    };

    let request = match conn::read_request(&mut stream) {
        Ok(Some(request)) => request,
        Ok(None) => return,
        Err(e) => {
            debug!(error = %e, "malformed request");
            let _ = response::write_response(&mut stream, &DispatchResponse::status_only(400));
            return;
        }
    };

    // No new dispatches once stop() has flipped the flag.
    if !shared.running.load(Ordering::Acquire) {
        let _ = response::write_response(&mut stream, &DispatchResponse::status_only(503));
        return;
    }

    let dispatch_request = request::adapt(request);
    // Only the seven single wire methods are forwarded; anything else is
    // answered here and never reaches the dispatcher.
    if dispatch_request.method == HttpMethod::UNKNOWN
        || dispatch_request.method == HttpMethod::ALL
    {
        let _ = response::write_response(&mut stream, &DispatchResponse::status_only(405));
        return;
    }

    let (registry, server_name) = {
        let inner = shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (inner.registry.clone(), inner.server_name.clone())
    };

    let dispatch_response = shared
        .dispatcher
        .dispatch(&registry, &server_name, &dispatch_request);
    if let Err(e) = response::write_response(&mut stream, &dispatch_response) {
        debug!(error = %e, "failed to write response");
    }
}

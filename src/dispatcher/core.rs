//! Request dispatch: endpoint selection, callback invocation, response
//! filtering.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info};

use crate::endpoint::EndpointRegistry;
use crate::event::{Event, EventMsg, EventSink, Severity};
use crate::loc;
use crate::method::HttpMethod;
use crate::router::{self, UrlMatch};

const COMPONENT: &str = "Dispatcher";

/// Response headers owned by the server; a callback may not set these.
const RESERVED_HEADERS: [&str; 4] = ["Server", "Content-Length", "Connection", "Date"];

static MSG_UNKNOWN: EventMsg = EventMsg::new(&[
    ("en-US", "Unknown Exception occurred."),
    ("de-DE", "Unbekannte Exception aufgetreten."),
]);

static MSG_INVALID_STATUS_CODE: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "HTTP server '%1', Endpoint '%2': Invalid status code '%3'. The HTTP server returned an non-standardize status codes.",
    ),
    (
        "de-DE",
        "HTTP-Server '%1', Endpunkt '%2': Ungültiger Status-Code '%3'. Der HTTP-Server hat einen nicht standardisierte Status-Codes zurückgegeben.",
    ),
]);

static MSG_RESERVED_HEADER: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "HTTP server '%1', Endpoint '%2': The response header '%3' is set by the server automatically. Overwriting it is not allowed.",
    ),
    (
        "de-DE",
        "HTTP-Server '%1', Endpunkt '%2': Der Antwort-Header '%3' wird automatisch vom Server gesetzt. Ihn zu überschreiben ist nicht erlaubt.",
    ),
]);

static MSG_HEAD_WITH_BODY: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "HTTP server '%1', Endpoint '%2': The callback for HEAD requests returns a response body. HEAD requests may not have a response body and the returned body will be ignored.",
    ),
    (
        "de-DE",
        "HTTP-Server '%1', Endpunkt '%2': Die Callback-Funktion für HEAD-Anfragen gibt einen Antwort-Body zurück. HEAD-Anfrage dürfen keinen Antwort-Body haben und der zurückgegebene Body wird ignoriert.",
    ),
]);

/// Protocol spoken by the server. HTTP/2 is out of scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProtocolVersion {
    #[default]
    Http11,
}

/// Request handed to the user callback.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub protocol_version: ProtocolVersion,
    pub method: HttpMethod,
    /// Request headers, names preserved as received.
    pub headers: HashMap<String, String>,
    /// Request body, passed through as opaque bytes.
    pub body: Vec<u8>,
}

/// Response returned by the user callback.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub protocol_version: ProtocolVersion,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            protocol_version: ProtocolVersion::Http11,
            status_code,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Path data extracted for the matched endpoint.
#[derive(Debug, Clone, Default)]
pub struct PathInfo {
    /// The decoded request path.
    pub path: String,
    /// Captured path variables by name.
    pub variables: HashMap<String, String>,
    /// Tail captured by the terminal `#` wildcard, `/`-prefixed.
    pub multi_level: String,
    /// Query parameters; the first occurrence of a name wins.
    pub query: HashMap<String, String>,
}

/// User callback invoked for every dispatched request:
/// `(endpoint, full url, path info, request) → response`.
pub type OnRequest = dyn Fn(&str, &str, &PathInfo, &HttpRequest) -> HttpResponse + Send + Sync;

/// Transport request after adaptation: decoded path, query in both raw and
/// parsed form, preserved headers, opaque body.
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    pub method: HttpMethod,
    /// Percent-decoded request path.
    pub path: String,
    /// Query component exactly as received, for URL reconstruction.
    pub raw_query: Option<String>,
    /// Parsed query parameters, first occurrence wins.
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Response on its way back to the transport: final status, final headers
/// (including the content type), body bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl DispatchResponse {
    /// A headerless, bodyless response; used for every error the server
    /// generates itself.
    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// Standardized status codes the server will emit on behalf of a callback.
fn status_code_allowed(code: u16) -> bool {
    (200..=208).contains(&code)
        || code == 226
        || ((300..=308).contains(&code) && code != 306)
        || (400..=417).contains(&code)
        || (421..=424).contains(&code)
        || code == 426
        || (428..=429).contains(&code)
        || code == 431
        || code == 451
        || (500..=508).contains(&code)
        || code == 510
        || code == 511
}

/// Selects the best matching endpoint for a request, runs the user callback
/// and filters the returned response.
#[derive(Clone)]
pub struct Dispatcher {
    callback: Arc<OnRequest>,
    reporter: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(callback: Arc<OnRequest>, reporter: Arc<dyn EventSink>) -> Self {
        Self { callback, reporter }
    }

    /// Dispatch one request against a registry snapshot.
    ///
    /// Every registered template is matched against the request path; per
    /// method only the strictly most specific match survives. The request
    /// method's own bucket wins over `ALL`; a path that matched only under
    /// other methods yields 405, no match at all yields 404.
    pub fn dispatch(
        &self,
        registry: &EndpointRegistry,
        server_name: &str,
        request: &DispatchRequest,
    ) -> DispatchResponse {
        let mut matches_by_method: HashMap<HttpMethod, UrlMatch> = HashMap::new();
        for (method, endpoint) in registry.entries() {
            let candidate = router::matches(endpoint, &request.path);
            if !candidate.matched {
                continue;
            }
            match matches_by_method.get(&method) {
                Some(best) if best.level > candidate.level => {}
                Some(best) if best.level == candidate.level => {
                    // The registry's ambiguity check should have made an
                    // equal-level pair impossible.
                    self.reporter.report(
                        &Event::new(COMPONENT, "Unknown", Severity::Error, MSG_UNKNOWN).at(loc!()),
                    );
                    return DispatchResponse::status_only(500);
                }
                _ => {
                    matches_by_method.insert(method, candidate);
                }
            }
        }

        if matches_by_method.is_empty() {
            debug!(path = %request.path, "no endpoint matched");
            return DispatchResponse::status_only(404);
        }

        let selected = matches_by_method
            .remove(&request.method)
            .or_else(|| matches_by_method.remove(&HttpMethod::ALL));

        match selected {
            Some(url_match) => self.process(url_match, server_name, request),
            None => {
                debug!(path = %request.path, method = %request.method, "method not allowed");
                DispatchResponse::status_only(405)
            }
        }
    }

    /// Run the user callback for a selected match and filter its response.
    fn process(
        &self,
        url_match: UrlMatch,
        server_name: &str,
        request: &DispatchRequest,
    ) -> DispatchResponse {
        let path_info = PathInfo {
            path: request.path.clone(),
            variables: url_match.path_variables.clone(),
            multi_level: url_match.multi_level.clone(),
            query: request.query.clone(),
        };
        let http_request = HttpRequest {
            protocol_version: ProtocolVersion::Http11,
            method: request.method,
            headers: request.headers.clone(),
            body: request.body.clone(),
        };

        let mut full_url = format!("{}{}", server_name, request.path);
        if let Some(query) = request.raw_query.as_deref().filter(|q| !q.is_empty()) {
            full_url.push('?');
            full_url.push_str(query);
        }

        info!(
            endpoint = %url_match.endpoint,
            method = %request.method,
            url = %full_url,
            "dispatching request"
        );

        let response = match panic::catch_unwind(AssertUnwindSafe(|| {
            (self.callback)(&url_match.endpoint, &full_url, &path_info, &http_request)
        })) {
            Ok(response) => response,
            Err(_) => {
                self.reporter.report(
                    &Event::new(COMPONENT, "Unknown", Severity::Error, MSG_UNKNOWN)
                        .arg(&url_match.endpoint)
                        .at(loc!()),
                );
                return DispatchResponse::status_only(500);
            }
        };

        self.filter(&url_match.endpoint, server_name, request.method, response)
    }

    /// Enforce the status allow-list and the reserved-header rule, drop HEAD
    /// bodies, and settle the content type.
    fn filter(
        &self,
        endpoint: &str,
        server_name: &str,
        method: HttpMethod,
        mut response: HttpResponse,
    ) -> DispatchResponse {
        if !status_code_allowed(response.status_code) {
            self.reporter.report(
                &Event::new(COMPONENT, "InvalidStatusCode", Severity::Error, MSG_INVALID_STATUS_CODE)
                    .arg(server_name)
                    .arg(endpoint)
                    .arg(response.status_code)
                    .at(loc!()),
            );
            return DispatchResponse::status_only(500);
        }

        for name in response.headers.keys() {
            if RESERVED_HEADERS.contains(&name.as_str()) {
                self.reporter.report(
                    &Event::new(COMPONENT, "ReservedHeader", Severity::Error, MSG_RESERVED_HEADER)
                        .arg(server_name)
                        .arg(endpoint)
                        .arg(name)
                        .at(loc!()),
                );
                return DispatchResponse::status_only(500);
            }
        }

        if method.contains(HttpMethod::HEAD) && !response.body.is_empty() {
            self.reporter.report(
                &Event::new(COMPONENT, "HeadWithBody", Severity::Warning, MSG_HEAD_WITH_BODY)
                    .arg(server_name)
                    .arg(endpoint)
                    .at(loc!()),
            );
            response.body.clear();
        }

        // Default per RFC 2616 7.2.1; an explicitly set Content-Type wins.
        let mut content_type = if response.body.is_empty() {
            "application/x-empty".to_string()
        } else {
            "application/octet-stream".to_string()
        };
        if let Some(explicit) = response.headers.get("Content-Type") {
            content_type = explicit.clone();
        }
        if !content_type.to_ascii_lowercase().contains("charset=") {
            content_type.push_str("; charset=utf-8");
        }

        let mut headers = Vec::with_capacity(response.headers.len() + 1);
        headers.push(("Content-Type".to_string(), content_type));
        for (name, value) in &response.headers {
            if name == "Content-Type" {
                continue;
            }
            headers.push((name.clone(), value.clone()));
        }

        DispatchResponse {
            status: response.status_code,
            headers,
            body: response.body,
        }
    }
}

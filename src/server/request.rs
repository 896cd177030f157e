//! Translation from the wire request to the dispatcher's model.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use super::conn::WireRequest;
use crate::dispatcher::DispatchRequest;
use crate::method::HttpMethod;

/// Split a request target into its path and optional query component.
pub(crate) fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Percent-decode a path component.
pub(crate) fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Parse a query component into a map. The first occurrence of a name wins;
/// later duplicates are dropped.
pub(crate) fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        query.entry(name.into_owned()).or_insert_with(|| value.into_owned());
    }
    query
}

/// Adapt a wire request for the dispatcher. Header names pass through as
/// received; the body stays opaque bytes.
pub(crate) fn adapt(request: WireRequest) -> DispatchRequest {
    let WireRequest {
        method,
        target,
        headers,
        body,
    } = request;

    let (raw_path, raw_query) = split_target(&target);
    let query = raw_query.map(parse_query).unwrap_or_default();

    DispatchRequest {
        method: HttpMethod::from_name(&method),
        path: decode_path(raw_path),
        raw_query: raw_query.map(str::to_string),
        query,
        headers: headers.into_iter().collect(),
        body,
    }
}

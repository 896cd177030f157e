//! Endpoint template validation and normalization.
//!
//! A template is a path whose segments are literals, single-level path
//! variables (`{name}`), or one terminal multi-level wildcard (`#`). The
//! normalized key erases variable names and rewrites the wildcard so that
//! two templates that route identically also normalize identically; the
//! registry uses it for ambiguity detection.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{ErrorKind, ServerError};
use crate::event::{Event, EventMsg, Severity};
use crate::loc;

/// Placeholder substituted for every path variable in the normalized key.
const VARIABLE_PLACEHOLDER: &str = "[variableName]";
/// Literal substituted for the terminal `#` wildcard in the normalized key.
const HASHTAG_PLACEHOLDER: &str = "hashtag";

/// Non-greedy path-variable pattern; `{a}{b}` is two captures.
pub(crate) static PATH_VARIABLE_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.+?)\}").expect("failed to compile path variable regex"));

const COMPONENT: &str = "EndpointRegistry";

static MSG_INVALID_ENDPOINT: EventMsg = EventMsg::new(&[
    ("en-US", "Invalid endpoint '%1'."),
    ("de-DE", "Ungültiger Endpunkt '%1'."),
]);

static MSG_INVALID_ENDPOINT_HASHTAG_WILDCARD: EventMsg = EventMsg::new(&[
    ("en-US", "Invalid endpoint '%1': '#' wildcard has to be at the end."),
    ("de-DE", "Ungültiger Endpunkt '%1': '#' Wildcard muss am Ende stehen."),
]);

static MSG_INVALID_CHARACTER_IN_ENDPOINT: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "Invalid character '%1' in the endpoint path. This is a reserved character for path variables.",
    ),
    (
        "de-DE",
        "Ungültiges Zeichen '%1' im Endpunkt-Pfad. Dies ist ein reserviertes Zeichen für Pfad-Variablen.",
    ),
]);

fn invalid_endpoint(endpoint: &str) -> ServerError {
    ServerError::new(
        ErrorKind::InvalidEndpoint,
        Event::new(COMPONENT, "InvalidEndpoint", Severity::Error, MSG_INVALID_ENDPOINT)
            .arg(endpoint)
            .at(loc!()),
    )
}

fn invalid_hashtag_wildcard(endpoint: &str) -> ServerError {
    ServerError::new(
        ErrorKind::InvalidEndpointHashtagWildcard,
        Event::new(
            COMPONENT,
            "InvalidEndpointHashtagWildcard",
            Severity::Error,
            MSG_INVALID_ENDPOINT_HASHTAG_WILDCARD,
        )
        .arg(endpoint)
        .at(loc!()),
    )
}

fn invalid_character(character: &str) -> ServerError {
    ServerError::new(
        ErrorKind::InvalidCharacterInEndpoint,
        Event::new(
            COMPONENT,
            "InvalidCharacterInEndpoint",
            Severity::Error,
            MSG_INVALID_CHARACTER_IN_ENDPOINT,
        )
        .arg(character)
        .at(loc!()),
    )
}

/// Validate `endpoint` and produce its normalized key.
///
/// Every maximal `{…}` run becomes `[variableName]` and a terminal `#`
/// becomes `hashtag`. Rejected templates: a `#` anywhere but the end, stray
/// braces outside a variable, a variable capture spanning `/`, duplicate
/// variable names, and anything that does not survive as a URL path.
pub(crate) fn normalize(endpoint: &str) -> Result<String, ServerError> {
    // '#' is only valid as the final character.
    if let Some(position) = endpoint.find('#') {
        if position != endpoint.len() - 1 {
            return Err(invalid_hashtag_wildcard(endpoint));
        }
    }

    // A capture spanning a segment boundary or a reused name produces a
    // template that cannot match the way it reads.
    let mut names: Vec<&str> = Vec::new();
    for capture in PATH_VARIABLE_RX.captures_iter(endpoint) {
        let name = capture.get(1).map(|m| m.as_str()).unwrap_or("");
        if name.contains('/') || names.contains(&name) {
            return Err(invalid_endpoint(endpoint));
        }
        names.push(name);
    }

    let normalized = PATH_VARIABLE_RX
        .replace_all(endpoint, VARIABLE_PLACEHOLDER)
        .replace('#', HASHTAG_PLACEHOLDER);

    // Any brace left over was not part of a variable.
    if normalized.contains('{') {
        return Err(invalid_character("{"));
    }
    if normalized.contains('}') {
        return Err(invalid_character("}"));
    }

    // The normalized form has to survive as the path of a URL.
    if !normalized.starts_with('/')
        || Url::parse(&format!("http://endpoint.invalid{normalized}")).is_err()
    {
        return Err(invalid_endpoint(endpoint));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variables() {
        assert_eq!(normalize("/users/{id}").unwrap(), "/users/[variableName]");
        assert_eq!(
            normalize("/users/{id}/posts/{postId}").unwrap(),
            "/users/[variableName]/posts/[variableName]"
        );
    }

    #[test]
    fn test_normalize_wildcard() {
        assert_eq!(normalize("/files/#").unwrap(), "/files/hashtag");
    }

    #[test]
    fn test_adjacent_captures_in_one_segment() {
        assert_eq!(
            normalize("/a/{b}{c}").unwrap(),
            "/a/[variableName][variableName]"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize("/users/{id}/#").unwrap();
        assert_eq!(normalize(&once).unwrap(), once);
    }

    #[test]
    fn test_literal_template_passes_through() {
        assert_eq!(normalize("/ping").unwrap(), "/ping");
    }

    #[test]
    fn test_hashtag_must_be_terminal() {
        let err = normalize("/a#/b").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidEndpointHashtagWildcard);
        let err = normalize("/a/##").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidEndpointHashtagWildcard);
    }

    #[test]
    fn test_stray_braces_rejected() {
        let err = normalize("/a/{b").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidCharacterInEndpoint);
        assert_eq!(err.event().args(), ["{"]);

        let err = normalize("/a/b}").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidCharacterInEndpoint);
        assert_eq!(err.event().args(), ["}"]);
    }

    #[test]
    fn test_capture_spanning_slash_rejected() {
        let err = normalize("/x/{a/b}").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidEndpoint);
    }

    #[test]
    fn test_duplicate_variable_names_rejected() {
        let err = normalize("/x/{a}/{a}").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidEndpoint);
    }

    #[test]
    fn test_relative_template_rejected() {
        let err = normalize("users/{id}").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidEndpoint);
    }
}

//! Endpoint registry.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::endpoint::template;
use crate::error::{ErrorKind, ServerError};
use crate::event::{Event, EventMsg, Severity};
use crate::loc;
use crate::method::HttpMethod;

const COMPONENT: &str = "EndpointRegistry";

static MSG_AMBIGUOUS_ENDPOINT: EventMsg = EventMsg::new(&[
    (
        "en-US",
        "Ambigous endpoint '%1'. Registered endpoint '%2' already routes to this endpoint.",
    ),
    (
        "de-DE",
        "Mehrdeutiger Endpunkt '%1'. Registrierter Endpunkt '%2' routet bereits zu diesem Endpunkt.",
    ),
]);

static MSG_UNSUPPORTED_HTTP_METHOD: EventMsg = EventMsg::new(&[
    ("en-US", "Unsupported HTTP request method."),
    ("de-DE", "Nicht unterstützte HTTP-Request Methode."),
]);

fn ambiguous_endpoint(endpoint: &str, registered: &str) -> ServerError {
    ServerError::new(
        ErrorKind::AmbiguousEndpoint,
        Event::new(COMPONENT, "AmbiguousEndpoint", Severity::Error, MSG_AMBIGUOUS_ENDPOINT)
            .arg(endpoint)
            .arg(registered)
            .at(loc!()),
    )
}

fn unsupported_http_method() -> ServerError {
    ServerError::new(
        ErrorKind::UnsupportedHttpMethod,
        Event::new(
            COMPONENT,
            "UnsupportedHttpMethod",
            Severity::Error,
            MSG_UNSUPPORTED_HTTP_METHOD,
        )
        .at(loc!()),
    )
}

/// Registered endpoints: `(normalized key, method) → original template`.
///
/// The normalized key makes ambiguity visible at registration time: two
/// templates that differ only in variable names collide here instead of
/// fighting over requests later.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<(String, HttpMethod), String>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `endpoint` and register it for `method`.
    ///
    /// Fails without mutating the registry when the template is invalid,
    /// when `method` is [`HttpMethod::UNKNOWN`], or when another template
    /// already routes identically for the same method.
    pub fn add(&mut self, endpoint: &str, method: HttpMethod) -> Result<(), ServerError> {
        if method == HttpMethod::UNKNOWN {
            return Err(unsupported_http_method());
        }

        let key = (template::normalize(endpoint)?, method);
        if let Some(registered) = self.endpoints.get(&key) {
            return Err(ambiguous_endpoint(endpoint, registered));
        }

        info!(
            endpoint,
            method = %method,
            total = self.endpoints.len() + 1,
            "endpoint registered"
        );
        self.endpoints.insert(key, endpoint.to_string());
        Ok(())
    }

    /// Remove the first entry whose stored original template and method both
    /// match. Returns whether such an entry existed.
    pub fn remove(&mut self, endpoint: &str, method: HttpMethod) -> bool {
        let key = self
            .endpoints
            .iter()
            .find(|((_, m), stored)| *m == method && stored.as_str() == endpoint)
            .map(|(key, _)| key.clone());

        match key {
            Some(key) => {
                self.endpoints.remove(&key);
                debug!(endpoint, method = %method, "endpoint removed");
                true
            }
            None => false,
        }
    }

    /// Iterate over `(method, original template)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (HttpMethod, &str)> {
        self.endpoints
            .iter()
            .map(|((_, method), endpoint)| (*method, endpoint.as_str()))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_add_and_remove() {
        let mut registry = EndpointRegistry::new();
        registry.add("/users/{id}", HttpMethod::GET).unwrap();
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("/users/{id}", HttpMethod::GET));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ambiguous_add_names_registered_template() {
        let mut registry = EndpointRegistry::new();
        registry.add("/a/{b}", HttpMethod::GET).unwrap();

        let err = registry.add("/a/{c}", HttpMethod::GET).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousEndpoint);
        assert_eq!(err.event().args(), ["/a/{c}", "/a/{b}"]);
        // Failed add leaves the registry unchanged.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_template_different_methods() {
        let mut registry = EndpointRegistry::new();
        registry.add("/a/{b}", HttpMethod::GET).unwrap();
        registry.add("/a/{b}", HttpMethod::POST).unwrap();
        registry.add("/a/{b}", HttpMethod::ALL).unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_remove_matches_original_template_not_key() {
        let mut registry = EndpointRegistry::new();
        registry.add("/a/{b}", HttpMethod::GET).unwrap();

        // Same normalized key, different original: nothing to remove.
        assert!(!registry.remove("/a/{c}", HttpMethod::GET));
        // Right template, wrong method: nothing to remove.
        assert!(!registry.remove("/a/{b}", HttpMethod::POST));
        assert!(registry.remove("/a/{b}", HttpMethod::GET));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let mut registry = EndpointRegistry::new();
        let err = registry.add("/a", HttpMethod::UNKNOWN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedHttpMethod);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let mut registry = EndpointRegistry::new();
        let err = registry.add("/a/#/b", HttpMethod::GET).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEndpointHashtagWildcard);
        assert!(registry.is_empty());
    }
}

//! Matching and registration behavior through the public API.

use portico::router::matches;
use portico::{EndpointRegistry, ErrorKind, HttpMethod};

#[test]
fn test_variables_map_one_segment_each() {
    let m = matches("/orgs/{org}/repos/{repo}", "/orgs/acme/repos/site");
    assert!(m.matched);
    assert_eq!(m.path_variables.len(), 2);
    assert_eq!(m.path_variables.get("org").map(String::as_str), Some("acme"));
    assert_eq!(m.path_variables.get("repo").map(String::as_str), Some("site"));
    assert_eq!(m.level, 2);
}

#[test]
fn test_failed_match_is_empty() {
    let m = matches("/orgs/{org}/repos", "/orgs/acme/users");
    assert!(!m.matched);
    assert!(m.path_variables.is_empty());
    assert_eq!(m.multi_level, "");
    assert_eq!(m.level, 0);
}

#[test]
fn test_wildcard_level_outranks_variable_cover() {
    // Both match "/a/b"; the wildcard interpretation must rank higher.
    let wildcard = matches("/a/#", "/a/b");
    let variable = matches("/a/{x}", "/a/b");
    assert!(wildcard.matched && variable.matched);
    assert!(wildcard.level > variable.level);

    // Same relation with a longer tail against a variable-per-level cover.
    let wildcard = matches("/a/#", "/a/b/c");
    let variables = matches("/a/{x}/{y}", "/a/b/c");
    assert!(wildcard.level > variables.level);
}

#[test]
fn test_wildcard_requires_at_least_one_segment() {
    assert!(!matches("/files/#", "/files").matched);
}

#[test]
fn test_registry_rejects_templates_differing_only_in_variable_names() {
    let mut registry = EndpointRegistry::new();
    registry.add("/a/{b}", HttpMethod::GET).unwrap();

    let err = registry.add("/a/{c}", HttpMethod::GET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousEndpoint);
    // The diagnostic names the already-registered template.
    assert_eq!(err.event().args(), ["/a/{c}", "/a/{b}"]);
}

#[test]
fn test_registry_distinguishes_wildcard_from_variable() {
    let mut registry = EndpointRegistry::new();
    registry.add("/x/{a}", HttpMethod::GET).unwrap();
    // Different normalized key, so no ambiguity.
    registry.add("/x/#", HttpMethod::GET).unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_registry_validation_errors() {
    let mut registry = EndpointRegistry::new();

    let err = registry.add("/a#/b", HttpMethod::GET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEndpointHashtagWildcard);

    let err = registry.add("/a/{b", HttpMethod::GET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCharacterInEndpoint);

    let err = registry.add("/a/{x/y}", HttpMethod::GET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEndpoint);

    assert!(registry.is_empty());
}

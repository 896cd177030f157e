//! Path matching for registered endpoint templates.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Anchored form of the path-variable pattern: a template segment is a
/// variable only when the braces span the whole segment.
static PATH_VARIABLE_EXACT_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{(.+?)\}$").expect("failed to compile path variable regex"));

/// Outcome of matching one endpoint template against a request path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlMatch {
    /// Whether the template matched. The remaining fields are only
    /// meaningful when this is set.
    pub matched: bool,
    /// Specificity of the match: one per captured path variable, with the
    /// multi-level wildcard scoring one above a variable-per-segment
    /// interpretation of the tail it swallowed.
    pub level: i32,
    /// The original endpoint template that was tested.
    pub endpoint: String,
    /// Captured path variables by name.
    pub path_variables: HashMap<String, String>,
    /// Tail captured by the terminal `#` wildcard, `/`-prefixed; empty when
    /// the template has no wildcard.
    pub multi_level: String,
}

impl UrlMatch {
    fn miss(endpoint: &str) -> UrlMatch {
        UrlMatch {
            endpoint: endpoint.to_string(),
            ..UrlMatch::default()
        }
    }
}

/// Match `endpoint` against the decoded request `path`.
///
/// Both sides are split on `/` into level arrays (the leading empty element
/// is kept) and walked in lockstep: literal segments must agree, `{name}`
/// segments capture one URL level, and a terminal `#` swallows all remaining
/// levels. A failed match carries no captures.
pub fn matches(endpoint: &str, path: &str) -> UrlMatch {
    let mut result = UrlMatch::miss(endpoint);

    let url_levels: Vec<&str> = path.split('/').collect();
    let endpoint_levels: Vec<&str> = endpoint.split('/').collect();

    if url_levels.len() < endpoint_levels.len() {
        return result;
    }
    if url_levels.len() > endpoint_levels.len() && !endpoint.ends_with('#') {
        return result;
    }

    for (i, level) in endpoint_levels.iter().enumerate() {
        if let Some(capture) = PATH_VARIABLE_EXACT_RX.captures(level) {
            result
                .path_variables
                .insert(capture[1].to_string(), url_levels[i].to_string());
            result.level += 1;
        } else if *level == "#" {
            // One higher than a variable-per-level cover of the same tail.
            result.multi_level = format!("/{}", url_levels[i..].join("/"));
            result.level = (url_levels.len() - i + 1) as i32;
            break;
        } else if *level != url_levels[i] {
            return UrlMatch::miss(endpoint);
        }
    }

    result.matched = true;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let m = matches("/ping", "/ping");
        assert!(m.matched);
        assert_eq!(m.level, 0);
        assert!(m.path_variables.is_empty());
        assert_eq!(m.multi_level, "");
    }

    #[test]
    fn test_literal_mismatch() {
        assert!(!matches("/ping", "/pong").matched);
    }

    #[test]
    fn test_variable_extraction() {
        let m = matches("/users/{id}", "/users/42");
        assert!(m.matched);
        assert_eq!(m.level, 1);
        assert_eq!(m.path_variables.get("id").map(String::as_str), Some("42"));
        assert_eq!(m.multi_level, "");
    }

    #[test]
    fn test_multiple_variables() {
        let m = matches("/users/{id}/posts/{postId}", "/users/7/posts/99");
        assert!(m.matched);
        assert_eq!(m.level, 2);
        assert_eq!(m.path_variables.get("id").map(String::as_str), Some("7"));
        assert_eq!(m.path_variables.get("postId").map(String::as_str), Some("99"));
    }

    #[test]
    fn test_wildcard_tail_capture() {
        let m = matches("/files/#", "/files/a/b/c");
        assert!(m.matched);
        assert!(m.path_variables.is_empty());
        assert_eq!(m.multi_level, "/a/b/c");
        // Levels: ["", "files", "a", "b", "c"], wildcard at index 2.
        assert_eq!(m.level, 4);
    }

    #[test]
    fn test_wildcard_matches_single_segment() {
        let m = matches("/files/#", "/files/a");
        assert!(m.matched);
        assert_eq!(m.multi_level, "/a");
        assert_eq!(m.level, 2);
    }

    #[test]
    fn test_wildcard_outranks_variable() {
        let wildcard = matches("/a/#", "/a/b");
        let variable = matches("/a/{x}", "/a/b");
        assert!(wildcard.matched && variable.matched);
        assert!(wildcard.level > variable.level);
    }

    #[test]
    fn test_path_shorter_than_template() {
        assert!(!matches("/a/b/c", "/a/b").matched);
    }

    #[test]
    fn test_path_longer_than_template_without_wildcard() {
        assert!(!matches("/a/{x}", "/a/b/c").matched);
    }

    #[test]
    fn test_failed_match_has_no_captures() {
        let m = matches("/users/{id}/posts", "/users/42/comments");
        assert!(!m.matched);
        assert!(m.path_variables.is_empty());
        assert_eq!(m.level, 0);
    }

    #[test]
    fn test_variable_then_literal() {
        let m = matches("/users/{id}/posts", "/users/42/posts");
        assert!(m.matched);
        assert_eq!(m.level, 1);
    }
}

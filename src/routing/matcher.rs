//! Route matching logic.
//!
//! # Design Decisions
//! - Prefix matching respects path segment boundaries ("/api" matches
//!   "/api/v1" but not "/apix")
//! - No regex to guarantee O(n) matching

/// Matches a request path against a configured prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing slash is trimmed so
    /// "/api" and "/api/" behave identically.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix: String = prefix.into();
        while prefix.len() > 1 && prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    /// Returns true if `path` falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Remainder of `path` after the prefix, always starting with '/'.
    pub fn strip(&self, path: &str) -> String {
        if self.prefix == "/" {
            return path.to_string();
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            Some(_) | None => "/".to_string(),
        }
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix.len()
    }
}

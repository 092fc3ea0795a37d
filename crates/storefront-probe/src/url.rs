//! URL matching for navigation settling and location assertions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern a page location is matched against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
}

impl UrlPattern {
    /// Exact match shorthand
    #[must_use]
    pub fn exact(url: impl Into<String>) -> Self {
        Self::Exact(url.into())
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p:?}"),
            Self::Prefix(p) => write!(f, "url starting with {p:?}"),
            Self::Contains(p) => write!(f, "url containing {p:?}"),
            Self::Regex(p) => write!(f, "url matching /{p}/"),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(url: &str) -> Self {
        Self::Exact(url.to_string())
    }
}

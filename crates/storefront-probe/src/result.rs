//! Result and error types for storefront-probe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Context attached to every verdict that did not hold.
///
/// Carries enough to diagnose a failure without re-running it: what was
/// looked at, what was expected, what was last seen and how long the engine
/// waited before giving up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Selector or subject of the check (e.g. `css=.shopping_cart_badge`)
    pub target: String,
    /// Expected state, human readable
    pub expected: String,
    /// Last observed state
    pub observed: String,
    /// Time spent waiting, in milliseconds
    pub elapsed_ms: u64,
}

impl Diagnostic {
    /// Create a new diagnostic
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            expected: expected.into(),
            observed: observed.into(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Elapsed wait as a `Duration`
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, observed {} (waited {}ms)",
            self.target, self.expected, self.observed, self.elapsed_ms
        )
    }
}

/// Errors that can occur while driving and verifying a page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A bounded wait never became true
    #[error("Timed out: {0}")]
    Timeout(Box<Diagnostic>),

    /// Observed state deterministically mismatched expected state
    #[error("Verification failed: {0}")]
    VerificationFailure(Box<Diagnostic>),

    /// A locator matched zero elements where one was required, or more than
    /// one where exactly one was required
    #[error("Could not resolve {0}")]
    ResolutionFailure(Box<Diagnostic>),

    /// Element handle no longer refers to a live element
    #[error("Stale element handle {handle}")]
    StaleElement {
        /// Handle id
        handle: String,
    },

    /// Script evaluation failed (page mid-navigation, detached frame, ...)
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Connection to the browser was lost
    #[error("Browser connection closed: {message}")]
    ConnectionClosed {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Build a timeout error
    #[must_use]
    pub fn timeout(diagnostic: Diagnostic) -> Self {
        Self::Timeout(Box::new(diagnostic))
    }

    /// Build a verification failure
    #[must_use]
    pub fn verification(diagnostic: Diagnostic) -> Self {
        Self::VerificationFailure(Box::new(diagnostic))
    }

    /// Build a resolution failure
    #[must_use]
    pub fn resolution(diagnostic: Diagnostic) -> Self {
        Self::ResolutionFailure(Box::new(diagnostic))
    }

    /// Build a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Whether the wait engine may treat this error as "not yet true"
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StaleElement { .. } | Self::Evaluation { .. })
    }

    /// Diagnostic context, if the error carries any
    #[must_use]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Timeout(d) | Self::VerificationFailure(d) | Self::ResolutionFailure(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            "css=.shopping_cart_badge",
            "text \"3\"",
            "text \"2\"",
            Duration::from_millis(5000),
        );
        let rendered = diag.to_string();
        assert!(rendered.contains("css=.shopping_cart_badge"));
        assert!(rendered.contains("expected text \"3\""));
        assert!(rendered.contains("observed text \"2\""));
        assert!(rendered.contains("5000ms"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProbeError::StaleElement {
            handle: "1:0".into()
        }
        .is_transient());
        assert!(ProbeError::Evaluation {
            message: "context destroyed".into()
        }
        .is_transient());
        assert!(!ProbeError::ConnectionClosed {
            message: "gone".into()
        }
        .is_transient());
        assert!(!ProbeError::resolution(Diagnostic::new(
            "css=button",
            "exactly one element",
            "3 elements",
            Duration::ZERO
        ))
        .is_transient());
    }

    #[test]
    fn test_diagnostic_accessor() {
        let diag = Diagnostic::new("url", "x", "y", Duration::ZERO);
        let err = ProbeError::verification(diag.clone());
        assert_eq!(err.diagnostic(), Some(&diag));
        assert!(ProbeError::page("boom").diagnostic().is_none());
    }

    #[test]
    fn test_resolution_failure_carries_diagnostic() {
        let diag = Diagnostic::new(
            "css=.inventory_item",
            "visible",
            "no element matched",
            Duration::from_millis(500),
        );
        let err = ProbeError::resolution(diag.clone());
        assert_eq!(err.diagnostic(), Some(&diag));
        let rendered = err.to_string();
        assert!(rendered.starts_with("Could not resolve css=.inventory_item"));
        assert!(rendered.contains("waited 500ms"));
    }

    #[test]
    fn test_diagnostic_serializes() {
        let diag = Diagnostic::new("a", "b", "c", Duration::from_millis(12));
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"elapsed_ms\":12"));
    }
}

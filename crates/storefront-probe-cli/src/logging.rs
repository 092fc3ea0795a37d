//! Structured logging on stderr

use crate::commands::LogFormat;
use crate::config::Verbosity;
use crate::error::{CliError, CliResult};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set and valid, otherwise the directive for `verbosity`
#[must_use]
pub fn env_filter(verbosity: Verbosity, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.log_directive()))
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(verbosity: Verbosity, format: LogFormat) -> CliResult<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity, rust_log.as_deref()))
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| CliError::logging(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_verbosity() {
        let filter = env_filter(Verbosity::Debug, None).to_string();
        assert!(filter.contains("storefront_probe=debug"));
    }

    #[test]
    fn test_rust_log_wins() {
        let filter = env_filter(Verbosity::Quiet, Some("storefront_probe=trace")).to_string();
        assert!(filter.contains("storefront_probe=trace"));
    }

    #[test]
    fn test_invalid_rust_log_falls_back() {
        let filter = env_filter(Verbosity::Quiet, Some("storefront_probe=loudest")).to_string();
        assert_eq!(filter, "error");
    }
}

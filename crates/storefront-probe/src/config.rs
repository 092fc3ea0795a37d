//! Run configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, a YAML file,
//! environment variables, then whatever the caller sets through the
//! `with_*` builders (the CLI applies its flags there).

use crate::browser::BrowserConfig;
use crate::result::{ProbeError, ProbeResult};
use crate::storefront::{BASE_URL, PASSWORD, STANDARD_USER};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the storefront base URL
pub const BASE_URL_ENV: &str = "STOREFRONT_PROBE_BASE_URL";

/// Environment variable naming the Chromium binary
pub const CHROME_BIN_ENV: &str = "CHROME_BIN";

/// Default bound on a page load
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Login credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: STANDARD_USER.to_string(),
            password: PASSWORD.to_string(),
        }
    }
}

/// Complete configuration of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Storefront root, with trailing slash
    pub base_url: String,
    /// Account used by the logged-in scenarios
    pub credentials: Credentials,
    /// Implicit-wait bounds for every action and assertion
    pub wait: WaitOptions,
    /// Bound on a single page load
    pub navigation_timeout_ms: u64,
    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            credentials: Credentials::default(),
            wait: WaitOptions::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            browser: BrowserConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; absent keys keep their defaults
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ProbeError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config = Self::from_yaml(&yaml)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overlay the process environment
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay variables read through `lookup`
    #[must_use]
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self = self.with_base_url(url);
        }
        if let Some(path) = lookup(CHROME_BIN_ENV).filter(|v| !v.is_empty()) {
            self.browser = self.browser.with_chromium_path(path);
        }
        self
    }

    /// Set the base URL, normalizing to a trailing slash
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    /// Set the login account
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Set the implicit-wait timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.wait = self.wait.with_timeout(timeout_ms);
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.wait = self.wait.with_poll_interval(poll_interval_ms);
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Replace the browser settings
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Navigation timeout as a duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> ProbeResult<()> {
        let invalid = |message: &str| {
            Err(ProbeError::Config {
                message: message.to_string(),
            })
        };
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return invalid("base_url must be an http(s) URL");
        }
        if self.wait.timeout_ms == 0 {
            return invalid("wait.timeout_ms must be positive");
        }
        if self.wait.poll_interval_ms == 0 {
            return invalid("wait.poll_interval_ms must be positive");
        }
        if self.navigation_timeout_ms == 0 {
            return invalid("navigation_timeout_ms must be positive");
        }
        Ok(())
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_default_config() {
            let config = ProbeConfig::new();
            assert_eq!(config.base_url, "https://www.saucedemo.com/");
            assert_eq!(config.credentials.username, "standard_user");
            assert_eq!(config.credentials.password, "secret_sauce");
            assert_eq!(config.wait.timeout_ms, 5_000);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_builders() {
            let config = ProbeConfig::new()
                .with_base_url("http://localhost:8080")
                .with_timeout(2_000)
                .with_poll_interval(50)
                .with_navigation_timeout(10_000)
                .with_credentials("user", "pass")
                .with_browser(BrowserConfig::default().with_no_sandbox());
            assert_eq!(config.base_url, "http://localhost:8080/");
            assert_eq!(config.wait.timeout_ms, 2_000);
            assert_eq!(config.wait.poll_interval_ms, 50);
            assert_eq!(config.navigation_timeout(), Duration::from_secs(10));
            assert_eq!(config.credentials.username, "user");
            assert!(!config.browser.sandbox);
        }
    }

    mod yaml_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_partial_yaml() {
            let config = ProbeConfig::from_yaml("wait:\n  timeout_ms: 250\n").unwrap();
            assert_eq!(config.wait.timeout_ms, 250);
            assert_eq!(config.wait.poll_interval_ms, 100);
            assert_eq!(config.base_url, BASE_URL);
        }

        #[test]
        fn test_invalid_values_rejected() {
            let err = ProbeConfig::from_yaml("base_url: ftp://shop\n").unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
            let err = ProbeConfig::from_yaml("wait:\n  poll_interval_ms: 0\n").unwrap_err();
            assert!(err.to_string().contains("poll_interval_ms"));
        }

        #[test]
        fn test_malformed_yaml() {
            let err = ProbeConfig::from_yaml("wait: [1, 2").unwrap_err();
            assert!(matches!(err, ProbeError::Yaml(_)));
        }

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                "base_url: http://127.0.0.1:3000/\nbrowser:\n  headless: false\n  chromium_path: /opt/chrome\n"
            )
            .unwrap();
            let config = ProbeConfig::load(file.path()).unwrap();
            assert_eq!(config.base_url, "http://127.0.0.1:3000/");
            assert!(!config.browser.headless);
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/opt/chrome"));
        }

        #[test]
        fn test_load_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let err = ProbeConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }

        #[test]
        fn test_yaml_round_trip() {
            let config = ProbeConfig::new().with_timeout(1_234);
            let back = ProbeConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
            assert_eq!(back, config);
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_env_overlay() {
            let vars: HashMap<&str, &str> = [
                (BASE_URL_ENV, "http://staging.test"),
                (CHROME_BIN_ENV, "/usr/bin/chromium"),
            ]
            .into_iter()
            .collect();
            let config = ProbeConfig::new().apply_env_from(|k| vars.get(k).map(ToString::to_string));
            assert_eq!(config.base_url, "http://staging.test/");
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }

        #[test]
        fn test_empty_env_ignored() {
            let config = ProbeConfig::new().apply_env_from(|_| Some(String::new()));
            assert_eq!(config, ProbeConfig::new());
        }
    }
}

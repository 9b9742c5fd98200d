//! REST client configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tradelink_core::config::{Validatable, Validator};
use tradelink_core::error::ConfigError;

/// Configuration for the secondary REST channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Base URL for API requests.
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Header carrying the anti-forgery token on mutating requests.
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,

    /// Additional headers to include in requests.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("Tradelink/{}", env!("CARGO_PKG_VERSION"))
}

fn default_csrf_header() -> String {
    "X-CSRF-Token".to_string()
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            csrf_header: default_csrf_header(),
            headers: HashMap::new(),
        }
    }
}

impl RestConfig {
    /// Creates a new builder for `RestConfig`.
    #[must_use]
    pub fn builder() -> RestConfigBuilder {
        RestConfigBuilder::default()
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Validatable for RestConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut v = Validator::for_section("rest");
        v.require_non_empty("base_url", &self.base_url)
            .url_with_scheme("base_url", &self.base_url, &["http", "https"])
            .positive("timeout_ms", &self.timeout_ms)
            .require_non_empty("csrf_header", &self.csrf_header);
        v.result()
    }
}

/// Builder for `RestConfig`.
#[derive(Debug, Default)]
pub struct RestConfigBuilder {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    user_agent: Option<String>,
    csrf_header: Option<String>,
    headers: HashMap<String, String>,
}

impl RestConfigBuilder {
    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the anti-forgery header name.
    #[must_use]
    pub fn csrf_header(mut self, name: impl Into<String>) -> Self {
        self.csrf_header = Some(name.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Builds the `RestConfig`.
    #[must_use]
    pub fn build(self) -> RestConfig {
        RestConfig {
            base_url: self.base_url.unwrap_or_default(),
            timeout_ms: self.timeout_ms.unwrap_or_else(default_timeout_ms),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            csrf_header: self.csrf_header.unwrap_or_else(default_csrf_header),
            headers: self.headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RestConfig::builder()
            .base_url("https://app.example.com")
            .timeout(Duration::from_secs(15))
            .csrf_header("X-XSRF")
            .header("X-Client", "cli")
            .build();

        assert_eq!(config.base_url, "https://app.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.csrf_header, "X-XSRF");
        assert_eq!(config.headers.get("X-Client").map(String::as_str), Some("cli"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config = RestConfig::default();

        assert!(config.base_url.is_empty());
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.csrf_header, "X-CSRF-Token");
        assert!(config.user_agent.starts_with("Tradelink/"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = RestConfig::builder().base_url("ws://app.example.com").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: RestConfig =
            serde_json::from_str(r#"{"base_url": "http://localhost:8080"}"#).unwrap();
        assert_eq!(parsed.timeout_ms, 30_000);
        assert_eq!(parsed.csrf_header, "X-CSRF-Token");
    }
}

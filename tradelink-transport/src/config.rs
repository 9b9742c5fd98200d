//! Transport client configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tradelink_core::config::{Configurable, EnvLookup, EnvOverride, Validatable, Validator};
use tradelink_core::error::ConfigError;

/// Environment variable prefix for transport overrides.
pub const ENV_PREFIX: &str = "TRADELINK";

/// Message types accepted by the classifier unless configured otherwise.
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "market_data",
    "indicators",
    "signal",
    "signals",
    "session_status",
    "session_update",
    "strategy_status",
    "strategy_update",
    "health_check",
    "comprehensive_health_check",
    "data",
    "status",
    "pong",
    "subscribe",
    "unsubscribe",
    "command",
];

/// Configuration for the transport client.
///
/// Every field has a default, so a config file only needs `endpoint_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// WebSocket endpoint URL.
    pub endpoint_url: String,

    /// Transport connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// How long the session check and handshake acknowledgment may take
    /// after the transport opens.
    pub handshake_timeout_ms: u64,

    /// Liveness probe interval in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// How long each probe waits for a pong.
    pub heartbeat_timeout_ms: u64,

    /// Unanswered probes that mark the connection dead.
    pub max_missed_pongs: u32,

    /// Unanswered probes that raise a slow-connection warning.
    pub slow_connection_threshold: u32,

    /// Automatic reconnects before giving up.
    pub max_reconnect_attempts: u32,

    /// First backoff delay in milliseconds.
    pub base_backoff_delay_ms: u64,

    /// Backoff cap in milliseconds.
    pub max_backoff_delay_ms: u64,

    /// Fixed delay used by a caller-driven reconnect.
    pub manual_reconnect_delay_ms: u64,

    /// Default deadline for correlated requests.
    pub request_timeout_ms: u64,

    /// Inbound message types that are routed; everything else is dropped.
    pub allowed_types: Vec<String>,

    /// Listener count above which `listener_stats` warns.
    pub listener_warn_threshold: usize,

    /// Inbound frames larger than this are dropped.
    pub max_message_bytes: usize,

    /// Extra headers sent with the upgrade request.
    pub headers: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            connect_timeout_ms: 10_000,
            handshake_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 10_000,
            max_missed_pongs: 3,
            slow_connection_threshold: 2,
            max_reconnect_attempts: 5,
            base_backoff_delay_ms: 1_000,
            max_backoff_delay_ms: 30_000,
            manual_reconnect_delay_ms: 100,
            request_timeout_ms: 30_000,
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            listener_warn_threshold: 50,
            max_message_bytes: 16 * 1024 * 1024,
            headers: HashMap::new(),
        }
    }
}

impl TransportConfig {
    /// Creates a new builder for `TransportConfig`.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the handshake timeout as a Duration.
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Returns the probe interval as a Duration.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Returns the per-probe pong timeout as a Duration.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    /// Returns the default request deadline as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the manual reconnect delay as a Duration.
    #[must_use]
    pub fn manual_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.manual_reconnect_delay_ms)
    }

    /// Backoff before automatic reconnect number `attempt` (zero based).
    ///
    /// `min(base * 2^attempt, max)`, saturating instead of overflowing.
    ///
    /// ```
    /// use std::time::Duration;
    /// use tradelink_transport::TransportConfig;
    ///
    /// let config = TransportConfig::default();
    /// assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
    /// assert_eq!(config.backoff_delay(3), Duration::from_secs(8));
    /// assert_eq!(config.backoff_delay(60), Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self
            .base_backoff_delay_ms
            .saturating_mul(factor)
            .min(self.max_backoff_delay_ms);
        Duration::from_millis(delay)
    }

    /// Returns whether another automatic reconnect is allowed.
    #[must_use]
    pub fn should_reconnect(&self, attempts: u32) -> bool {
        attempts < self.max_reconnect_attempts
    }
}

impl Validatable for TransportConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut v = Validator::for_section("transport");
        v.require_non_empty("endpoint_url", &self.endpoint_url)
            .url_with_scheme("endpoint_url", &self.endpoint_url, &["ws", "wss"])
            .positive("connect_timeout_ms", &self.connect_timeout_ms)
            .positive("handshake_timeout_ms", &self.handshake_timeout_ms)
            .positive("heartbeat_interval_ms", &self.heartbeat_interval_ms)
            .positive("heartbeat_timeout_ms", &self.heartbeat_timeout_ms)
            .positive("max_missed_pongs", &self.max_missed_pongs)
            .positive("request_timeout_ms", &self.request_timeout_ms)
            .positive("max_message_bytes", &self.max_message_bytes)
            .custom(
                "slow_connection_threshold",
                || self.slow_connection_threshold < self.max_missed_pongs,
                "must be less than max_missed_pongs",
            )
            .custom(
                "base_backoff_delay_ms",
                || self.base_backoff_delay_ms <= self.max_backoff_delay_ms,
                "must not exceed max_backoff_delay_ms",
            );
        v.result()
    }
}

impl Configurable for TransportConfig {
    fn apply_env_overrides_with(
        &mut self,
        prefix: &str,
        lookup: EnvLookup<'_>,
    ) -> Result<(), ConfigError> {
        EnvOverride::apply_string(lookup, &format!("{prefix}_ENDPOINT_URL"), &mut self.endpoint_url);
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_CONNECT_TIMEOUT_MS"),
            &mut self.connect_timeout_ms,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_HANDSHAKE_TIMEOUT_MS"),
            &mut self.handshake_timeout_ms,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_HEARTBEAT_INTERVAL_MS"),
            &mut self.heartbeat_interval_ms,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_HEARTBEAT_TIMEOUT_MS"),
            &mut self.heartbeat_timeout_ms,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_MAX_MISSED_PONGS"),
            &mut self.max_missed_pongs,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_SLOW_CONNECTION_THRESHOLD"),
            &mut self.slow_connection_threshold,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_MAX_RECONNECT_ATTEMPTS"),
            &mut self.max_reconnect_attempts,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_BASE_BACKOFF_DELAY_MS"),
            &mut self.base_backoff_delay_ms,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_MAX_BACKOFF_DELAY_MS"),
            &mut self.max_backoff_delay_ms,
        )?;
        EnvOverride::apply_number(
            lookup,
            &format!("{prefix}_REQUEST_TIMEOUT_MS"),
            &mut self.request_timeout_ms,
        )?;
        EnvOverride::apply_list(
            lookup,
            &format!("{prefix}_ALLOWED_TYPES"),
            &mut self.allowed_types,
        );
        Ok(())
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "ENDPOINT_URL",
            "CONNECT_TIMEOUT_MS",
            "HANDSHAKE_TIMEOUT_MS",
            "HEARTBEAT_INTERVAL_MS",
            "HEARTBEAT_TIMEOUT_MS",
            "MAX_MISSED_PONGS",
            "SLOW_CONNECTION_THRESHOLD",
            "MAX_RECONNECT_ATTEMPTS",
            "BASE_BACKOFF_DELAY_MS",
            "MAX_BACKOFF_DELAY_MS",
            "REQUEST_TIMEOUT_MS",
            "ALLOWED_TYPES",
        ]
        .iter()
        .map(|name| format!("{prefix}_{name}"))
        .collect()
    }
}

/// Builder for `TransportConfig`.
#[derive(Debug, Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Sets the endpoint URL.
    #[must_use]
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint_url = url.into();
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the probe interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval_ms = duration_ms(interval);
        self
    }

    /// Sets the per-probe pong timeout.
    #[must_use]
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.config.heartbeat_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the dead-connection threshold.
    #[must_use]
    pub fn max_missed_pongs(mut self, missed: u32) -> Self {
        self.config.max_missed_pongs = missed;
        self
    }

    /// Sets the slow-connection threshold.
    #[must_use]
    pub fn slow_connection_threshold(mut self, missed: u32) -> Self {
        self.config.slow_connection_threshold = missed;
        self
    }

    /// Sets the maximum automatic reconnect attempts.
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the backoff base and cap.
    #[must_use]
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.base_backoff_delay_ms = duration_ms(base);
        self.config.max_backoff_delay_ms = duration_ms(max);
        self
    }

    /// Sets the manual reconnect delay.
    #[must_use]
    pub fn manual_reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.manual_reconnect_delay_ms = duration_ms(delay);
        self
    }

    /// Sets the default request deadline.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = duration_ms(timeout);
        self
    }

    /// Adds a message type to the allow-list.
    #[must_use]
    pub fn allow_type(mut self, message_type: impl Into<String>) -> Self {
        let message_type = message_type.into();
        if !self.config.allowed_types.contains(&message_type) {
            self.config.allowed_types.push(message_type);
        }
        self
    }

    /// Sets the listener warning threshold.
    #[must_use]
    pub fn listener_warn_threshold(mut self, threshold: usize) -> Self {
        self.config.listener_warn_threshold = threshold;
        self
    }

    /// Sets the inbound frame size limit.
    #[must_use]
    pub fn max_message_bytes(mut self, bytes: usize) -> Self {
        self.config.max_message_bytes = bytes;
        self
    }

    /// Adds a header to the upgrade request.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Builds the `TransportConfig`.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TransportConfig {
        TransportConfig::builder()
            .endpoint_url("wss://example.com/ws")
            .build()
    }

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.heartbeat_interval_ms, 30_000);
        assert_eq!(config.heartbeat_timeout_ms, 10_000);
        assert_eq!(config.max_missed_pongs, 3);
        assert_eq!(config.slow_connection_threshold, 2);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.base_backoff_delay_ms, 1_000);
        assert_eq!(config.max_backoff_delay_ms, 30_000);
        assert!(config.allowed_types.iter().any(|t| t == "session_update"));
    }

    #[test]
    fn test_backoff_monotonic_and_capped() {
        let config = valid();
        let mut previous = Duration::ZERO;
        for attempt in 0..80 {
            let delay = config.backoff_delay(attempt);
            assert!(delay >= previous, "attempt {attempt} decreased");
            assert!(delay <= Duration::from_millis(config.max_backoff_delay_ms));
            previous = delay;
        }
        assert_eq!(config.backoff_delay(4), Duration::from_secs(16));
        assert_eq!(config.backoff_delay(5), Duration::from_secs(30));
        assert_eq!(config.backoff_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_should_reconnect() {
        let config = TransportConfig::builder().max_reconnect_attempts(2).build();
        assert!(config.should_reconnect(0));
        assert!(config.should_reconnect(1));
        assert!(!config.should_reconnect(2));
    }

    #[test]
    fn test_validation() {
        assert!(valid().validate().is_ok());

        assert!(TransportConfig::default().validate().is_err());

        let http = TransportConfig::builder()
            .endpoint_url("https://example.com")
            .build();
        assert!(http.validate().is_err());

        let inverted = TransportConfig::builder()
            .endpoint_url("ws://localhost:8000/ws")
            .slow_connection_threshold(3)
            .max_missed_pongs(3)
            .build();
        let err = inverted.validate().unwrap_err();
        assert!(err.to_string().contains("slow_connection_threshold"));

        let backoff = TransportConfig::builder()
            .endpoint_url("ws://localhost:8000/ws")
            .backoff(Duration::from_secs(10), Duration::from_secs(1))
            .build();
        assert!(backoff.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRADELINK_ENDPOINT_URL", "ws://override:9000/ws"),
            ("TRADELINK_MAX_RECONNECT_ATTEMPTS", "9"),
            ("TRADELINK_ALLOWED_TYPES", "market_data,status"),
        ]);
        let lookup = |name: &str| env.get(name).map(|v| (*v).to_string());

        let mut config = valid();
        config
            .apply_env_overrides_with(ENV_PREFIX, &lookup)
            .unwrap();

        assert_eq!(config.endpoint_url, "ws://override:9000/ws");
        assert_eq!(config.max_reconnect_attempts, 9);
        assert_eq!(config.allowed_types, vec!["market_data", "status"]);
        assert!(
            TransportConfig::env_var_names(ENV_PREFIX)
                .contains(&"TRADELINK_HEARTBEAT_TIMEOUT_MS".to_string())
        );
    }

    #[test]
    fn test_partial_yaml() {
        let config: TransportConfig =
            serde_yaml::from_str("endpoint_url: ws://localhost:8000/ws\nmax_missed_pongs: 5\n")
                .unwrap();
        assert_eq!(config.max_missed_pongs, 5);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
    }

    #[test]
    fn test_builder_allow_type_dedupes() {
        let config = TransportConfig::builder()
            .allow_type("order_update")
            .allow_type("order_update")
            .allow_type("status")
            .build();
        let count = config
            .allowed_types
            .iter()
            .filter(|t| *t == "order_update")
            .count();
        assert_eq!(count, 1);
        assert_eq!(
            config.allowed_types.len(),
            DEFAULT_ALLOWED_TYPES.len() + 1
        );
    }
}

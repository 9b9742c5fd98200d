//! Effective CLI settings: config file, then environment, then flags.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tradelink_core::config::{ConfigLoader, Configurable, EnvLookup, Validatable};
use tradelink_core::error::ConfigError;
use tradelink_telemetry::logging::LogConfig;
use tradelink_transport::TransportConfig;
use tradelink_transport::config::ENV_PREFIX;

/// Everything a config file may set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Duplex connection settings
    pub transport: TransportConfig,
    /// Logging settings
    pub logging: LogConfig,
}

impl Validatable for Settings {
    fn validate(&self) -> Result<(), ConfigError> {
        self.transport.validate()
    }
}

impl Configurable for Settings {
    fn apply_env_overrides_with(
        &mut self,
        prefix: &str,
        lookup: EnvLookup<'_>,
    ) -> Result<(), ConfigError> {
        self.transport.apply_env_overrides_with(prefix, lookup)
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        TransportConfig::env_var_names(prefix)
    }
}

/// Loads settings from the process environment.
pub fn load(path: Option<&Path>, url: Option<&str>) -> Result<Settings, ConfigError> {
    resolve(path, url, &|name| std::env::var(name).ok())
}

/// Loads `path` (or defaults), applies `TRADELINK_*` overrides, then the
/// `--url` flag, and validates.
pub fn resolve(
    path: Option<&Path>,
    url: Option<&str>,
    lookup: EnvLookup<'_>,
) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(path) => ConfigLoader::new().load_file(path)?,
        None => Settings::default(),
    };
    settings.apply_env_overrides_with(ENV_PREFIX, lookup)?;
    if let Some(url) = url {
        settings.transport.endpoint_url = url.to_string();
    }
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn yaml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_values_loaded() {
        let file = yaml_file(
            "transport:\n  endpoint_url: wss://app.example.com/ws\n  max_reconnect_attempts: 9\nlogging:\n  level: debug\n",
        );
        let settings = resolve(Some(file.path()), None, &no_env).unwrap();

        assert_eq!(settings.transport.endpoint_url, "wss://app.example.com/ws");
        assert_eq!(settings.transport.max_reconnect_attempts, 9);
        assert_eq!(settings.transport.heartbeat_interval_ms, 30_000);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_flag_beats_environment() {
        let env: HashMap<&str, &str> = [
            ("TRADELINK_ENDPOINT_URL", "ws://from-env/ws"),
            ("TRADELINK_REQUEST_TIMEOUT_MS", "1500"),
        ]
        .into_iter()
        .collect();
        let lookup = |name: &str| env.get(name).map(ToString::to_string);

        let settings = resolve(None, Some("ws://from-flag/ws"), &lookup).unwrap();
        assert_eq!(settings.transport.endpoint_url, "ws://from-flag/ws");
        assert_eq!(settings.transport.request_timeout_ms, 1_500);

        let settings = resolve(None, None, &lookup).unwrap();
        assert_eq!(settings.transport.endpoint_url, "ws://from-env/ws");
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        assert!(resolve(None, None, &no_env).is_err());
        assert!(resolve(None, Some("http://not-a-socket"), &no_env).is_err());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(resolve(Some(file.path()), Some("ws://x/ws"), &no_env).is_err());
    }
}

//! Logging configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive (e.g., "info", "tradelink_transport=debug")
    #[serde(default = "default_level")]
    pub level: String,

    /// Stdout format
    #[serde(default)]
    pub format: LogFormat,

    /// Output targets
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Include thread IDs in log output
    #[serde(default)]
    pub include_thread_id: bool,

    /// Include file and line information
    #[serde(default)]
    pub include_file_info: bool,

    /// Include span open/close events
    #[serde(default)]
    pub include_span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
            include_span_events: false,
        }
    }
}

impl LogConfig {
    /// Returns a config at `level` with the given stdout format.
    #[must_use]
    pub fn with_level(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
            ..Self::default()
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for log aggregation systems
    #[default]
    Json,
    /// Human-readable multi-line format for development
    Pretty,
    /// Single-line human-readable format
    Compact,
}

/// Log output target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to file with optional rotation
    File {
        /// Directory path for log files
        path: String,
        /// Rotation configuration
        rotation: Option<RotationConfig>,
    },
}

/// Log rotation configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationConfig {
    /// Rotate logs hourly
    Hourly,
    /// Rotate logs daily
    #[default]
    Daily,
    /// Never rotate (single file)
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.outputs.len(), 1);
    }

    #[test]
    fn test_config_serialization() {
        let config = LogConfig {
            level: "tradelink_transport=debug".to_string(),
            format: LogFormat::Compact,
            outputs: vec![
                LogOutput::Stdout,
                LogOutput::File {
                    path: "/var/log/tradelink".to_string(),
                    rotation: Some(RotationConfig::Hourly),
                },
            ],
            include_thread_id: true,
            include_file_info: true,
            include_span_events: false,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: LogConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.level, "tradelink_transport=debug");
        assert_eq!(parsed.format, LogFormat::Compact);
        assert_eq!(parsed.outputs.len(), 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: LogConfig = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(parsed.level, "info");
        assert_eq!(parsed.format, LogFormat::Pretty);
        assert!(matches!(parsed.outputs[0], LogOutput::Stdout));
    }
}

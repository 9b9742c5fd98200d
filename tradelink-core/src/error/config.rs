//! Configuration-related error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error type covering missing fields, invalid values,
/// and file access errors.
///
/// # Examples
///
/// ```
/// use tradelink_core::error::ConfigError;
///
/// let error = ConfigError::MissingField {
///     field: "endpoint_url".to_string(),
///     section: Some("transport".to_string()),
/// };
/// assert!(error.to_string().contains("endpoint_url"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Required configuration field is missing.
    #[error("[Config] Missing field '{field}'{}", section.as_ref().map(|s| format!(" in section '{s}'")).unwrap_or_default())]
    MissingField {
        /// Name of the missing field.
        field: String,
        /// Optional section where the field should be.
        section: Option<String>,
    },

    /// Configuration value is invalid.
    #[error("[Config] Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field with the invalid value.
        field: String,
        /// Reason why the value is invalid.
        reason: String,
    },

    /// Configuration file could not be read.
    #[error("[Config] Failed to read file '{path}': {reason}")]
    FileReadError {
        /// Path to the configuration file.
        path: String,
        /// Reason for the read failure.
        reason: String,
    },

    /// Configuration file format is invalid.
    #[error("[Config] Invalid format in '{path}': {reason}")]
    InvalidFormat {
        /// Path to the configuration file.
        path: String,
        /// Reason for the format error.
        reason: String,
    },

    /// Environment variable has invalid value.
    #[error("[Config] Invalid environment variable '{name}': {reason}")]
    InvalidEnvVar {
        /// Name of the environment variable.
        name: String,
        /// Reason why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::MissingField { .. } | Self::InvalidFormat { .. } => ErrorSeverity::Fatal,
            Self::InvalidValue { .. } | Self::FileReadError { .. } | Self::InvalidEnvVar { .. } => {
                ErrorSeverity::Warning
            }
        }
    }

    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            section: None,
        }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field() {
        let error = ConfigError::missing_field("endpoint_url");
        assert!(error.to_string().contains("endpoint_url"));
        assert!(!error.to_string().contains("section"));
    }

    #[test]
    fn test_missing_field_with_section() {
        let error = ConfigError::MissingField {
            field: "base_url".to_string(),
            section: Some("rest".to_string()),
        };
        assert!(error.to_string().contains("base_url"));
        assert!(error.to_string().contains("rest"));
    }

    #[test]
    fn test_invalid_value() {
        let error = ConfigError::invalid_value(
            "slow_connection_threshold",
            "must be less than max_missed_pongs",
        );
        assert!(error.to_string().contains("slow_connection_threshold"));
        assert!(!error.severity().is_fatal());
    }
}

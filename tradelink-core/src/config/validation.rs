//! Configuration validation utilities.

use super::traits::EnvLookup;
use crate::error::ConfigError;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Collects validation errors for one configuration section.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    section: Option<String>,
    errors: Vec<ConfigError>,
}

impl Validator {
    /// Creates a validator for the top-level section.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator whose field names are prefixed with `section`.
    #[must_use]
    pub fn for_section(section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            errors: Vec::new(),
        }
    }

    fn field_name(&self, field: &str) -> String {
        match &self.section {
            Some(section) => format!("{section}.{field}"),
            None => field.to_string(),
        }
    }

    /// Validates that a string field is not empty.
    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(ConfigError::MissingField {
                field: field.to_string(),
                section: self.section.clone(),
            });
        }
        self
    }

    /// Validates that a numeric value is positive.
    pub fn positive<T: PartialOrd + Default + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
    ) -> &mut Self {
        if *value <= T::default() {
            self.errors.push(ConfigError::invalid_value(
                self.field_name(field),
                format!("Value {value} must be positive"),
            ));
        }
        self
    }

    /// Validates using a custom predicate.
    pub fn custom<F>(&mut self, field: &str, predicate: F, error_msg: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.errors
                .push(ConfigError::invalid_value(self.field_name(field), error_msg));
        }
        self
    }

    /// Validates that a URL uses one of the given schemes.
    pub fn url_with_scheme(&mut self, field: &str, value: &str, schemes: &[&str]) -> &mut Self {
        let ok = schemes
            .iter()
            .any(|scheme| value.starts_with(&format!("{scheme}://")));
        if !value.is_empty() && !ok {
            self.errors.push(ConfigError::invalid_value(
                self.field_name(field),
                format!("Must be a URL with scheme {}", schemes.join(" or ")),
            ));
        }
        self
    }

    /// Returns all collected errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Returns the first error, if any.
    pub fn result(&self) -> ValidationResult {
        self.errors.first().cloned().map_or(Ok(()), Err)
    }
}

/// Environment variable helper for applying overrides.
///
/// ```rust
/// use tradelink_core::config::EnvOverride;
///
/// let lookup = |name: &str| (name == "APP_RETRIES").then(|| "4".to_string());
/// let mut retries = 1u32;
/// EnvOverride::apply_number(&lookup, "APP_RETRIES", &mut retries).unwrap();
/// assert_eq!(retries, 4);
/// ```
pub struct EnvOverride;

impl EnvOverride {
    /// Applies an override to a string value.
    pub fn apply_string(lookup: EnvLookup<'_>, var_name: &str, target: &mut String) {
        if let Some(value) = lookup(var_name) {
            *target = value;
        }
    }

    /// Applies an override to a numeric value.
    pub fn apply_number<T: std::str::FromStr>(
        lookup: EnvLookup<'_>,
        var_name: &str,
        target: &mut T,
    ) -> ValidationResult {
        if let Some(value) = lookup(var_name) {
            *target = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar {
                    name: var_name.to_string(),
                    reason: format!("'{value}' is not a valid number"),
                })?;
        }
        Ok(())
    }

    /// Applies an override to a comma-separated list.
    pub fn apply_list(lookup: EnvLookup<'_>, var_name: &str, target: &mut Vec<String>) {
        if let Some(value) = lookup(var_name) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_collects_errors() {
        let mut validator = Validator::for_section("transport");
        validator
            .require_non_empty("endpoint_url", "")
            .positive("heartbeat_interval_ms", &0u64);

        assert_eq!(validator.errors().len(), 2);
        let first = validator.result().unwrap_err();
        assert!(matches!(first, ConfigError::MissingField { .. }));
        assert!(
            validator.errors()[1]
                .to_string()
                .contains("transport.heartbeat_interval_ms")
        );
    }

    #[test]
    fn test_url_scheme() {
        let mut validator = Validator::new();
        validator.url_with_scheme("url", "wss://example.com/ws", &["ws", "wss"]);
        assert!(validator.result().is_ok());

        let mut validator = Validator::new();
        validator.url_with_scheme("url", "https://example.com", &["ws", "wss"]);
        assert!(validator.result().is_err());
    }

    #[test]
    fn test_env_override_number_rejects_garbage() {
        let lookup = |_: &str| Some("many".to_string());
        let mut value = 3u32;
        let err = EnvOverride::apply_number(&lookup, "X_RETRIES", &mut value).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
        assert_eq!(value, 3);
    }

    #[test]
    fn test_env_override_list() {
        let lookup = |_: &str| Some("status, pong ,,market_data".to_string());
        let mut list = Vec::new();
        EnvOverride::apply_list(&lookup, "X_TYPES", &mut list);
        assert_eq!(list, vec!["status", "pong", "market_data"]);
    }

    #[test]
    fn test_env_override_absent_keeps_value() {
        let lookup = |_: &str| None;
        let mut value = "wss://a".to_string();
        EnvOverride::apply_string(&lookup, "X_URL", &mut value);
        assert_eq!(value, "wss://a");
    }
}

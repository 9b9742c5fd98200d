//! Configuration traits for validation and loading.

use crate::error::ConfigError;

/// Looks up an environment variable by name.
///
/// Production code passes `std::env::var`; tests pass a map lookup so they
/// never mutate the process environment.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Trait for types that can be validated.
///
/// # Example
///
/// ```rust
/// use tradelink_core::config::Validatable;
/// use tradelink_core::error::ConfigError;
///
/// struct ProbeConfig {
///     interval_ms: u64,
/// }
///
/// impl Validatable for ProbeConfig {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.interval_ms == 0 {
///             return Err(ConfigError::invalid_value("interval_ms", "must be positive"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for types that support environment variable overrides.
pub trait Configurable: Sized {
    /// Applies overrides resolved through `lookup`.
    ///
    /// Variables are named `{prefix}_{FIELD}` in upper snake case.
    fn apply_env_overrides_with(
        &mut self,
        prefix: &str,
        lookup: EnvLookup<'_>,
    ) -> Result<(), ConfigError>;

    /// Applies overrides from the process environment.
    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.apply_env_overrides_with(prefix, &|name| std::env::var(name).ok())
    }

    /// Returns the environment variable names that can override this configuration.
    fn env_var_names(prefix: &str) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestConfig {
        value: i32,
    }

    impl Validatable for TestConfig {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.value < 0 {
                return Err(ConfigError::invalid_value(
                    "value",
                    "Value must be non-negative",
                ));
            }
            Ok(())
        }
    }

    impl Configurable for TestConfig {
        fn apply_env_overrides_with(
            &mut self,
            prefix: &str,
            lookup: EnvLookup<'_>,
        ) -> Result<(), ConfigError> {
            if let Some(raw) = lookup(&format!("{prefix}_VALUE")) {
                self.value = raw.parse().map_err(|_| ConfigError::InvalidEnvVar {
                    name: format!("{prefix}_VALUE"),
                    reason: "not an integer".to_string(),
                })?;
            }
            Ok(())
        }

        fn env_var_names(prefix: &str) -> Vec<String> {
            vec![format!("{prefix}_VALUE")]
        }
    }

    #[test]
    fn test_validatable() {
        assert!(TestConfig { value: 10 }.validate().is_ok());
        let err = TestConfig { value: -1 }.validate().unwrap_err();
        assert!(err.to_string().contains("value"));
    }

    #[test]
    fn test_configurable_with_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([("APP_VALUE", "7")]);
        let lookup = |name: &str| env.get(name).map(|v| (*v).to_string());

        let mut config = TestConfig { value: 1 };
        config.apply_env_overrides_with("APP", &lookup).unwrap();
        assert_eq!(config.value, 7);
        assert_eq!(TestConfig::env_var_names("APP"), vec!["APP_VALUE"]);
    }
}

//! Configuration loader supporting YAML, TOML and JSON formats.

use super::traits::{Configurable, Validatable};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }
}

/// Configuration loader with environment overrides and validation.
///
/// ```rust,ignore
/// use tradelink_core::config::ConfigLoader;
/// use tradelink_transport::TransportConfig;
///
/// let config: TransportConfig = ConfigLoader::new()
///     .with_env_prefix("TRADELINK")
///     .load_validated("tradelink.yaml")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment variable prefix for overrides.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Returns the environment variable prefix, if set.
    #[must_use]
    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Loads configuration from a file, detecting the format from its extension.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason: "Unrecognized file extension. Supported: .yaml, .yml, .toml, .json".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.load_str(&content, format)
    }

    /// Loads configuration from a string with the specified format.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let config: T = match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: format!("YAML parse error: {e}"),
                })?
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: format!("TOML parse error: {e}"),
                })?
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: format!("JSON parse error: {e}"),
                })?
            }
        };

        Ok(config)
    }

    /// Applies environment overrides (when a prefix is set) and validates.
    pub fn finish<T>(&self, mut config: T) -> Result<T, ConfigError>
    where
        T: Configurable + Validatable,
    {
        if let Some(prefix) = &self.env_prefix {
            config.apply_env_overrides(prefix)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads a file, applies environment overrides, and validates the result.
    pub fn load_validated<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Configurable + Validatable,
        P: AsRef<Path>,
    {
        let config = self.load_file(path)?;
        self.finish(config)
    }

    /// Serializes a configuration to a string in the specified format.
    pub fn serialize<T>(config: &T, format: ConfigFormat) -> Result<String, ConfigError>
    where
        T: serde::Serialize,
    {
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::to_string(config).map_err(|e| ConfigError::InvalidFormat {
                    path: "<serialize>".to_string(),
                    reason: format!("YAML serialization error: {e}"),
                })
            }
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidFormat {
                    path: "<serialize>".to_string(),
                    reason: format!("TOML serialization error: {e}"),
                })
            }
            ConfigFormat::Json => {
                serde_json::to_string_pretty(config).map_err(|e| ConfigError::InvalidFormat {
                    path: "<serialize>".to_string(),
                    reason: format!("JSON serialization error: {e}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvLookup;
    use serde::{Deserialize, Serialize};
    use std::io::Write;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestConfig {
        url: String,
        #[serde(default)]
        retries: u32,
    }

    impl Validatable for TestConfig {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.url.is_empty() {
                return Err(ConfigError::missing_field("url"));
            }
            Ok(())
        }
    }

    impl Configurable for TestConfig {
        fn apply_env_overrides_with(
            &mut self,
            _prefix: &str,
            _lookup: EnvLookup<'_>,
        ) -> Result<(), ConfigError> {
            Ok(())
        }

        fn env_var_names(_prefix: &str) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("tradelink.yml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("tradelink.TOML")),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("tradelink.json")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("tradelink.ini")), None);
    }

    #[test]
    fn test_load_each_format() {
        let loader = ConfigLoader::new();

        let yaml: TestConfig = loader
            .load_str("url: wss://a\nretries: 2\n", ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(yaml.retries, 2);

        let toml: TestConfig = loader
            .load_str("url = \"wss://a\"\n", ConfigFormat::Toml)
            .unwrap();
        assert_eq!(toml.url, "wss://a");

        let json: TestConfig = loader
            .load_str(r#"{"url":"wss://a","retries":9}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(json.retries, 9);
    }

    #[test]
    fn test_invalid_yaml() {
        let result: Result<TestConfig, _> =
            ConfigLoader::new().load_str("url: [broken", ConfigFormat::Yaml);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_load_validated_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"url": ""}}"#).unwrap();

        let result: Result<TestConfig, _> = ConfigLoader::new().load_validated(file.path());
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result: Result<TestConfig, _> =
            ConfigLoader::new().load_file("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }

    #[test]
    fn test_serialize_toml() {
        let config = TestConfig {
            url: "wss://example.com".to_string(),
            retries: 3,
        };
        let toml = ConfigLoader::serialize(&config, ConfigFormat::Toml).unwrap();
        assert!(toml.contains("retries = 3"));
    }
}

//! Configuration management module.
//!
//! This module provides:
//! - YAML, TOML and JSON configuration file loading
//! - Validation with descriptive error messages
//! - Environment variable overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use tradelink_core::config::{ConfigLoader, ConfigFormat};
//!
//! let config: MyConfig = ConfigLoader::new()
//!     .with_env_prefix("TRADELINK")
//!     .load_validated("tradelink.yaml")?;
//! ```

mod loader;
mod traits;
pub mod validation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use traits::{Configurable, EnvLookup, Validatable};
pub use validation::{EnvOverride, ValidationResult, Validator};

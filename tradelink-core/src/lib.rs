//! # Tradelink Core
//!
//! Shared building blocks for the Tradelink real-time transport client.
//!
//! This crate provides:
//! - Error types and severity classification for the transport, request,
//!   credential and configuration domains
//! - Configuration loading (YAML/TOML/JSON) with validation and environment
//!   variable overrides
//! - `NewType` wrappers for wire identifiers (`Topic`, `RequestId`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Wire identifier types
pub mod types;

/// Error types and handling
pub mod error;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{
        AuthError, ConfigError, ErrorSeverity, NetworkError, RequestError, TradelinkError,
    };
    pub use crate::types::*;
}

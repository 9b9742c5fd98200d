//! # Tradelink Telemetry
//!
//! Logging and tracing support for the Tradelink transport client.
//!
//! This crate provides:
//! - Structured logging with JSON and pretty formats
//! - Rolling file output
//! - Sensitive data masking for raw wire frames
//! - Span constructors for connection, request and REST tracing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Sensitive data masking
pub mod masking;

/// Span definitions for tracing
pub mod spans;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, init_logging};
    pub use crate::masking::{Sensitive, SensitiveDataMasker};
    pub use crate::spans::*;
}

//! Error types and handling framework.
//!
//! Errors are grouped by the domain in which they arise:
//! - `TradelinkError` - Top-level error type
//!   - `NetworkError` - Connection lifecycle, handshake and liveness failures
//!   - `RequestError` - Failures scoped to one correlated request
//!   - `AuthError` - Credential and anti-forgery token failures
//!   - `ConfigError` - Configuration loading and validation errors
//!
//! Connection-level failures are recorded centrally by the connection
//! manager; call-scoped failures are returned to the specific caller.
//!
//! ```
//! use tradelink_core::error::{NetworkError, TradelinkError};
//!
//! let error = TradelinkError::from(NetworkError::HandshakeRejected {
//!     reason: "unauthorized".to_string(),
//! });
//! assert!(error.severity().is_fatal());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// - `Fatal`: requires caller action (re-authentication, explicit reconnect)
/// - `Recoverable`: retried automatically or safe to retry
/// - `Warning`: logged, operation degraded
/// - `Info`: expected condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable without caller intervention.
    Fatal,

    /// Can be recovered from through retry.
    #[default]
    Recoverable,

    /// Non-critical issue.
    Warning,

    /// Informational.
    Info,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal (unrecoverable).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

mod auth;
mod config;
mod network;
mod request;

pub use auth::AuthError;
pub use config::ConfigError;
pub use network::NetworkError;
pub use request::RequestError;

/// Top-level error type for Tradelink.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradelinkError {
    /// Connection-level error.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Request-scoped error.
    #[error("{0}")]
    Request(#[from] RequestError),

    /// Credential or token error.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl TradelinkError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(e) => e.severity(),
            Self::Request(e) => e.severity(),
            Self::Auth(e) => e.severity(),
            Self::Config(e) => e.severity(),
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Request(_) => "request",
            Self::Auth(_) => "auth",
            Self::Config(_) => "config",
        }
    }

    /// Returns the inner network error, if this is a network error.
    #[must_use]
    pub fn as_network_error(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the inner request error, if this is a request error.
    #[must_use]
    pub fn as_request_error(&self) -> Option<&RequestError> {
        match self {
            Self::Request(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized Result type for Tradelink operations.
pub type Result<T> = std::result::Result<T, TradelinkError>;

//! Connection-level error types.
//!
//! Covers the transport lifecycle: connect failures and timeouts, abnormal
//! closes, handshake rejection, liveness failure and reconnect exhaustion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network error type for the duplex connection and the REST channel.
///
/// # Examples
///
/// ```
/// use tradelink_core::error::NetworkError;
///
/// let error = NetworkError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// assert!(error.is_recoverable());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection to the remote endpoint failed.
    #[error("[Network] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connection attempt timed out.
    #[error("[Network] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// WebSocket protocol error.
    #[error("[Network] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// HTTP request failed.
    #[error("[Network] HTTP error: status {status_code} - {reason}")]
    Http {
        /// HTTP status code.
        status_code: u16,
        /// Reason for the HTTP error.
        reason: String,
    },

    /// Connection was closed.
    #[error("[Network] Connection closed{}: {reason}", code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    ConnectionClosed {
        /// Close code, when the transport reported one.
        code: Option<u16>,
        /// Reason for the closure.
        reason: String,
    },

    /// The remote side answered the handshake negatively.
    #[error("[Network] Handshake rejected: {reason}")]
    HandshakeRejected {
        /// Reason given by the remote side.
        reason: String,
    },

    /// No handshake acknowledgment arrived in time.
    #[error("[Network] Handshake timeout after {timeout_ms}ms")]
    HandshakeTimeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Too many consecutive liveness probes went unanswered.
    #[error("[Network] Liveness failure: {missed} probes unanswered")]
    LivenessFailure {
        /// Number of unanswered probes.
        missed: u32,
    },

    /// Automatic reconnection gave up.
    #[error("[Network] Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl NetworkError {
    /// Returns true if the connection manager may retry after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::ConnectionClosed { .. }
                | Self::WebSocket { .. }
                | Self::HandshakeTimeout { .. }
                | Self::LivenessFailure { .. }
        )
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::HandshakeRejected { .. } | Self::ReconnectExhausted { .. } => {
                ErrorSeverity::Fatal
            }
            Self::Timeout { .. }
            | Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::WebSocket { .. }
            | Self::HandshakeTimeout { .. }
            | Self::LivenessFailure { .. } => ErrorSeverity::Recoverable,
            Self::Http { status_code, .. } if *status_code >= 500 => ErrorSeverity::Recoverable,
            Self::Http { .. } => ErrorSeverity::Warning,
        }
    }

    /// Returns true if this is an HTTP 401 response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status_code: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed() {
        let error = NetworkError::ConnectionFailed {
            reason: "Connection refused".to_string(),
        };
        assert!(error.to_string().contains("Connection refused"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_connection_closed_display() {
        let with_code = NetworkError::ConnectionClosed {
            code: Some(4001),
            reason: "liveness".to_string(),
        };
        assert!(with_code.to_string().contains("code 4001"));

        let without_code = NetworkError::ConnectionClosed {
            code: None,
            reason: "stream ended".to_string(),
        };
        assert!(!without_code.to_string().contains("code"));
    }

    #[test]
    fn test_fatal_variants() {
        let rejected = NetworkError::HandshakeRejected {
            reason: "unauthorized".to_string(),
        };
        assert!(!rejected.is_recoverable());
        assert!(rejected.severity().is_fatal());

        let exhausted = NetworkError::ReconnectExhausted { attempts: 5 };
        assert!(!exhausted.is_recoverable());
        assert!(exhausted.to_string().contains('5'));
    }

    #[test]
    fn test_liveness_is_transient() {
        let error = NetworkError::LivenessFailure { missed: 3 };
        assert!(error.is_recoverable());
        assert!(!error.severity().is_fatal());
    }

    #[test]
    fn test_http_severity() {
        let server = NetworkError::Http {
            status_code: 503,
            reason: "unavailable".to_string(),
        };
        assert!(server.severity().is_recoverable());

        let unauthorized = NetworkError::Http {
            status_code: 401,
            reason: "expired".to_string(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!server.is_unauthorized());
    }
}

//! Request-scoped error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error delivered to the caller of one correlated request.
///
/// None of these affect the connection; they reject only the request they
/// belong to.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestError {
    /// No authenticated connection to send on.
    #[error("[Request] Not connected")]
    NotConnected,

    /// No response arrived before the deadline.
    #[error("[Request] Request {id} timed out after {timeout_ms}ms")]
    Timeout {
        /// Correlation id of the request.
        id: String,
        /// Deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The connection was torn down while the request was outstanding.
    #[error("[Request] Request {id} cancelled: {reason}")]
    Cancelled {
        /// Correlation id of the request.
        id: String,
        /// Why the request was cancelled.
        reason: String,
    },

    /// The remote side answered with an error-typed response.
    #[error("[Request] Remote error for {id}: {message}")]
    Remote {
        /// Correlation id of the request.
        id: String,
        /// Error message from the remote side.
        message: String,
    },

    /// A request with the same id is already outstanding.
    #[error("[Request] Duplicate request id: {id}")]
    DuplicateId {
        /// The conflicting id.
        id: String,
    },

    /// The message could not be encoded.
    #[error("[Request] Serialization failed: {reason}")]
    Serialization {
        /// Reason for the failure.
        reason: String,
    },

    /// The caller passed an unusable argument.
    #[error("[Request] Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// The transport client has been disposed.
    #[error("[Request] Transport client is shut down")]
    Shutdown,
}

impl RequestError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::NotConnected | Self::Timeout { .. } | Self::Cancelled { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::Remote { .. } | Self::DuplicateId { .. } | Self::InvalidInput { .. } => {
                ErrorSeverity::Warning
            }
            Self::Serialization { .. } | Self::Shutdown => ErrorSeverity::Fatal,
        }
    }

    /// Returns the correlation id this error belongs to, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Timeout { id, .. }
            | Self::Cancelled { id, .. }
            | Self::Remote { id, .. }
            | Self::DuplicateId { id } => Some(id),
            _ => None,
        }
    }

    /// Returns true if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if this is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout() {
        let error = RequestError::Timeout {
            id: "req_7".to_string(),
            timeout_ms: 50,
        };
        assert!(error.is_timeout());
        assert_eq!(error.request_id(), Some("req_7"));
        assert!(error.to_string().contains("50ms"));
    }

    #[test]
    fn test_cancelled() {
        let error = RequestError::Cancelled {
            id: "req_1".to_string(),
            reason: "connection closed".to_string(),
        };
        assert!(error.is_cancelled());
        assert!(error.severity().is_recoverable());
    }

    #[test]
    fn test_no_id_variants() {
        assert_eq!(RequestError::NotConnected.request_id(), None);
        assert!(RequestError::Shutdown.severity().is_fatal());
    }
}

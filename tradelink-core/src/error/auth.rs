//! Credential and anti-forgery token errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the credential coordinator or the token service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// The session is no longer valid.
    #[error("[Auth] Session expired")]
    SessionExpired,

    /// Refreshing the session failed; local auth state has been cleared.
    #[error("[Auth] Session refresh failed: {reason}")]
    RefreshFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Login was refused.
    #[error("[Auth] Login failed: {reason}")]
    LoginFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// No anti-forgery token could be obtained.
    #[error("[Auth] CSRF token unavailable: {reason}")]
    CsrfUnavailable {
        /// Reason for the failure.
        reason: String,
    },
}

impl AuthError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::SessionExpired | Self::RefreshFailed { .. } | Self::LoginFailed { .. } => {
                ErrorSeverity::Fatal
            }
            Self::CsrfUnavailable { .. } => ErrorSeverity::Recoverable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = AuthError::RefreshFailed {
            reason: "401 from /auth/refresh".to_string(),
        };
        assert!(error.to_string().starts_with("[Auth]"));
        assert!(error.severity().is_fatal());
    }

    #[test]
    fn test_csrf_is_recoverable() {
        let error = AuthError::CsrfUnavailable {
            reason: "timeout".to_string(),
        };
        assert!(error.severity().is_recoverable());
    }
}

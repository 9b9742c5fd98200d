//! Correlation identifiers for request-style messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ValidationError;

/// Request id - matches an inbound response to the request that caused it.
///
/// # Examples
///
/// ```
/// use tradelink_core::types::RequestId;
///
/// let id = RequestId::new("req_7").unwrap();
/// assert_eq!(id.as_str(), "req_7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new `RequestId`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyRequestId` if the value is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyRequestId);
        }
        Ok(Self(s))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Issues `req_<n>` ids from a monotonically increasing counter.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator whose first id is `req_1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the next id.
    pub fn next_id(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        RequestId(format!("req_{n}"))
    }

    /// Returns the process-wide generator.
    pub fn global() -> &'static Self {
        static GLOBAL: RequestIdGenerator = RequestIdGenerator::new();
        &GLOBAL
    }
}

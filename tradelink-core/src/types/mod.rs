//! `NewType` wrappers for wire identifiers.
//!
//! # Types
//!
//! - [`Topic`] - Logical subscription topic
//! - [`RequestId`] - Correlation id attached to request-style messages

mod request_id;
mod topic;

pub use request_id::{RequestId, RequestIdGenerator};
pub use topic::Topic;

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Topic is empty or whitespace only
    #[error("topic cannot be empty")]
    EmptyTopic,

    /// Request id is empty
    #[error("request id cannot be empty")]
    EmptyRequestId,
}

//! Link frame types and close codes.

use serde::{Deserialize, Serialize};

/// Close code sent when the client deliberately disconnects.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code sent when the liveness monitor declares the connection dead.
pub const CLOSE_LIVENESS_FAILURE: u16 = 4001;
/// Close code sent when no handshake acknowledgment arrived in time.
pub const CLOSE_HANDSHAKE_TIMEOUT: u16 = 4002;
/// Close code sent (or received) when the handshake was refused.
pub const CLOSE_HANDSHAKE_REJECTED: u16 = 4003;

/// Frames exchanged over a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebSocketMessage {
    /// Text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
    /// Ping frame.
    Ping(Vec<u8>),
    /// Pong frame.
    Pong(Vec<u8>),
    /// Close frame.
    Close(Option<CloseReason>),
}

/// Close frame reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReason {
    /// Close code.
    pub code: u16,
    /// Close reason text.
    pub reason: String,
}

impl CloseReason {
    /// Creates a close reason.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// How the connection manager treats a close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseClass {
    /// Normal closure; never reconnects.
    Normal,
    /// Handshake refused; never reconnects.
    Rejected,
    /// Anything else; eligible for reconnect.
    Abnormal,
}

impl CloseClass {
    /// Classifies an optional close code.
    #[must_use]
    pub fn of(code: Option<u16>) -> Self {
        match code {
            Some(CLOSE_NORMAL) => Self::Normal,
            Some(CLOSE_HANDSHAKE_REJECTED) => Self::Rejected,
            _ => Self::Abnormal,
        }
    }
}

impl WebSocketMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Creates a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::Binary(data.into())
    }

    /// Creates a close message.
    #[must_use]
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self::Close(Some(CloseReason::new(code, reason)))
    }

    /// Returns true if this is a close message.
    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }

    /// Returns the close code if this is a close frame carrying one.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::Close(Some(reason)) => Some(reason.code),
            _ => None,
        }
    }

    /// Returns the text content if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) | Self::Ping(b) | Self::Pong(b) => b.len(),
            Self::Close(reason) => reason.as_ref().map_or(0, |r| r.reason.len()),
        }
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_classes() {
        assert_eq!(CloseClass::of(Some(CLOSE_NORMAL)), CloseClass::Normal);
        assert_eq!(
            CloseClass::of(Some(CLOSE_HANDSHAKE_REJECTED)),
            CloseClass::Rejected
        );
        assert_eq!(
            CloseClass::of(Some(CLOSE_LIVENESS_FAILURE)),
            CloseClass::Abnormal
        );
        assert_eq!(CloseClass::of(Some(1006)), CloseClass::Abnormal);
        assert_eq!(CloseClass::of(None), CloseClass::Abnormal);
    }

    #[test]
    fn test_message_accessors() {
        let text = WebSocketMessage::text("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.len(), 5);

        let close = WebSocketMessage::close(CLOSE_LIVENESS_FAILURE, "dead");
        assert!(close.is_close());
        assert_eq!(close.close_code(), Some(4001));
        assert_eq!(WebSocketMessage::Close(None).close_code(), None);

        assert!(WebSocketMessage::binary(Vec::new()).is_empty());
    }
}

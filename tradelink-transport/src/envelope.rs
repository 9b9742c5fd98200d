//! Wire envelope shared by both directions of the duplex link.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tradelink_core::error::RequestError;
use tradelink_core::types::Topic;

/// `status` values that refuse a handshake.
const REJECTION_STATUSES: &[&str] = &["unauthorized", "rejected", "auth_failed"];

/// One JSON message on the duplex link.
///
/// Known fields are lifted out; everything else a message type carries lands
/// in `extra` and is written back unchanged.
///
/// ```
/// use tradelink_transport::Envelope;
///
/// let envelope = Envelope::parse(r#"{"type":"status","status":"pong"}"#).unwrap();
/// assert!(envelope.is_pong());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type; selects the classification path.
    #[serde(rename = "type", default)]
    pub message_type: String,

    /// Topic the message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    /// Payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Remote session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Correlation id on request-style messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Status word on `status` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Type-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of inspecting a message for a handshake answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAck {
    /// `{type:"status", status:"connected"}`.
    Accepted,
    /// Negative acknowledgment with the reason given.
    Rejected(String),
}

impl Envelope {
    /// Creates an envelope of the given type.
    #[must_use]
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            ..Self::default()
        }
    }

    /// Handshake message carrying a session token.
    #[must_use]
    pub fn auth(token: impl Into<String>) -> Self {
        let mut envelope = Self::new("auth");
        envelope
            .extra
            .insert("token".to_string(), Value::String(token.into()));
        envelope
    }

    /// Handshake message for an anonymous session.
    #[must_use]
    pub fn hello() -> Self {
        Self::new("hello").stamped()
    }

    /// Liveness probe.
    #[must_use]
    pub fn ping() -> Self {
        Self::new("ping").stamped()
    }

    /// Subscribe request for `topic`.
    #[must_use]
    pub fn subscribe(topic: &Topic, params: Value) -> Self {
        let mut envelope = Self::new("subscribe").with_stream(topic.as_str());
        if !params.is_null() {
            envelope.data = Some(params);
        }
        envelope
    }

    /// Unsubscribe request for `topic`.
    #[must_use]
    pub fn unsubscribe(topic: &Topic) -> Self {
        Self::new("unsubscribe").with_stream(topic.as_str())
    }

    /// Fire-and-forget remote command.
    #[must_use]
    pub fn command(name: impl Into<String>, data: Value) -> Self {
        let mut envelope = Self::new("command").stamped();
        envelope
            .extra
            .insert("command".to_string(), Value::String(name.into()));
        if !data.is_null() {
            envelope.data = Some(data);
        }
        envelope
    }

    /// Sets the stream.
    #[must_use]
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the status word.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets an extra field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Stamps the current time.
    #[must_use]
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(Utc::now().to_rfc3339());
        self
    }

    /// Parses one text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes the envelope as a text frame.
    pub fn to_json(&self) -> Result<String, RequestError> {
        serde_json::to_string(self).map_err(|e| RequestError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Returns the topic the message is scoped to, if any.
    ///
    /// The top-level `stream` wins; `data` messages may carry it nested
    /// as `data.stream` instead.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        let non_blank = |s: &&str| !s.trim().is_empty();
        self.stream.as_deref().filter(non_blank).or_else(|| {
            if self.message_type != "data" {
                return None;
            }
            self.data
                .as_ref()
                .and_then(|data| data.get("stream"))
                .and_then(Value::as_str)
                .filter(non_blank)
        })
    }

    /// Returns true for a liveness response.
    #[must_use]
    pub fn is_pong(&self) -> bool {
        self.message_type == "pong"
            || (self.message_type == "status" && self.status.as_deref() == Some("pong"))
    }

    /// Inspects the message for a handshake answer.
    #[must_use]
    pub fn handshake_ack(&self) -> Option<HandshakeAck> {
        if self.message_type == "auth_error" {
            return Some(HandshakeAck::Rejected(
                self.error_message()
                    .unwrap_or_else(|| "authentication refused".to_string()),
            ));
        }
        if self.message_type != "status" {
            return None;
        }
        match self.status.as_deref() {
            Some("connected") => Some(HandshakeAck::Accepted),
            Some(status) if REJECTION_STATUSES.contains(&status) => Some(HandshakeAck::Rejected(
                self.error_message().unwrap_or_else(|| status.to_string()),
            )),
            _ => None,
        }
    }

    /// Returns true if this response reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.message_type == "error"
            || self.message_type.ends_with("_error")
            || self.status.as_deref() == Some("error")
    }

    /// Best-effort human-readable error text.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        ["message", "error", "reason"]
            .iter()
            .find_map(|key| self.extra.get(*key).and_then(Value::as_str))
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
            })
            .map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_unknown_fields() {
        let envelope = Envelope::parse(
            r#"{"type":"market_data","stream":"BTCUSDT","data":{"p":1},"seq":42}"#,
        )
        .unwrap();
        assert_eq!(envelope.message_type, "market_data");
        assert_eq!(envelope.topic(), Some("BTCUSDT"));
        assert_eq!(envelope.extra.get("seq"), Some(&json!(42)));

        let back: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(back["seq"], json!(42));
        assert_eq!(back["type"], json!("market_data"));
        assert!(back.get("id").is_none());
    }

    #[test]
    fn test_missing_type_defaults_to_empty() {
        let envelope = Envelope::parse(r#"{"id":"req_3"}"#).unwrap();
        assert_eq!(envelope.message_type, "");
        assert_eq!(envelope.id.as_deref(), Some("req_3"));
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(Envelope::parse("{not json").is_err());
        assert!(Envelope::parse("[1,2]").is_err());
    }

    #[test]
    fn test_blank_stream_is_not_a_topic() {
        let envelope = Envelope::new("data").with_stream("  ");
        assert_eq!(envelope.topic(), None);
    }

    #[test]
    fn test_nested_stream_is_topic_for_data() {
        let nested = Envelope::new("data").with_data(json!({"stream": "ETHUSDT", "p": 1}));
        assert_eq!(nested.topic(), Some("ETHUSDT"));

        let both = Envelope::new("data")
            .with_stream("BTCUSDT")
            .with_data(json!({"stream": "ETHUSDT"}));
        assert_eq!(both.topic(), Some("BTCUSDT"));

        let other = Envelope::new("market_data").with_data(json!({"stream": "ETHUSDT"}));
        assert_eq!(other.topic(), None);
    }

    #[test]
    fn test_pong_forms() {
        assert!(Envelope::new("pong").is_pong());
        assert!(Envelope::new("status").with_status("pong").is_pong());
        assert!(!Envelope::new("status").with_status("connected").is_pong());
    }

    #[test]
    fn test_handshake_ack() {
        let ok = Envelope::new("status").with_status("connected");
        assert_eq!(ok.handshake_ack(), Some(HandshakeAck::Accepted));

        let refused = Envelope::new("status")
            .with_status("unauthorized")
            .with_field("message", json!("token expired"));
        assert_eq!(
            refused.handshake_ack(),
            Some(HandshakeAck::Rejected("token expired".to_string()))
        );

        let auth_error = Envelope::new("auth_error");
        assert!(matches!(
            auth_error.handshake_ack(),
            Some(HandshakeAck::Rejected(_))
        ));

        assert_eq!(Envelope::new("market_data").handshake_ack(), None);
        assert_eq!(Envelope::new("status").with_status("pong").handshake_ack(), None);
    }

    #[test]
    fn test_outbound_shapes() {
        let topic = Topic::new("BTCUSDT").unwrap();
        let subscribe: Value =
            serde_json::to_value(Envelope::subscribe(&topic, json!({"depth": 5}))).unwrap();
        assert_eq!(
            subscribe,
            json!({"type": "subscribe", "stream": "BTCUSDT", "data": {"depth": 5}})
        );

        let bare: Value = serde_json::to_value(Envelope::subscribe(&topic, Value::Null)).unwrap();
        assert!(bare.get("data").is_none());

        let auth: Value = serde_json::to_value(Envelope::auth("tok")).unwrap();
        assert_eq!(auth, json!({"type": "auth", "token": "tok"}));

        let command = Envelope::command("pause_strategy", json!({"id": 7}));
        assert_eq!(command.extra["command"], json!("pause_strategy"));
        assert!(command.timestamp.is_some());
    }

    #[test]
    fn test_error_detection() {
        let err = Envelope::new("error").with_field("error", json!("bad strategy"));
        assert!(err.is_error());
        assert_eq!(err.error_message().as_deref(), Some("bad strategy"));

        let nested = Envelope::new("command_error").with_data(json!({"message": "denied"}));
        assert!(nested.is_error());
        assert_eq!(nested.error_message().as_deref(), Some("denied"));

        assert!(!Envelope::new("data").is_error());
    }
}

//! Topic type for subscription identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Topic - the name of one logical stream multiplexed over the connection.
///
/// Surrounding whitespace is trimmed; an empty topic is rejected.
///
/// # Examples
///
/// ```
/// use tradelink_core::types::Topic;
///
/// let topic = Topic::new(" market_data ").unwrap();
/// assert_eq!(topic.as_str(), "market_data");
/// assert!(Topic::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Creates a new `Topic`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyTopic` if the trimmed value is empty.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses an optional raw topic, returning `None` for absent or empty input.
    #[must_use]
    pub fn parse_opt(value: Option<&str>) -> Option<Self> {
        value.and_then(|raw| Self::new(raw).ok())
    }

    /// Returns the topic as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the topic and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Topic {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_trims() {
        let topic = Topic::new("  signals\n").unwrap();
        assert_eq!(topic.as_str(), "signals");
        assert_eq!(topic.to_string(), "signals");
    }

    #[test]
    fn test_topic_rejects_empty() {
        assert_eq!(Topic::new(""), Err(ValidationError::EmptyTopic));
        assert_eq!(Topic::new(" \t"), Err(ValidationError::EmptyTopic));
    }

    #[test]
    fn test_parse_opt() {
        assert!(Topic::parse_opt(None).is_none());
        assert!(Topic::parse_opt(Some("")).is_none());
        assert_eq!(
            Topic::parse_opt(Some("indicators")).map(Topic::into_inner),
            Some("indicators".to_string())
        );
    }

    #[test]
    fn test_serde_rejects_empty() {
        let parsed: Result<Topic, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let topic: Topic = serde_json::from_str("\"market_data\"").unwrap();
        assert_eq!(serde_json::to_string(&topic).unwrap(), "\"market_data\"");
    }
}

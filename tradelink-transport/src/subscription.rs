//! Topic subscriptions that survive reconnects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tradelink_core::types::Topic;

/// Whether a subscription has been sent on the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Recorded, not yet sent on the current connection.
    Pending,
    /// Subscribe message sent on the current connection.
    Active,
}

/// Point-in-time view of one subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Topic.
    pub topic: Topic,
    /// Parameters last set by the caller.
    pub params: Value,
    /// Current status.
    pub status: SubscriptionStatus,
    /// First subscribe time.
    pub subscribed_at: DateTime<Utc>,
}

/// Counts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    /// All subscriptions.
    pub total: usize,
    /// Sent on the current connection.
    pub active: usize,
    /// Waiting for the next flush.
    pub pending: usize,
    /// Topics in insertion order.
    pub topics: Vec<String>,
}

#[derive(Debug, Clone)]
struct Entry {
    topic: Topic,
    params: Value,
    status: SubscriptionStatus,
    seq: u64,
    subscribed_at: DateTime<Utc>,
}

/// Subscriptions keyed by topic, replayed in insertion order.
///
/// A topic is either Pending or Active, never both. Re-subscribing an
/// existing topic replaces its parameters and keeps its original position.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a subscription and returns its status.
    ///
    /// New entries start out Pending.
    pub fn upsert(&mut self, topic: Topic, params: Value) -> SubscriptionStatus {
        if let Some(entry) = self.entries.get_mut(topic.as_str()) {
            entry.params = params;
            return entry.status;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            topic.as_str().to_string(),
            Entry {
                topic,
                params,
                status: SubscriptionStatus::Pending,
                seq,
                subscribed_at: Utc::now(),
            },
        );
        SubscriptionStatus::Pending
    }

    /// Marks a subscription as sent on the current connection.
    pub fn mark_active(&mut self, topic: &str) -> bool {
        match self.entries.get_mut(topic) {
            Some(entry) => {
                entry.status = SubscriptionStatus::Active;
                true
            }
            None => false,
        }
    }

    /// Removes a subscription. Absent topics are not an error.
    pub fn remove(&mut self, topic: &str) -> bool {
        self.entries.remove(topic).is_some()
    }

    /// Returns every subscription in insertion order and marks them Active.
    ///
    /// The caller sends one subscribe message per returned entry.
    pub fn flush(&mut self) -> Vec<(Topic, Value)> {
        let mut ordered: Vec<&mut Entry> = self.entries.values_mut().collect();
        ordered.sort_by_key(|entry| entry.seq);
        ordered
            .into_iter()
            .map(|entry| {
                entry.status = SubscriptionStatus::Active;
                (entry.topic.clone(), entry.params.clone())
            })
            .collect()
    }

    /// Demotes every Active entry to Pending.
    pub fn demote_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.status = SubscriptionStatus::Pending;
        }
    }

    /// Returns true if the topic is subscribed, Pending or Active.
    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.entries.contains_key(topic)
    }

    /// Returns the status of a topic.
    #[must_use]
    pub fn status(&self, topic: &str) -> Option<SubscriptionStatus> {
        self.entries.get(topic).map(|entry| entry.status)
    }

    /// Number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All subscriptions in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubscriptionInfo> {
        let mut ordered: Vec<&Entry> = self.entries.values().collect();
        ordered.sort_by_key(|entry| entry.seq);
        ordered
            .into_iter()
            .map(|entry| SubscriptionInfo {
                topic: entry.topic.clone(),
                params: entry.params.clone(),
                status: entry.status,
                subscribed_at: entry.subscribed_at,
            })
            .collect()
    }

    /// Counts by status.
    #[must_use]
    pub fn summary(&self) -> SubscriptionSummary {
        let snapshot = self.snapshot();
        let active = snapshot
            .iter()
            .filter(|info| info.status == SubscriptionStatus::Active)
            .count();
        SubscriptionSummary {
            total: snapshot.len(),
            active,
            pending: snapshot.len() - active,
            topics: snapshot
                .into_iter()
                .map(|info| info.topic.into_inner())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topic(name: &str) -> Topic {
        Topic::new(name).unwrap()
    }

    fn flushed_topics(registry: &mut SubscriptionRegistry) -> Vec<String> {
        registry
            .flush()
            .into_iter()
            .map(|(topic, _)| topic.into_inner())
            .collect()
    }

    #[test]
    fn test_new_entries_are_pending() {
        let mut registry = SubscriptionRegistry::new();
        assert_eq!(
            registry.upsert(topic("BTCUSDT"), Value::Null),
            SubscriptionStatus::Pending
        );
        assert_eq!(registry.status("BTCUSDT"), Some(SubscriptionStatus::Pending));
        assert!(registry.contains("BTCUSDT"));
        assert!(!registry.contains("ETHUSDT"));
    }

    #[test]
    fn test_flush_is_insertion_ordered_and_activates() {
        let mut registry = SubscriptionRegistry::new();
        for name in ["c", "a", "b"] {
            registry.upsert(topic(name), Value::Null);
        }
        assert_eq!(flushed_topics(&mut registry), vec!["c", "a", "b"]);
        assert_eq!(registry.summary().active, 3);
    }

    #[test]
    fn test_upsert_keeps_position_and_replaces_params() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(topic("a"), json!({"v": 1}));
        registry.upsert(topic("b"), Value::Null);
        registry.mark_active("a");

        assert_eq!(
            registry.upsert(topic("a"), json!({"v": 2})),
            SubscriptionStatus::Active
        );

        let flushed = registry.flush();
        assert_eq!(flushed[0].0.as_str(), "a");
        assert_eq!(flushed[0].1, json!({"v": 2}));
        assert_eq!(flushed.len(), 2);
    }

    #[test]
    fn test_remove_then_resubscribe_goes_last() {
        let mut registry = SubscriptionRegistry::new();
        for name in ["a", "b", "c"] {
            registry.upsert(topic(name), Value::Null);
        }
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        registry.upsert(topic("a"), Value::Null);
        assert_eq!(flushed_topics(&mut registry), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_demote_all() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(topic("a"), Value::Null);
        registry.upsert(topic("b"), Value::Null);
        registry.flush();

        registry.demote_all();
        let summary = registry.summary();
        assert_eq!(summary.active, 0);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.topics, vec!["a", "b"]);
    }

    #[test]
    fn test_snapshot_order() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(topic("z"), Value::Null);
        registry.upsert(topic("y"), json!({"depth": 10}));
        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].topic.as_str(), "z");
        assert_eq!(snapshot[1].params, json!({"depth": 10}));
        assert_eq!(registry.len(), 2);
    }
}

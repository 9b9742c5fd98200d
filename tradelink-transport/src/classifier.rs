//! Routing of inbound messages that were not consumed as responses.

use std::collections::HashSet;

use crate::envelope::Envelope;
use crate::subscription::SubscriptionRegistry;

/// Single-slot callback categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// `market_data`
    MarketData,
    /// `indicators`
    Indicators,
    /// `signal` / `signals`
    Signal,
    /// `strategy_status` / `strategy_update`
    StrategyUpdate,
    /// `health_check` / `comprehensive_health_check`
    HealthCheck,
    /// `data`
    Data,
    /// `command`
    Command,
}

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Type outside the allow-list.
    NotAllowed,
    /// Topic-scoped message for a topic nobody subscribed to.
    Unsubscribed,
}

/// Where an inbound message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Named category callback.
    Category(Category),
    /// Session-update listener fan-out.
    SessionUpdate,
    /// Subscription control echo or status notice; logged only.
    Control,
    /// Allowed type without a dedicated category; goes to the generic callback.
    Extension,
    /// Silently dropped.
    Dropped(DropReason),
}

/// Allow-list filter plus type-to-route table.
#[derive(Debug, Clone)]
pub struct Classifier {
    allowed: HashSet<String>,
}

impl Classifier {
    /// Creates a classifier accepting the given types.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `message_type` passes the allow-list.
    #[must_use]
    pub fn allows(&self, message_type: &str) -> bool {
        self.allowed.contains(message_type)
    }

    /// Decides the route for one message.
    #[must_use]
    pub fn classify(&self, envelope: &Envelope, subscriptions: &SubscriptionRegistry) -> Route {
        let message_type = envelope.message_type.as_str();
        if !self.allows(message_type) {
            return Route::Dropped(DropReason::NotAllowed);
        }
        if let Some(topic) = envelope.topic()
            && !subscriptions.contains(topic)
        {
            return Route::Dropped(DropReason::Unsubscribed);
        }

        match message_type {
            "market_data" => Route::Category(Category::MarketData),
            "indicators" => Route::Category(Category::Indicators),
            "signal" | "signals" => Route::Category(Category::Signal),
            "strategy_status" | "strategy_update" => Route::Category(Category::StrategyUpdate),
            "health_check" | "comprehensive_health_check" => {
                Route::Category(Category::HealthCheck)
            }
            "data" => Route::Category(Category::Data),
            "command" => Route::Category(Category::Command),
            "session_status" | "session_update" => Route::SessionUpdate,
            "subscribe" | "unsubscribe" | "status" | "pong" => Route::Control,
            _ => Route::Extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ALLOWED_TYPES;
    use serde_json::{Value, json};
    use tradelink_core::types::Topic;

    fn classifier() -> Classifier {
        Classifier::new(DEFAULT_ALLOWED_TYPES.iter().copied())
    }

    fn subscribed(topics: &[&str]) -> SubscriptionRegistry {
        let mut registry = SubscriptionRegistry::new();
        for topic in topics {
            registry.upsert(Topic::new(*topic).unwrap(), Value::Null);
        }
        registry
    }

    #[test]
    fn test_category_routes() {
        let classifier = classifier();
        let none = subscribed(&[]);
        let cases = [
            ("market_data", Route::Category(Category::MarketData)),
            ("signals", Route::Category(Category::Signal)),
            ("strategy_status", Route::Category(Category::StrategyUpdate)),
            (
                "comprehensive_health_check",
                Route::Category(Category::HealthCheck),
            ),
            ("command", Route::Category(Category::Command)),
            ("session_update", Route::SessionUpdate),
            ("session_status", Route::SessionUpdate),
            ("subscribe", Route::Control),
            ("status", Route::Control),
        ];
        for (message_type, expected) in cases {
            assert_eq!(
                classifier.classify(&Envelope::new(message_type), &none),
                expected,
                "{message_type}"
            );
        }
    }

    #[test]
    fn test_unknown_type_dropped() {
        let route = classifier().classify(&Envelope::new("order_book_v2"), &subscribed(&[]));
        assert_eq!(route, Route::Dropped(DropReason::NotAllowed));
    }

    #[test]
    fn test_extended_allow_list_routes_to_extension() {
        let classifier = Classifier::new(["order_book_v2"]);
        let route = classifier.classify(&Envelope::new("order_book_v2"), &subscribed(&[]));
        assert_eq!(route, Route::Extension);
    }

    #[test]
    fn test_topic_scoped_requires_subscription() {
        let classifier = classifier();
        let registry = subscribed(&["BTCUSDT"]);

        let ours = Envelope::new("data").with_stream("BTCUSDT");
        assert_eq!(
            classifier.classify(&ours, &registry),
            Route::Category(Category::Data)
        );

        let theirs = Envelope::new("data").with_stream("ETHUSDT");
        assert_eq!(
            classifier.classify(&theirs, &registry),
            Route::Dropped(DropReason::Unsubscribed)
        );

        let nested_ours = Envelope::new("data").with_data(json!({"stream": "BTCUSDT"}));
        assert_eq!(
            classifier.classify(&nested_ours, &registry),
            Route::Category(Category::Data)
        );

        let nested_theirs = Envelope::new("data").with_data(json!({"stream": "ETHUSDT"}));
        assert_eq!(
            classifier.classify(&nested_theirs, &registry),
            Route::Dropped(DropReason::Unsubscribed)
        );

        let broadcast = Envelope::new("market_data");
        assert_eq!(
            classifier.classify(&broadcast, &registry),
            Route::Category(Category::MarketData)
        );
    }
}

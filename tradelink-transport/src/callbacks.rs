//! Single-slot consumer callbacks.

use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;
use tradelink_core::error::NetworkError;

use crate::classifier::Category;
use crate::envelope::Envelope;
use crate::ws::ConnectionStatus;

/// Callback receiving one routed message.
pub type MessageCallback = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Callback without arguments.
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving the disconnect details.
pub type DisconnectCallback = Arc<dyn Fn(&DisconnectReason) + Send + Sync>;

/// Callback receiving a connection-level error.
pub type ErrorCallback = Arc<dyn Fn(&NetworkError) + Send + Sync>;

/// Callback receiving the unanswered probe count.
pub type SlowConnectionCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Callback receiving the new status.
pub type StatusCallback = Arc<dyn Fn(&ConnectionStatus) + Send + Sync>;

/// Details passed to `on_disconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectReason {
    /// Close code, if one was seen or sent.
    pub code: Option<u16>,
    /// Human-readable reason.
    pub reason: String,
    /// True when the caller asked for the close.
    pub initiated_by_client: bool,
    /// True when an automatic reconnect has been scheduled.
    pub will_reconnect: bool,
}

/// Capability struct of optional callbacks.
///
/// Every slot holds at most one callback; the last one set wins. Use
/// [`overlay`](Self::overlay) to merge a partial set without clearing slots
/// the new set leaves empty.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// `market_data` messages.
    pub on_market_data: Option<MessageCallback>,
    /// `indicators` messages.
    pub on_indicators: Option<MessageCallback>,
    /// `signal` / `signals` messages.
    pub on_signal: Option<MessageCallback>,
    /// `strategy_status` / `strategy_update` messages.
    pub on_strategy_update: Option<MessageCallback>,
    /// Health check messages.
    pub on_health_check: Option<MessageCallback>,
    /// `data` messages.
    pub on_data: Option<MessageCallback>,
    /// Inbound `command` messages.
    pub on_command: Option<MessageCallback>,
    /// Allowed types without a dedicated slot.
    pub on_message: Option<MessageCallback>,
    /// Handshake acknowledged.
    pub on_connect: Option<NotifyCallback>,
    /// A live link went away.
    pub on_disconnect: Option<DisconnectCallback>,
    /// Connection-level error recorded.
    pub on_error: Option<ErrorCallback>,
    /// Slow-connection threshold reached.
    pub on_slow_connection: Option<SlowConnectionCallback>,
    /// Observable status changed.
    pub on_status_change: Option<StatusCallback>,
}

fn replace_if_set<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

impl Callbacks {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every slot that `other` sets; empty slots in `other` are ignored.
    pub fn overlay(&mut self, other: Self) {
        replace_if_set(&mut self.on_market_data, other.on_market_data);
        replace_if_set(&mut self.on_indicators, other.on_indicators);
        replace_if_set(&mut self.on_signal, other.on_signal);
        replace_if_set(&mut self.on_strategy_update, other.on_strategy_update);
        replace_if_set(&mut self.on_health_check, other.on_health_check);
        replace_if_set(&mut self.on_data, other.on_data);
        replace_if_set(&mut self.on_command, other.on_command);
        replace_if_set(&mut self.on_message, other.on_message);
        replace_if_set(&mut self.on_connect, other.on_connect);
        replace_if_set(&mut self.on_disconnect, other.on_disconnect);
        replace_if_set(&mut self.on_error, other.on_error);
        replace_if_set(&mut self.on_slow_connection, other.on_slow_connection);
        replace_if_set(&mut self.on_status_change, other.on_status_change);
    }

    /// Returns the callback for a category.
    #[must_use]
    pub fn category(&self, category: Category) -> Option<MessageCallback> {
        match category {
            Category::MarketData => self.on_market_data.clone(),
            Category::Indicators => self.on_indicators.clone(),
            Category::Signal => self.on_signal.clone(),
            Category::StrategyUpdate => self.on_strategy_update.clone(),
            Category::HealthCheck => self.on_health_check.clone(),
            Category::Data => self.on_data.clone(),
            Category::Command => self.on_command.clone(),
        }
    }

    /// Sets the `market_data` callback.
    #[must_use]
    pub fn with_market_data(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_market_data = Some(Arc::new(f));
        self
    }

    /// Sets the `indicators` callback.
    #[must_use]
    pub fn with_indicators(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_indicators = Some(Arc::new(f));
        self
    }

    /// Sets the signal callback.
    #[must_use]
    pub fn with_signal(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_signal = Some(Arc::new(f));
        self
    }

    /// Sets the strategy update callback.
    #[must_use]
    pub fn with_strategy_update(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_strategy_update = Some(Arc::new(f));
        self
    }

    /// Sets the health check callback.
    #[must_use]
    pub fn with_health_check(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_health_check = Some(Arc::new(f));
        self
    }

    /// Sets the `data` callback.
    #[must_use]
    pub fn with_data(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_data = Some(Arc::new(f));
        self
    }

    /// Sets the inbound command callback.
    #[must_use]
    pub fn with_command(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_command = Some(Arc::new(f));
        self
    }

    /// Sets the generic message callback.
    #[must_use]
    pub fn with_message(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Sets the connect callback.
    #[must_use]
    pub fn with_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Sets the disconnect callback.
    #[must_use]
    pub fn with_disconnect(
        mut self,
        f: impl Fn(&DisconnectReason) + Send + Sync + 'static,
    ) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn with_error(mut self, f: impl Fn(&NetworkError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the slow-connection callback.
    #[must_use]
    pub fn with_slow_connection(mut self, f: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_slow_connection = Some(Arc::new(f));
        self
    }

    /// Sets the status change callback.
    #[must_use]
    pub fn with_status_change(
        mut self,
        f: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_change = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_market_data", &self.on_market_data.is_some())
            .field("on_indicators", &self.on_indicators.is_some())
            .field("on_signal", &self.on_signal.is_some())
            .field("on_strategy_update", &self.on_strategy_update.is_some())
            .field("on_health_check", &self.on_health_check.is_some())
            .field("on_data", &self.on_data.is_some())
            .field("on_command", &self.on_command.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_slow_connection", &self.on_slow_connection.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .finish()
    }
}

/// Runs a consumer callback, logging instead of propagating a panic.
pub(crate) fn invoke_guarded(name: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(callback = name, "callback panicked");
    }
}

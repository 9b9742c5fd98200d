//! Transport client handle.
//!
//! [`TransportClient`] is a cheap front for the connection task spawned by
//! [`TransportClientBuilder::build`]. Every method forwards a command to the
//! task and waits for its acknowledgment; nothing here touches the link.
//!
//! # Example
//!
//! ```ignore
//! use tradelink_transport::{Callbacks, TransportClient, TransportConfig};
//!
//! let config = TransportConfig::builder()
//!     .endpoint_url("wss://app.example.com/ws")
//!     .build();
//!
//! let client = TransportClient::builder(config)
//!     .callbacks(Callbacks::new().with_market_data(|m| println!("{m:?}")))
//!     .build()?;
//!
//! client.subscribe("BTCUSDT", None).await;
//! client.connect().await?;
//! ```

mod task;

pub use task::SubscribeOutcome;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tradelink_core::config::Validatable;
use tradelink_core::error::{ConfigError, RequestError};
use tradelink_core::types::Topic;

use crate::callbacks::Callbacks;
use crate::config::TransportConfig;
use crate::envelope::Envelope;
use crate::listener::{Disposer, Listener, ListenerRegistry, ListenerStats};
use crate::rest::CredentialCoordinator;
use crate::subscription::{SubscriptionInfo, SubscriptionSummary};
use crate::ws::{ConnectionState, ConnectionStatus, Connector, WebSocketConnector};
use task::{Command, ConnectionTask, Shared};

/// Handle to one duplex connection.
pub struct TransportClient {
    config: Arc<TransportConfig>,
    commands: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    callbacks: Arc<RwLock<Callbacks>>,
    session_listeners: ListenerRegistry<Envelope>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Builder for [`TransportClient`].
pub struct TransportClientBuilder {
    config: TransportConfig,
    connector: Option<Arc<dyn Connector>>,
    credentials: Option<Arc<dyn CredentialCoordinator>>,
    callbacks: Callbacks,
}

impl TransportClientBuilder {
    /// Uses `connector` instead of the WebSocket connector.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Validates the session before each handshake and presents its token.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialCoordinator>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Initial callbacks.
    #[must_use]
    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Validates the configuration and spawns the connection task.
    ///
    /// Must be called from within a tokio runtime. The client starts
    /// disconnected.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<TransportClient, ConfigError> {
        self.config.validate()?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector::new()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let callbacks = Arc::new(RwLock::new(self.callbacks));
        let session_listeners = ListenerRegistry::new();

        let task = ConnectionTask::new(
            self.config.clone(),
            connector,
            self.credentials,
            Shared {
                callbacks: Arc::clone(&callbacks),
                session_listeners: session_listeners.clone(),
            },
            commands_rx,
            status_tx,
        );
        let handle = tokio::spawn(task.run());

        Ok(TransportClient {
            config: Arc::new(self.config),
            commands: commands_tx,
            status_rx,
            callbacks,
            session_listeners,
            task: Mutex::new(Some(handle)),
        })
    }
}

impl TransportClient {
    /// Creates a builder.
    #[must_use]
    pub fn builder(config: TransportConfig) -> TransportClientBuilder {
        TransportClientBuilder {
            config,
            connector: None,
            credentials: None,
            callbacks: Callbacks::default(),
        }
    }

    /// Creates a WebSocket client with no callbacks.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Creates a client over the given connector.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn init(config: TransportConfig, connector: impl Connector) -> Result<Self, ConfigError> {
        Self::builder(config).connector(connector).build()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn call<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, RequestError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| RequestError::Shutdown)?;
        rx.await.map_err(|_| RequestError::Shutdown)
    }

    /// Starts connecting. Does nothing if a connection is already live or
    /// in progress.
    ///
    /// Returns once the attempt has started; watch [`status`](Self::status)
    /// or use [`wait_for_state`](Self::wait_for_state) for the outcome.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Shutdown` after [`dispose`](Self::dispose).
    pub async fn connect(&self) -> Result<(), RequestError> {
        self.call(|ack| Command::Connect { ack }).await
    }

    /// Closes the connection and cancels any scheduled reconnect.
    ///
    /// Safe to call in any state and any number of times.
    pub async fn disconnect(&self) {
        if self.call(|ack| Command::Disconnect { ack }).await.is_err() {
            debug!("disconnect after shutdown ignored");
        }
    }

    /// Closes the connection and connects again after a short fixed delay,
    /// with the attempt counter reset.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Shutdown` after [`dispose`](Self::dispose).
    pub async fn reconnect(&self) -> Result<(), RequestError> {
        self.call(|ack| Command::Reconnect { ack }).await
    }

    /// Records a subscription and sends it if authenticated.
    ///
    /// A missing or blank topic is ignored. Subscribing again to the same
    /// topic replaces its parameters.
    pub async fn subscribe<'a>(
        &self,
        topic: impl Into<Option<&'a str>>,
        params: Option<Value>,
    ) -> SubscribeOutcome {
        let topic = Topic::parse_opt(topic.into());
        let params = params.unwrap_or(Value::Null);
        self.call(|ack| Command::Subscribe { topic, params, ack })
            .await
            .unwrap_or_else(|_| {
                warn!("subscribe after shutdown ignored");
                SubscribeOutcome::Ignored
            })
    }

    /// Forgets a subscription and tells the server if authenticated.
    ///
    /// Returns true if the topic was recorded.
    pub async fn unsubscribe<'a>(&self, topic: impl Into<Option<&'a str>>) -> bool {
        let topic = Topic::parse_opt(topic.into());
        self.call(|ack| Command::Unsubscribe { topic, ack })
            .await
            .unwrap_or(false)
    }

    /// Sends a correlated request with the configured default deadline.
    ///
    /// # Errors
    ///
    /// See [`request_with_timeout`](Self::request_with_timeout).
    pub async fn request(&self, envelope: Envelope) -> Result<Envelope, RequestError> {
        self.request_with_timeout(envelope, self.config.request_timeout())
            .await
    }

    /// Sends a correlated request and waits for the response with the same id.
    ///
    /// An id is assigned when the envelope has none.
    ///
    /// # Errors
    ///
    /// - `NotConnected` when the connection is not authenticated
    /// - `Timeout` when no response arrives within `timeout`
    /// - `Cancelled` when the connection closes first
    /// - `Remote` when the response reports a failure
    /// - `DuplicateId` when the id is already outstanding
    pub async fn request_with_timeout(
        &self,
        envelope: Envelope,
        timeout: Duration,
    ) -> Result<Envelope, RequestError> {
        let (responder, rx) = oneshot::channel();
        self.commands
            .send(Command::Request {
                envelope,
                timeout,
                responder,
            })
            .map_err(|_| RequestError::Shutdown)?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// Sends a fire-and-forget command.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when the connection is not authenticated.
    pub async fn send_command(
        &self,
        name: &str,
        data: Option<Value>,
    ) -> Result<(), RequestError> {
        if name.trim().is_empty() {
            return Err(RequestError::InvalidInput {
                reason: "command name must not be empty".to_string(),
            });
        }
        self.send(Envelope::command(name, data.unwrap_or(Value::Null)))
            .await
    }

    /// Sends one message without waiting for an answer.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when the connection is not authenticated.
    pub async fn send(&self, envelope: Envelope) -> Result<(), RequestError> {
        self.call(|ack| Command::Send { envelope, ack }).await?
    }

    /// Recorded subscriptions in subscription order.
    pub async fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.call(|ack| Command::Subscriptions { ack })
            .await
            .unwrap_or_default()
    }

    /// Logs and returns subscription counts.
    pub async fn log_subscription_summary(&self) -> SubscriptionSummary {
        self.call(|ack| Command::SubscriptionSummary { ack })
            .await
            .unwrap_or_default()
    }

    /// Merges `callbacks` into the current set. Slots left empty keep their
    /// current callback; `None` changes nothing.
    pub fn set_callbacks(&self, callbacks: Option<Callbacks>) {
        match callbacks {
            Some(callbacks) => self.callbacks.write().overlay(callbacks),
            None => debug!("set_callbacks without callbacks ignored"),
        }
    }

    /// Registers a session-update listener.
    pub fn register_session_listener(
        &self,
        listener: Option<Listener<Envelope>>,
        owner: &str,
    ) -> Disposer<Envelope> {
        self.session_listeners.register(listener, owner)
    }

    /// Listener counts; warns above the configured threshold.
    #[must_use]
    pub fn listener_stats(&self) -> ListenerStats {
        self.session_listeners
            .stats(self.config.listener_warn_threshold)
    }

    /// Removes every session-update listener.
    pub fn clear_listeners(&self) {
        self.session_listeners.clear_all();
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Returns true while authenticated.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status_rx.borrow().state.is_authenticated()
    }

    /// A receiver that observes every status change.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Waits until the state equals `state`. Returns false on timeout or
    /// after shutdown.
    pub async fn wait_for_state(&self, state: ConnectionState, timeout: Duration) -> bool {
        let mut rx = self.status_rx.clone();
        let reached = tokio::time::timeout(timeout, rx.wait_for(|s| s.state == state)).await;
        matches!(reached, Ok(Ok(_)))
    }

    /// Disconnects, stops the connection task and drops every listener.
    ///
    /// Later calls fail with `Shutdown` or do nothing.
    pub async fn dispose(&self) {
        if self.call(|ack| Command::Shutdown { ack }).await.is_err() {
            debug!("dispose after shutdown ignored");
        }
        let handle = self.task.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "connection task ended abnormally");
        }
        self.session_listeners.clear_all();
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("endpoint", &self.config.endpoint_url)
            .field("state", &self.status_rx.borrow().state)
            .finish_non_exhaustive()
    }
}

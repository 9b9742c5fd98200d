//! The connection task.
//!
//! One task owns the link, the state machine and the passive components.
//! Handles talk to it through [`Command`]s; it publishes status through a
//! watch channel. Every wakeup is either a command, the completion of the
//! in-flight connect or session check, an inbound frame, or a timer.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, trace, warn};
use tradelink_core::error::{NetworkError, RequestError};
use tradelink_core::types::{RequestIdGenerator, Topic};
use tradelink_telemetry::masking::SensitiveDataMasker;
use tradelink_telemetry::spans::{connection_span, request_span};

use crate::callbacks::{Callbacks, DisconnectReason, invoke_guarded};
use crate::classifier::{Classifier, DropReason, Route};
use crate::config::TransportConfig;
use crate::correlator::{Correlator, Responder};
use crate::envelope::{Envelope, HandshakeAck};
use crate::listener::ListenerRegistry;
use crate::liveness::{LivenessEvent, LivenessMonitor};
use crate::rest::CredentialCoordinator;
use crate::subscription::{SubscriptionInfo, SubscriptionRegistry, SubscriptionSummary};
use crate::ws::{
    CLOSE_HANDSHAKE_REJECTED, CLOSE_HANDSHAKE_TIMEOUT, CLOSE_LIVENESS_FAILURE, CLOSE_NORMAL,
    CloseClass, ConnectionState, ConnectionStatus, Connector, Link, WebSocketMessage,
};

/// What happened to a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Sent on the authenticated connection.
    Sent,
    /// Recorded; goes out on the next flush.
    Queued,
    /// Empty or missing topic; nothing recorded.
    Ignored,
}

pub(crate) enum Command {
    Connect {
        ack: oneshot::Sender<()>,
    },
    Disconnect {
        ack: oneshot::Sender<()>,
    },
    Reconnect {
        ack: oneshot::Sender<()>,
    },
    Subscribe {
        topic: Option<Topic>,
        params: Value,
        ack: oneshot::Sender<SubscribeOutcome>,
    },
    Unsubscribe {
        topic: Option<Topic>,
        ack: oneshot::Sender<bool>,
    },
    Request {
        envelope: Envelope,
        timeout: Duration,
        responder: Responder,
    },
    Send {
        envelope: Envelope,
        ack: oneshot::Sender<Result<(), RequestError>>,
    },
    Subscriptions {
        ack: oneshot::Sender<Vec<SubscriptionInfo>>,
    },
    SubscriptionSummary {
        ack: oneshot::Sender<SubscriptionSummary>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

/// Result of the in-flight asynchronous step.
enum Step {
    Opened(Result<Link, NetworkError>),
    Session { valid: bool, token: Option<String> },
}

enum Event {
    Command(Command),
    HandlesGone,
    Step(Step),
    Frame(Option<WebSocketMessage>),
    Timer,
}

enum CloseKind {
    /// The caller asked for it.
    Client,
    /// Remote side closed normally.
    Normal { reason: String },
    /// Anything retryable.
    Abnormal { code: Option<u16>, error: NetworkError },
    /// Handshake refused.
    Rejected { error: NetworkError },
}

#[derive(Debug, Clone, Copy)]
struct ScheduledConnect {
    at: Instant,
    counts_as_attempt: bool,
}

/// State shared between the handle and the task.
pub(crate) struct Shared {
    pub callbacks: Arc<RwLock<Callbacks>>,
    pub session_listeners: ListenerRegistry<Envelope>,
}

pub(crate) struct ConnectionTask {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    credentials: Option<Arc<dyn CredentialCoordinator>>,
    callbacks: Arc<RwLock<Callbacks>>,
    session_listeners: ListenerRegistry<Envelope>,
    commands: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<ConnectionStatus>,
    status: ConnectionStatus,
    masker: SensitiveDataMasker,
    classifier: Classifier,
    correlator: Correlator,
    subscriptions: SubscriptionRegistry,
    liveness: LivenessMonitor,
    link: Option<Link>,
    pending: Option<BoxFuture<'static, Step>>,
    handshake_deadline: Option<Instant>,
    scheduled: Option<ScheduledConnect>,
}

impl ConnectionTask {
    pub(crate) fn new(
        config: TransportConfig,
        connector: Arc<dyn Connector>,
        credentials: Option<Arc<dyn CredentialCoordinator>>,
        shared: Shared,
        commands: mpsc::UnboundedReceiver<Command>,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        Self {
            classifier: Classifier::new(config.allowed_types.iter().cloned()),
            liveness: LivenessMonitor::from_config(&config),
            config,
            connector,
            credentials,
            callbacks: shared.callbacks,
            session_listeners: shared.session_listeners,
            commands,
            status_tx,
            status: ConnectionStatus::default(),
            masker: SensitiveDataMasker::new(),
            correlator: Correlator::new(),
            subscriptions: SubscriptionRegistry::new(),
            link: None,
            pending: None,
            handshake_deadline: None,
            scheduled: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(endpoint = %self.config.endpoint_url, "connection task started");
        loop {
            let wakeup = self.next_wakeup();
            let event = tokio::select! {
                biased;
                step = poll_pending(&mut self.pending) => Event::Step(step),
                frame = recv_frame(&mut self.link) => Event::Frame(frame),
                command = self.commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::HandlesGone,
                },
                () = sleep_until(wakeup) => Event::Timer,
            };

            match event {
                Event::Step(step) => {
                    self.pending = None;
                    self.on_step(step);
                }
                Event::Frame(frame) => self.on_frame(frame),
                Event::Command(Command::Shutdown { ack }) => {
                    self.close_deliberately();
                    let _ = ack.send(());
                    break;
                }
                Event::Command(command) => self.on_command(command),
                Event::HandlesGone => {
                    self.close_deliberately();
                    break;
                }
                Event::Timer => {}
            }

            self.drive_timers(Instant::now());
        }
        debug!("connection task stopped");
    }

    fn next_wakeup(&self) -> Option<Instant> {
        [
            self.liveness.next_wakeup(),
            self.correlator.next_deadline(),
            self.handshake_deadline,
            self.scheduled.map(|s| s.at),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ---- commands --------------------------------------------------------

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect { ack } => {
                if self.status.state.is_active() {
                    debug!(state = %self.status.state, "connect ignored, already active");
                } else {
                    self.start_connect();
                }
                let _ = ack.send(());
            }
            Command::Disconnect { ack } => {
                self.close_deliberately();
                let _ = ack.send(());
            }
            Command::Reconnect { ack } => {
                self.close_deliberately();
                self.status.reconnect_attempts = 0;
                self.scheduled = Some(ScheduledConnect {
                    at: Instant::now() + self.config.manual_reconnect_delay(),
                    counts_as_attempt: false,
                });
                info!(
                    delay_ms = self.config.manual_reconnect_delay_ms,
                    "manual reconnect scheduled"
                );
                self.publish();
                let _ = ack.send(());
            }
            Command::Subscribe { topic, params, ack } => {
                let _ = ack.send(self.subscribe(topic, params));
            }
            Command::Unsubscribe { topic, ack } => {
                let _ = ack.send(self.unsubscribe(topic));
            }
            Command::Request {
                envelope,
                timeout,
                responder,
            } => self.request(envelope, timeout, responder),
            Command::Send { envelope, ack } => {
                let result = if !self.status.state.is_authenticated() {
                    Err(RequestError::NotConnected)
                } else {
                    envelope.to_json().and_then(|text| {
                        self.send_text(text)
                            .then_some(())
                            .ok_or(RequestError::NotConnected)
                    })
                };
                let _ = ack.send(result);
            }
            Command::Subscriptions { ack } => {
                let _ = ack.send(self.subscriptions.snapshot());
            }
            Command::SubscriptionSummary { ack } => {
                let summary = self.subscriptions.summary();
                info!(
                    total = summary.total,
                    active = summary.active,
                    pending = summary.pending,
                    topics = ?summary.topics,
                    "subscription summary"
                );
                let _ = ack.send(summary);
            }
            Command::Shutdown { ack } => {
                let _ = ack.send(());
            }
        }
    }

    fn subscribe(&mut self, topic: Option<Topic>, params: Value) -> SubscribeOutcome {
        let Some(topic) = topic else {
            debug!("subscribe without a usable topic ignored");
            return SubscribeOutcome::Ignored;
        };

        self.subscriptions.upsert(topic.clone(), params.clone());
        if self.status.state.is_authenticated()
            && self.send_envelope(&Envelope::subscribe(&topic, params))
        {
            self.subscriptions.mark_active(topic.as_str());
            debug!(topic = %topic, "subscribed");
            SubscribeOutcome::Sent
        } else {
            debug!(topic = %topic, "subscription queued until authenticated");
            SubscribeOutcome::Queued
        }
    }

    fn unsubscribe(&mut self, topic: Option<Topic>) -> bool {
        let Some(topic) = topic else {
            debug!("unsubscribe without a usable topic ignored");
            return false;
        };

        let removed = self.subscriptions.remove(topic.as_str());
        if self.status.state.is_authenticated() {
            self.send_envelope(&Envelope::unsubscribe(&topic));
        }
        debug!(topic = %topic, removed, "unsubscribed");
        removed
    }

    fn request(&mut self, mut envelope: Envelope, timeout: Duration, responder: Responder) {
        if !self.status.state.is_authenticated() {
            let _ = responder.send(Err(RequestError::NotConnected));
            return;
        }

        let id = match envelope.id.take().filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => RequestIdGenerator::global().next_id().as_str().to_string(),
        };
        envelope.id = Some(id.clone());

        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                let _ = responder.send(Err(e));
                return;
            }
        };

        let span = request_span(&id, &envelope.message_type);
        let _guard = span.enter();
        if !self
            .correlator
            .register(id.clone(), responder, timeout, Instant::now())
        {
            return;
        }
        if !self.send_text(text) {
            self.correlator.reject(
                &id,
                RequestError::Cancelled {
                    id: id.clone(),
                    reason: "link closed before the request was sent".to_string(),
                },
            );
            return;
        }
        debug!(timeout_ms = duration_ms(timeout), "request sent");
    }

    // ---- connect and handshake -------------------------------------------

    fn start_connect(&mut self) {
        self.scheduled = None;
        self.handshake_deadline = None;
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let config = self.config.clone();
        let timeout = self.config.connect_timeout();
        let timeout_ms = self.config.connect_timeout_ms;
        let span = connection_span(&config.endpoint_url, self.status.reconnect_attempts);
        info!(
            endpoint = %config.endpoint_url,
            attempt = self.status.reconnect_attempts,
            "connecting"
        );

        self.pending = Some(Box::pin(
            async move {
                let result = match tokio::time::timeout(timeout, connector.connect(&config)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(NetworkError::Timeout { timeout_ms }),
                };
                Step::Opened(result)
            }
            .instrument(span),
        ));
    }

    fn on_step(&mut self, step: Step) {
        match step {
            Step::Opened(Ok(link)) => {
                self.link = Some(link);
                self.handshake_deadline = Some(Instant::now() + self.config.handshake_timeout());
                self.set_state(ConnectionState::Open);
                match &self.credentials {
                    Some(credentials) => {
                        let credentials = Arc::clone(credentials);
                        self.pending = Some(Box::pin(async move {
                            let valid = credentials.ensure_session().await;
                            let token = if valid {
                                credentials.session_token().await
                            } else {
                                None
                            };
                            Step::Session { valid, token }
                        }));
                    }
                    None => self.begin_handshake(None),
                }
            }
            Step::Opened(Err(error)) => {
                warn!(error = %error, "connect failed");
                self.teardown(CloseKind::Abnormal { code: None, error });
            }
            Step::Session { valid: false, .. } => {
                self.reject_handshake("session could not be validated".to_string());
            }
            Step::Session { valid: true, token } => self.begin_handshake(token),
        }
    }

    fn begin_handshake(&mut self, token: Option<String>) {
        let hello = token.map_or_else(Envelope::hello, Envelope::auth);
        if !self.send_envelope(&hello) {
            self.teardown(CloseKind::Abnormal {
                code: None,
                error: NetworkError::ConnectionClosed {
                    code: None,
                    reason: "link closed during handshake".to_string(),
                },
            });
            return;
        }
        // The deadline set on open also covers the session check.
        self.handshake_deadline
            .get_or_insert_with(|| Instant::now() + self.config.handshake_timeout());
        self.set_state(ConnectionState::Handshaking);
    }

    fn on_authenticated(&mut self) {
        self.handshake_deadline = None;
        self.status.reconnect_attempts = 0;
        self.status.last_error = None;
        self.status.is_authenticated = true;
        self.liveness.start(Instant::now());

        let replay = self.subscriptions.flush();
        let replayed = replay.len();
        for (topic, params) in replay {
            self.send_envelope(&Envelope::subscribe(&topic, params));
        }

        self.set_state(ConnectionState::Authenticated);
        info!(replayed, "connection authenticated");

        let on_connect = self.callbacks.read().on_connect.clone();
        if let Some(on_connect) = on_connect {
            invoke_guarded("on_connect", || on_connect());
        }
    }

    fn reject_handshake(&mut self, reason: String) {
        warn!(reason = %reason, "handshake rejected");
        self.status.is_authenticated = false;
        self.send_frame(WebSocketMessage::close(
            CLOSE_HANDSHAKE_REJECTED,
            "handshake rejected",
        ));
        self.teardown(CloseKind::Rejected {
            error: NetworkError::HandshakeRejected { reason },
        });
    }

    // ---- inbound ---------------------------------------------------------

    fn on_frame(&mut self, frame: Option<WebSocketMessage>) {
        match frame {
            None => self.teardown(CloseKind::Abnormal {
                code: None,
                error: NetworkError::ConnectionClosed {
                    code: None,
                    reason: "transport closed without a close frame".to_string(),
                },
            }),
            Some(WebSocketMessage::Close(close)) => {
                let code = close.as_ref().map(|c| c.code);
                let reason = close.map(|c| c.reason).unwrap_or_default();
                info!(code = ?code, reason = %reason, "remote closed the connection");
                match CloseClass::of(code) {
                    CloseClass::Normal => self.teardown(CloseKind::Normal { reason }),
                    CloseClass::Rejected => {
                        self.status.is_authenticated = false;
                        self.teardown(CloseKind::Rejected {
                            error: NetworkError::HandshakeRejected { reason },
                        });
                    }
                    CloseClass::Abnormal => self.teardown(CloseKind::Abnormal {
                        code,
                        error: NetworkError::ConnectionClosed { code, reason },
                    }),
                }
            }
            Some(WebSocketMessage::Text(text)) => self.on_text(&text),
            Some(WebSocketMessage::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => self.on_text(&text),
                Err(_) => warn!("dropping non-UTF-8 binary frame"),
            },
            Some(WebSocketMessage::Ping(data)) => {
                self.send_frame(WebSocketMessage::Pong(data));
            }
            Some(WebSocketMessage::Pong(_)) => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        if text.len() > self.config.max_message_bytes {
            warn!(
                size = text.len(),
                limit = self.config.max_message_bytes,
                "dropping oversized message"
            );
            return;
        }
        trace!(frame = %self.masker.mask_string(text), "inbound frame");

        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                return;
            }
        };

        if self.correlator.on_message(&envelope) {
            return;
        }
        if envelope.is_pong() {
            self.liveness.on_pong();
            return;
        }

        match envelope.handshake_ack() {
            Some(HandshakeAck::Accepted) => {
                match self.status.state {
                    ConnectionState::Handshaking => self.on_authenticated(),
                    state => debug!(state = %state, "handshake acknowledgment ignored"),
                }
                return;
            }
            Some(HandshakeAck::Rejected(reason))
                if self.status.state == ConnectionState::Handshaking =>
            {
                self.reject_handshake(reason);
                return;
            }
            _ => {}
        }

        self.route(&envelope);
    }

    fn route(&self, envelope: &Envelope) {
        match self.classifier.classify(envelope, &self.subscriptions) {
            Route::Category(category) => {
                let callback = self.callbacks.read().category(category);
                if let Some(callback) = callback {
                    invoke_guarded("category", || callback(envelope));
                }
            }
            Route::SessionUpdate => {
                self.session_listeners.emit(envelope);
            }
            Route::Extension => {
                let callback = self.callbacks.read().on_message.clone();
                if let Some(callback) = callback {
                    invoke_guarded("on_message", || callback(envelope));
                }
            }
            Route::Control => {
                debug!(
                    message_type = %envelope.message_type,
                    stream = ?envelope.stream,
                    status = ?envelope.status,
                    "control message"
                );
            }
            Route::Dropped(DropReason::NotAllowed) => {
                trace!(message_type = %envelope.message_type, "dropping message type outside allow-list");
            }
            Route::Dropped(DropReason::Unsubscribed) => {
                trace!(stream = ?envelope.stream, "dropping message for unsubscribed topic");
            }
        }
    }

    // ---- timers ----------------------------------------------------------

    fn drive_timers(&mut self, now: Instant) {
        self.correlator.expire_due(now);

        if let Some(deadline) = self.handshake_deadline
            && deadline <= now
        {
            self.handshake_deadline = None;
            let timeout_ms = self.config.handshake_timeout_ms;
            warn!(timeout_ms, "handshake timed out");
            self.send_frame(WebSocketMessage::close(
                CLOSE_HANDSHAKE_TIMEOUT,
                "handshake timeout",
            ));
            self.teardown(CloseKind::Abnormal {
                code: Some(CLOSE_HANDSHAKE_TIMEOUT),
                error: NetworkError::HandshakeTimeout { timeout_ms },
            });
        }

        for event in self.liveness.poll(now) {
            match event {
                LivenessEvent::SendProbe => {
                    trace!("sending liveness probe");
                    self.send_envelope(&Envelope::ping());
                }
                LivenessEvent::Slow { missed } => {
                    warn!(missed, "slow connection");
                    let callback = self.callbacks.read().on_slow_connection.clone();
                    if let Some(callback) = callback {
                        invoke_guarded("on_slow_connection", || callback(missed));
                    }
                }
                LivenessEvent::Dead { missed } => {
                    warn!(missed, "liveness failure, closing connection");
                    self.send_frame(WebSocketMessage::close(
                        CLOSE_LIVENESS_FAILURE,
                        "liveness failure",
                    ));
                    self.teardown(CloseKind::Abnormal {
                        code: Some(CLOSE_LIVENESS_FAILURE),
                        error: NetworkError::LivenessFailure { missed },
                    });
                }
            }
        }

        if let Some(scheduled) = self.scheduled
            && scheduled.at <= now
        {
            if scheduled.counts_as_attempt {
                self.status.reconnect_attempts += 1;
            }
            self.start_connect();
        }
    }

    // ---- close -----------------------------------------------------------

    /// Client-initiated close. A no-op when nothing is live or in flight,
    /// apart from cancelling a scheduled reconnect.
    fn close_deliberately(&mut self) {
        if self.scheduled.take().is_some() {
            debug!("scheduled reconnect cancelled");
        }
        if self.link.is_none() && self.pending.is_none() {
            return;
        }
        self.set_state(ConnectionState::Closing);
        self.send_frame(WebSocketMessage::close(CLOSE_NORMAL, "client disconnect"));
        self.teardown(CloseKind::Client);
    }

    fn teardown(&mut self, kind: CloseKind) {
        let had_link = self.link.take().is_some();
        self.pending = None;
        self.handshake_deadline = None;
        self.liveness.stop();
        self.subscriptions.demote_all();

        let (code, reason, initiated_by_client) = match &kind {
            CloseKind::Client => (Some(CLOSE_NORMAL), "client disconnect".to_string(), true),
            CloseKind::Normal { reason } => (Some(CLOSE_NORMAL), reason.clone(), false),
            CloseKind::Abnormal { code, error } => (*code, error.to_string(), false),
            CloseKind::Rejected { error } => {
                (Some(CLOSE_HANDSHAKE_REJECTED), error.to_string(), false)
            }
        };
        self.correlator.cancel_all(&reason);

        self.status.state = ConnectionState::Disconnected;
        let mut reported_error = None;
        match kind {
            CloseKind::Client | CloseKind::Normal { .. } => {
                self.scheduled = None;
            }
            CloseKind::Abnormal { error, .. } => {
                self.status.last_error = Some(error.clone());
                reported_error = Some(error);
                let attempts = self.status.reconnect_attempts;
                if self.config.should_reconnect(attempts) {
                    let delay = self.config.backoff_delay(attempts);
                    info!(
                        attempt = attempts + 1,
                        max_attempts = self.config.max_reconnect_attempts,
                        delay_ms = duration_ms(delay),
                        "reconnect scheduled"
                    );
                    self.scheduled = Some(ScheduledConnect {
                        at: Instant::now() + delay,
                        counts_as_attempt: true,
                    });
                } else {
                    error!(attempts, "reconnect attempts exhausted");
                    self.status.last_error = Some(NetworkError::ReconnectExhausted { attempts });
                    self.status.state = ConnectionState::Errored;
                    self.scheduled = None;
                }
            }
            CloseKind::Rejected { error } => {
                self.status.last_error = Some(error.clone());
                reported_error = Some(error);
                self.status.state = ConnectionState::Errored;
                self.scheduled = None;
            }
        }
        self.status.since = chrono::Utc::now();
        self.publish();

        if had_link {
            let details = DisconnectReason {
                code,
                reason,
                initiated_by_client,
                will_reconnect: self.scheduled.is_some(),
            };
            let callback = self.callbacks.read().on_disconnect.clone();
            if let Some(callback) = callback {
                invoke_guarded("on_disconnect", || callback(&details));
            }
        }
        if let Some(error) = reported_error {
            let callback = self.callbacks.read().on_error.clone();
            if let Some(callback) = callback {
                invoke_guarded("on_error", || callback(&error));
            }
        }
    }

    // ---- outbound and status ---------------------------------------------

    fn send_envelope(&self, envelope: &Envelope) -> bool {
        match envelope.to_json() {
            Ok(text) => self.send_text(text),
            Err(e) => {
                warn!(error = %e, message_type = %envelope.message_type, "failed to encode message");
                false
            }
        }
    }

    fn send_text(&self, text: String) -> bool {
        trace!(frame = %self.masker.mask_string(&text), "outbound frame");
        self.send_frame(WebSocketMessage::Text(text))
    }

    fn send_frame(&self, frame: WebSocketMessage) -> bool {
        match &self.link {
            Some(link) => link.send(frame),
            None => false,
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.status.state != state {
            debug!(from = %self.status.state, to = %state, "state transition");
            self.status.state = state;
            self.status.since = chrono::Utc::now();
        }
        self.publish();
    }

    fn publish(&self) {
        let status = self.status.clone();
        let changed = self.status_tx.send_if_modified(|current| {
            if current.same_as(&status) {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if changed {
            let callback = self.callbacks.read().on_status_change.clone();
            if let Some(callback) = callback {
                invoke_guarded("on_status_change", || callback(&status));
            }
        }
    }
}

async fn poll_pending(pending: &mut Option<BoxFuture<'static, Step>>) -> Step {
    match pending {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn recv_frame(link: &mut Option<Link>) -> Option<WebSocketMessage> {
    match link {
        Some(link) => link.inbound.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

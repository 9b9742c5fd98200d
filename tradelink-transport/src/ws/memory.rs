//! In-process connector for tests and demos.
//!
//! Every successful connect hands a [`ServerEnd`] to the paired
//! [`MemoryServer`], which plays the remote endpoint.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;
use tradelink_core::error::NetworkError;

use super::connector::{Connector, Link};
use super::message::WebSocketMessage;
use crate::config::TransportConfig;
use crate::envelope::Envelope;

const LINK_BUFFER: usize = 256;

#[derive(Debug)]
struct Shared {
    accept_tx: mpsc::UnboundedSender<ServerEnd>,
    attempts: AtomicU32,
    fail_remaining: AtomicU32,
    stall_remaining: AtomicU32,
}

/// Connector whose links terminate in the paired [`MemoryServer`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

/// Accepts links opened through a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryServer {
    accept_rx: mpsc::UnboundedReceiver<ServerEnd>,
}

/// Remote side of one in-process link.
///
/// Dropping it looks to the client like a transport that vanished without
/// a close frame.
#[derive(Debug)]
pub struct ServerEnd {
    to_client: mpsc::Sender<WebSocketMessage>,
    from_client: mpsc::UnboundedReceiver<WebSocketMessage>,
}

impl MemoryConnector {
    /// Creates a connector and its server.
    #[must_use]
    pub fn new() -> (Self, MemoryServer) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(Shared {
                accept_tx,
                attempts: AtomicU32::new(0),
                fail_remaining: AtomicU32::new(0),
                stall_remaining: AtomicU32::new(0),
            }),
        };
        (connector, MemoryServer { accept_rx })
    }

    /// Refuses the next `n` connects.
    pub fn fail_next(&self, n: u32) {
        self.shared.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` connects hang until the caller gives up.
    pub fn stall_next(&self, n: u32) {
        self.shared.stall_remaining.store(n, Ordering::SeqCst);
    }

    /// Connect calls so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _config: &TransportConfig) -> Result<Link, NetworkError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        if Self::take_one(&self.shared.stall_remaining) {
            std::future::pending::<()>().await;
        }
        if Self::take_one(&self.shared.fail_remaining) {
            return Err(NetworkError::ConnectionFailed {
                reason: "connection refused".to_string(),
            });
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(LINK_BUFFER);
        let server_end = ServerEnd {
            to_client: inbound_tx,
            from_client: outbound_rx,
        };
        self.shared
            .accept_tx
            .send(server_end)
            .map_err(|_| NetworkError::ConnectionFailed {
                reason: "memory server is gone".to_string(),
            })?;

        Ok(Link::new(outbound_tx, inbound_rx))
    }
}

impl MemoryServer {
    /// Waits for the next link.
    pub async fn accept(&mut self) -> Option<ServerEnd> {
        self.accept_rx.recv().await
    }
}

impl ServerEnd {
    /// Sends a raw frame. Returns false if the client dropped the link.
    pub async fn send(&self, message: WebSocketMessage) -> bool {
        self.to_client.send(message).await.is_ok()
    }

    /// Sends a text frame.
    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(WebSocketMessage::text(text)).await
    }

    /// Sends a JSON value as a text frame.
    pub async fn send_json(&self, value: &Value) -> bool {
        self.send_text(value.to_string()).await
    }

    /// Sends an envelope.
    pub async fn send_envelope(&self, envelope: &Envelope) -> bool {
        match envelope.to_json() {
            Ok(text) => self.send_text(text).await,
            Err(_) => false,
        }
    }

    /// Sends a close frame.
    pub async fn close(&self, code: u16, reason: &str) -> bool {
        self.send(WebSocketMessage::close(code, reason)).await
    }

    /// Next frame from the client; `None` once the client dropped the link.
    pub async fn recv(&mut self) -> Option<WebSocketMessage> {
        self.from_client.recv().await
    }

    /// Next parseable text frame from the client.
    ///
    /// Returns `None` when the client closes or drops the link.
    pub async fn recv_envelope(&mut self) -> Option<Envelope> {
        loop {
            match self.recv().await? {
                WebSocketMessage::Text(text) => {
                    if let Ok(envelope) = Envelope::parse(&text) {
                        return Some(envelope);
                    }
                }
                WebSocketMessage::Close(_) => return None,
                _ => {}
            }
        }
    }

    /// Reads the client's handshake and acknowledges it.
    pub async fn accept_handshake(&mut self) -> Option<Envelope> {
        let hello = self.recv_envelope().await?;
        let ack = Envelope::new("status").with_status("connected");
        self.send_envelope(&ack).await.then_some(hello)
    }

    /// Frames the client sent that are already queued, without waiting.
    pub fn drain(&mut self) -> Vec<WebSocketMessage> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> TransportConfig {
        TransportConfig::builder()
            .endpoint_url("ws://memory/ws")
            .build()
    }

    #[tokio::test]
    async fn test_link_round_trip() {
        let (connector, mut server) = MemoryConnector::new();
        let mut link = connector.connect(&config()).await.unwrap();
        let mut end = server.accept().await.unwrap();

        assert!(link.send(WebSocketMessage::text(r#"{"type":"hello"}"#)));
        assert_eq!(end.recv_envelope().await.unwrap().message_type, "hello");

        assert!(end.send_json(&json!({"type": "pong"})).await);
        assert_eq!(
            link.inbound.recv().await,
            Some(WebSocketMessage::text(r#"{"type":"pong"}"#))
        );
    }

    #[tokio::test]
    async fn test_fail_next() {
        let (connector, _server) = MemoryConnector::new();
        connector.fail_next(2);
        assert!(connector.connect(&config()).await.is_err());
        assert!(connector.connect(&config()).await.is_err());
        assert!(connector.connect(&config()).await.is_ok());
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test]
    async fn test_dropping_server_end_ends_inbound() {
        let (connector, mut server) = MemoryConnector::new();
        let mut link = connector.connect(&config()).await.unwrap();
        drop(server.accept().await.unwrap());
        assert_eq!(link.inbound.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_envelope_stops_at_close() {
        let (connector, mut server) = MemoryConnector::new();
        let link = connector.connect(&config()).await.unwrap();
        let mut end = server.accept().await.unwrap();

        link.send(WebSocketMessage::text("garbage"));
        link.send(WebSocketMessage::close(1000, "bye"));
        assert!(end.recv_envelope().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_without_server_fails() {
        let (connector, server) = MemoryConnector::new();
        drop(server);
        assert!(connector.connect(&config()).await.is_err());
    }
}

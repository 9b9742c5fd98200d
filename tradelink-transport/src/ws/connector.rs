//! Link abstraction and the WebSocket connector.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};
use tradelink_core::error::NetworkError;

use super::message::{CloseReason, WebSocketMessage};
use crate::config::TransportConfig;

/// Frames buffered from the remote side before the pump waits.
const INBOUND_BUFFER: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open duplex link: frames to send and frames received.
///
/// Dropping the link closes it. When the remote side goes away the inbound
/// channel ends, after a `Close` frame if one was received.
#[derive(Debug)]
pub struct Link {
    /// Frames to send.
    pub outbound: mpsc::UnboundedSender<WebSocketMessage>,
    /// Frames received.
    pub inbound: mpsc::Receiver<WebSocketMessage>,
}

impl Link {
    /// Creates a link from its two channel halves.
    #[must_use]
    pub fn new(
        outbound: mpsc::UnboundedSender<WebSocketMessage>,
        inbound: mpsc::Receiver<WebSocketMessage>,
    ) -> Self {
        Self { outbound, inbound }
    }

    /// Queues one frame. Returns false if the link is gone.
    pub fn send(&self, message: WebSocketMessage) -> bool {
        self.outbound.send(message).is_ok()
    }
}

/// Opens links to the remote endpoint.
///
/// The connection task applies `connect_timeout_ms` around every call.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens one link.
    async fn connect(&self, config: &TransportConfig) -> Result<Link, NetworkError>;
}

/// Connector for `ws://` and `wss://` endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates the connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, config: &TransportConfig) -> Result<Link, NetworkError> {
        let mut request = config
            .endpoint_url
            .as_str()
            .into_client_request()
            .map_err(|e| NetworkError::ConnectionFailed {
                reason: format!("invalid endpoint: {e}"),
            })?;

        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                NetworkError::ConnectionFailed {
                    reason: format!("invalid header name {key}: {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| NetworkError::ConnectionFailed {
                reason: format!("invalid header value for {key}: {e}"),
            })?;
            request.headers_mut().insert(name, value);
        }

        let (stream, response) =
            connect_async(request)
                .await
                .map_err(|e| NetworkError::ConnectionFailed {
                    reason: e.to_string(),
                })?;

        info!(
            endpoint = %config.endpoint_url,
            status = response.status().as_u16(),
            "WebSocket transport open"
        );

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        tokio::spawn(pump(stream, outbound_rx, inbound_tx));

        Ok(Link::new(outbound_tx, inbound_rx))
    }
}

/// Moves frames between the socket and the link channels until either side ends.
async fn pump(
    stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<WebSocketMessage>,
    inbound: mpsc::Sender<WebSocketMessage>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outgoing = outbound.recv() => {
                let Some(message) = outgoing else {
                    debug!("link dropped, closing socket");
                    let _ = sink.close().await;
                    break;
                };
                let closing = message.is_close();
                if let Err(e) = sink.send(to_tungstenite(message)).await {
                    warn!(error = %e, "failed to send frame");
                    break;
                }
                if closing {
                    let _ = sink.flush().await;
                    break;
                }
            }

            incoming = source.next() => {
                match incoming {
                    Some(Ok(TungsteniteMessage::Ping(data))) => {
                        if let Err(e) = sink.send(TungsteniteMessage::Pong(data)).await {
                            warn!(error = %e, "failed to answer transport ping");
                        }
                    }
                    Some(Ok(message)) => {
                        let Some(frame) = from_tungstenite(message) else {
                            continue;
                        };
                        let closing = frame.is_close();
                        if inbound.send(frame).await.is_err() || closing {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket read failed");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }
}

fn to_tungstenite(message: WebSocketMessage) -> TungsteniteMessage {
    match message {
        WebSocketMessage::Text(text) => TungsteniteMessage::text(text),
        WebSocketMessage::Binary(data) => TungsteniteMessage::binary(data),
        WebSocketMessage::Ping(data) => TungsteniteMessage::Ping(data.into()),
        WebSocketMessage::Pong(data) => TungsteniteMessage::Pong(data.into()),
        WebSocketMessage::Close(reason) => TungsteniteMessage::Close(reason.map(|r| CloseFrame {
            code: CloseCode::from(r.code),
            reason: r.reason.into(),
        })),
    }
}

fn from_tungstenite(message: TungsteniteMessage) -> Option<WebSocketMessage> {
    match message {
        TungsteniteMessage::Text(text) => Some(WebSocketMessage::Text(text.as_str().to_owned())),
        TungsteniteMessage::Binary(data) => Some(WebSocketMessage::Binary(data.to_vec())),
        TungsteniteMessage::Ping(data) => Some(WebSocketMessage::Ping(data.to_vec())),
        TungsteniteMessage::Pong(data) => Some(WebSocketMessage::Pong(data.to_vec())),
        TungsteniteMessage::Close(frame) => Some(WebSocketMessage::Close(frame.map(|f| {
            CloseReason::new(u16::from(f.code), f.reason.as_str())
        }))),
        TungsteniteMessage::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_conversion() {
        let text = to_tungstenite(WebSocketMessage::text("hello"));
        assert!(matches!(&text, TungsteniteMessage::Text(t) if t.as_str() == "hello"));
        assert_eq!(from_tungstenite(text), Some(WebSocketMessage::text("hello")));

        let binary = to_tungstenite(WebSocketMessage::binary(vec![1, 2, 3]));
        assert_eq!(
            from_tungstenite(binary),
            Some(WebSocketMessage::binary(vec![1, 2, 3]))
        );
    }

    #[test]
    fn test_close_code_survives_conversion() {
        let close = to_tungstenite(WebSocketMessage::close(4001, "liveness failure"));
        let back = from_tungstenite(close).unwrap();
        assert_eq!(back.close_code(), Some(4001));

        let bare = from_tungstenite(TungsteniteMessage::Close(None)).unwrap();
        assert_eq!(bare, WebSocketMessage::Close(None));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_fails_fast() {
        let config = TransportConfig::builder().endpoint_url("not a url").build();
        let result = WebSocketConnector::new().connect(&config).await;
        assert!(matches!(result, Err(NetworkError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_invalid_header_rejected() {
        let config = TransportConfig::builder()
            .endpoint_url("ws://127.0.0.1:1/ws")
            .header("bad header", "x")
            .build();
        let result = WebSocketConnector::new().connect(&config).await;
        match result {
            Err(NetworkError::ConnectionFailed { reason }) => {
                assert!(reason.contains("header"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

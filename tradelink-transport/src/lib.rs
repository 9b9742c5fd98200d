//! # Tradelink Transport
//!
//! Real-time duplex transport client for the trading platform.
//!
//! This crate provides:
//! - A connection task with handshake, liveness probing and bounded
//!   exponential-backoff reconnects
//! - Subscription bookkeeping that survives reconnects
//! - Request/response correlation with per-request deadlines
//! - Message classification and callback / listener fan-out
//! - A REST client for the secondary request channel
//!
//! # Architecture
//!
//! - `client` - the [`TransportClient`] handle and the connection task
//! - `ws` - links, connectors and connection state
//! - `config` / `envelope` - settings and the wire message
//! - `correlator`, `subscription`, `liveness`, `listener`, `classifier` -
//!   passive components owned by the connection task
//! - `rest` - REST client, credential and anti-forgery token contracts
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
//!     .callbacks(Callbacks::new().with_signal(|s| println!("{s:?}")))
//!     .build()?;
//! client.connect().await?;
//! ```

#![warn(missing_docs)]

/// Callback slots and disconnect details
pub mod callbacks;

/// Message type allow-list and routing
pub mod classifier;

/// Transport client handle
pub mod client;

/// Transport configuration
pub mod config;

/// Request/response correlation
pub mod correlator;

/// Wire message
pub mod envelope;

/// Listener registry with disposers
pub mod listener;

/// Liveness probing
pub mod liveness;

/// REST client infrastructure
pub mod rest;

/// Subscription registry
pub mod subscription;

/// Links, connectors and connection state
pub mod ws;

pub use callbacks::{Callbacks, DisconnectReason};
pub use client::{SubscribeOutcome, TransportClient, TransportClientBuilder};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use envelope::Envelope;
pub use listener::{Disposer, Listener, ListenerStats};
pub use subscription::{SubscriptionInfo, SubscriptionStatus, SubscriptionSummary};
pub use ws::{ConnectionState, ConnectionStatus};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::callbacks::{Callbacks, DisconnectReason};
    pub use crate::client::{SubscribeOutcome, TransportClient, TransportClientBuilder};
    pub use crate::config::{TransportConfig, TransportConfigBuilder};
    pub use crate::envelope::Envelope;
    pub use crate::listener::{Disposer, Listener};
    pub use crate::rest::{
        CachedCsrfToken, CredentialCoordinator, CsrfTokenSource, RestClient, RestConfig,
        StaticCredentials,
    };
    pub use crate::ws::{
        ConnectionState, ConnectionStatus, Connector, MemoryConnector, WebSocketConnector,
    };
}

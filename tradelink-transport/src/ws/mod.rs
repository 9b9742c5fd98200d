//! Duplex link plumbing.
//!
//! - [`Connector`] opens a [`Link`]: a pair of frame channels
//! - [`WebSocketConnector`] backs links with tokio-tungstenite
//! - [`MemoryConnector`] backs links with an in-process [`ServerEnd`]
//! - [`ConnectionState`] / [`ConnectionStatus`] describe the connection task

mod connector;
mod memory;
mod message;
mod state;

pub use connector::{Connector, Link, WebSocketConnector};
pub use memory::{MemoryConnector, MemoryServer, ServerEnd};
pub use message::{
    CLOSE_HANDSHAKE_REJECTED, CLOSE_HANDSHAKE_TIMEOUT, CLOSE_LIVENESS_FAILURE, CLOSE_NORMAL,
    CloseClass, CloseReason, WebSocketMessage,
};
pub use state::{ConnectionState, ConnectionStatus};

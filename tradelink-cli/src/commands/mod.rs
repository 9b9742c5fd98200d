//! Subcommand implementations.

pub mod config;
pub mod request;
pub mod watch;

use std::sync::Arc;

use tradelink_transport::rest::StaticCredentials;
use tradelink_transport::{Callbacks, TransportClient, TransportConfig};

/// Builds a WebSocket client that presents `token` when one is given.
pub(crate) fn build_client(
    config: TransportConfig,
    token: Option<String>,
    callbacks: Callbacks,
) -> anyhow::Result<TransportClient> {
    let client = TransportClient::builder(config)
        .credentials(Arc::new(StaticCredentials::new(token)))
        .callbacks(callbacks)
        .build()?;
    Ok(client)
}

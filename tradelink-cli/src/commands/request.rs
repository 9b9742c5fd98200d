//! Sends one correlated request and prints the response.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use tradelink_transport::{Callbacks, ConnectionState, Envelope};

use super::build_client;
use crate::settings::Settings;

/// Arguments for the request command
#[derive(Parser)]
pub struct RequestArgs {
    /// WebSocket endpoint (overrides the config file)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Message type of the request
    #[arg(short = 't', long = "type")]
    pub message_type: String,

    /// JSON payload
    #[arg(short, long)]
    pub data: Option<String>,

    /// Response deadline in milliseconds (defaults to the configured one)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Session token presented during the handshake
    #[arg(long)]
    pub token: Option<String>,
}

/// Parses the `--data` payload.
fn parse_data(data: Option<&str>) -> Result<Option<Value>> {
    data.map(serde_json::from_str::<Value>)
        .transpose()
        .context("--data is not valid JSON")
}

/// Connects, sends the request, prints the response, and disconnects.
pub async fn run(args: RequestArgs, settings: Settings) -> Result<()> {
    let data = parse_data(args.data.as_deref())?;
    let transport = &settings.transport;
    let connect_deadline = transport.connect_timeout() + transport.handshake_timeout();
    let timeout = args
        .timeout_ms
        .map_or_else(|| transport.request_timeout(), Duration::from_millis);

    let client = build_client(settings.transport.clone(), args.token, Callbacks::new())?;
    client.connect().await?;

    if !client
        .wait_for_state(ConnectionState::Authenticated, connect_deadline)
        .await
    {
        let status = client.status();
        client.dispose().await;
        match status.last_error {
            Some(error) => bail!("not connected: {error}"),
            None => bail!("not connected after {}ms", connect_deadline.as_millis()),
        }
    }

    let mut envelope = Envelope::new(args.message_type);
    if let Some(data) = data {
        envelope = envelope.with_data(data);
    }

    let result = client.request_with_timeout(envelope, timeout).await;
    client.dispose().await;

    let response = result?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

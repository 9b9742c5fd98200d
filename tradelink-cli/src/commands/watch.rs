//! Streams routed messages as JSON lines.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tradelink_transport::{
    Callbacks, ConnectionState, DisconnectReason, Envelope, Listener, SubscribeOutcome,
};

use super::build_client;
use crate::settings::Settings;

/// Arguments for the watch command
#[derive(Parser)]
pub struct WatchArgs {
    /// WebSocket endpoint (overrides the config file)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Topic to subscribe to; repeat for more
    #[arg(short, long = "topic")]
    pub topics: Vec<String>,

    /// Session token presented during the handshake
    #[arg(long)]
    pub token: Option<String>,
}

fn print_line(route: &str, envelope: &Envelope) {
    println!("{}", json!({ "route": route, "message": envelope }));
}

fn printer(route: &'static str) -> impl Fn(&Envelope) + Send + Sync + 'static {
    move |envelope: &Envelope| print_line(route, envelope)
}

fn callbacks() -> Callbacks {
    Callbacks::new()
        .with_market_data(printer("market_data"))
        .with_indicators(printer("indicators"))
        .with_signal(printer("signal"))
        .with_strategy_update(printer("strategy_update"))
        .with_health_check(printer("health_check"))
        .with_data(printer("data"))
        .with_command(printer("command"))
        .with_message(printer("message"))
        .with_connect(|| info!("connected"))
        .with_disconnect(|reason: &DisconnectReason| {
            warn!(
                code = ?reason.code,
                reason = %reason.reason,
                will_reconnect = reason.will_reconnect,
                "disconnected"
            );
        })
        .with_slow_connection(|missed| warn!(missed, "connection is slow"))
}

/// Connects, subscribes and prints until Ctrl-C or a terminal failure.
pub async fn run(args: WatchArgs, settings: Settings) -> Result<()> {
    let client = build_client(settings.transport, args.token, callbacks())?;

    let session: Listener<Envelope> = Arc::new(|envelope: &Envelope| print_line("session", envelope));
    let _session = client.register_session_listener(Some(session), "cli");

    for topic in &args.topics {
        if client.subscribe(topic.as_str(), None).await == SubscribeOutcome::Ignored {
            warn!(topic = %topic, "ignoring blank topic");
        }
    }

    client.connect().await?;

    let mut status = client.status_watch();
    let errored = async { status.wait_for(|s| s.state == ConnectionState::Errored).await.is_ok() };

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("interrupted, closing connection");
        }
        failed = errored => {
            if failed {
                let status = client.status();
                client.dispose().await;
                match status.last_error {
                    Some(error) => bail!("connection failed: {error}"),
                    None => bail!("connection failed"),
                }
            }
        }
    }

    client.log_subscription_summary().await;
    client.dispose().await;
    Ok(())
}

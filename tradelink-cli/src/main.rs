//! # Tradelink CLI
//!
//! Command-line client for the Tradelink duplex transport.
//!
//! This CLI provides commands for:
//! - Watching subscribed topics as JSON lines
//! - Sending a single correlated request
//! - Showing the effective configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tradelink_telemetry::logging::{LogFormat, init_logging};

use commands::{config, request, watch};

/// Tradelink - real-time duplex transport client
#[derive(Parser)]
#[command(name = "tradelink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (.yaml, .toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log format: json, pretty or compact
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to topics and print routed messages until Ctrl-C
    Watch(watch::WatchArgs),

    /// Send one correlated request and print the response
    Request(request::RequestArgs),

    /// Validate and print the effective configuration
    Config,
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        "compact" => Ok(LogFormat::Compact),
        other => anyhow::bail!("unknown log format '{other}' (expected json, pretty or compact)"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let url = match &cli.command {
        Commands::Watch(args) => args.url.as_deref(),
        Commands::Request(args) => args.url.as_deref(),
        Commands::Config => None,
    };
    let settings = settings::load(cli.config.as_deref(), url)?;

    let mut log_config = settings.logging.clone();
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    if let Some(format) = cli.log_format.as_deref() {
        log_config.format = parse_log_format(format)?;
    }

    match cli.command {
        Commands::Config => config::run(&settings)?,
        Commands::Watch(args) => {
            let _guards = init_logging(&log_config)?;
            watch::run(args, settings).await?;
        }
        Commands::Request(args) => {
            let _guards = init_logging(&log_config)?;
            request::run(args, settings).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_arguments() {
        let cli = Cli::try_parse_from([
            "tradelink", "watch", "--url", "ws://localhost:8080/ws", "--topic", "BTCUSDT",
            "--topic", "ETHUSDT", "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.url.as_deref(), Some("ws://localhost:8080/ws"));
                assert_eq!(args.topics, vec!["BTCUSDT", "ETHUSDT"]);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_request_arguments() {
        let cli = Cli::try_parse_from([
            "tradelink", "request", "--type", "get_positions", "--data", "{}", "--timeout-ms",
            "500",
        ])
        .unwrap();

        match cli.command {
            Commands::Request(args) => {
                assert_eq!(args.message_type, "get_positions");
                assert_eq!(args.timeout_ms, Some(500));
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(parse_log_format("Compact").unwrap(), LogFormat::Compact);
        assert!(parse_log_format("xml").is_err());
    }
}

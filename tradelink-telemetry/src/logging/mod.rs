//! Structured logging system for Tradelink.
//!
//! Provides configurable logging with support for:
//! - JSON and pretty-print formats
//! - Stdout and rolling file outputs
//! - `RUST_LOG` overrides of the configured level

mod config;

pub use config::{LogConfig, LogFormat, LogOutput, RotationConfig};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

const LOG_FILE_NAME: &str = "tradelink.log";

/// Initialize the logging system with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the program
/// so that buffered file output is flushed.
///
/// # Example
///
/// ```no_run
/// use tradelink_telemetry::logging::{init_logging, LogConfig};
///
/// let config = LogConfig::default();
/// let _guards = init_logging(&config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let mut guards = Vec::new();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidConfig(format!("level '{}': {e}", config.level)))?,
    };

    let mut layers: Vec<BoxedLayer<_>> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => layers.push(create_stdout_layer(config)),
            LogOutput::File { path, rotation } => {
                std::fs::create_dir_all(path)?;
                let (layer, guard) = create_file_layer(config, path, rotation.as_ref());
                layers.push(layer);
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

fn span_events(config: &LogConfig) -> FmtSpan {
    if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn create_stdout_layer<S>(config: &LogConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let base_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config));

    match config.format {
        LogFormat::Json => Box::new(base_layer.json().flatten_event(true)),
        LogFormat::Pretty => Box::new(base_layer.pretty()),
        LogFormat::Compact => Box::new(base_layer.compact()),
    }
}

fn create_file_layer<S>(
    config: &LogConfig,
    path: &str,
    rotation: Option<&RotationConfig>,
) -> (BoxedLayer<S>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let file_appender = match rotation.copied().unwrap_or_default() {
        RotationConfig::Hourly => tracing_appender::rolling::hourly(path, LOG_FILE_NAME),
        RotationConfig::Daily => tracing_appender::rolling::daily(path, LOG_FILE_NAME),
        RotationConfig::Never => tracing_appender::rolling::never(path, LOG_FILE_NAME),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Files are always JSON regardless of the stdout format.
    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config))
        .json()
        .flatten_event(true);

    (Box::new(layer), guard)
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber was already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_reported() {
        // Only reachable when RUST_LOG is unset; skip otherwise.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LogConfig {
            level: "tradelink=loud".to_string(),
            ..LogConfig::default()
        };
        let err = init_logging(&config).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidConfig(_)));
    }
}

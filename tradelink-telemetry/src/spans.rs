//! Span definitions for tracing.
//!
//! Provides pre-defined spans for the transport client:
//! - Connection attempts
//! - Correlated requests
//! - Secondary REST calls

use tracing::{Span, info_span};

/// Create a span covering one connection attempt.
///
/// # Example
///
/// ```
/// use tradelink_telemetry::spans::connection_span;
///
/// let span = connection_span("wss://example.com/ws", 2);
/// let _guard = span.enter();
/// // ... open and handshake
/// ```
#[must_use]
pub fn connection_span(endpoint: &str, attempt: u32) -> Span {
    info_span!(
        "connection",
        endpoint = %endpoint,
        attempt = attempt,
        otel.kind = "client"
    )
}

/// Create a span for a correlated request.
#[must_use]
pub fn request_span(request_id: &str, message_type: &str) -> Span {
    info_span!(
        "request",
        request_id = %request_id,
        message_type = %message_type
    )
}

/// Create a span for a REST call on the secondary channel.
///
/// # Example
///
/// ```
/// use tradelink_telemetry::spans::rest_span;
///
/// let span = rest_span("POST", "/api/strategies");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn rest_span(method: &str, path: &str) -> Span {
    info_span!(
        "rest",
        method = %method,
        path = %path,
        otel.kind = "client"
    )
}

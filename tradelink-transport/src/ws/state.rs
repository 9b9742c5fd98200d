//! Connection state machine values and the observable status snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradelink_core::error::NetworkError;

/// Connection state.
///
/// `Disconnected → Connecting → Open → Handshaking → Authenticated`; any state
/// may move to `Errored` or through `Closing` back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live connection.
    #[default]
    Disconnected,
    /// Transport connect in flight.
    Connecting,
    /// Transport open; session check in progress.
    Open,
    /// Handshake sent; awaiting acknowledgment.
    Handshaking,
    /// Handshake acknowledged; regular traffic flows.
    Authenticated,
    /// Deliberate close in progress.
    Closing,
    /// Terminal for this attempt; needs a caller-initiated reconnect.
    Errored,
}

impl ConnectionState {
    /// Returns true once the handshake has been acknowledged.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Returns true while a connection attempt or live connection exists.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Open | Self::Handshaking | Self::Authenticated | Self::Closing
        )
    }

    /// Returns true if the state is `Disconnected` or `Errored`.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        !self.is_active()
    }

    /// Lower-case name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Handshaking => "handshaking",
            Self::Authenticated => "authenticated",
            Self::Closing => "closing",
            Self::Errored => "errored",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable connection status, republished on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Current state.
    pub state: ConnectionState,
    /// Automatic reconnect attempts since the last successful handshake.
    pub reconnect_attempts: u32,
    /// Most recent connection-level error.
    pub last_error: Option<NetworkError>,
    /// Whether the holder has proven identity; survives disconnects.
    pub is_authenticated: bool,
    /// When `state` last changed.
    pub since: DateTime<Utc>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            last_error: None,
            is_authenticated: false,
            since: Utc::now(),
        }
    }
}

impl ConnectionStatus {
    /// Returns true when nothing but the timestamp differs.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.state == other.state
            && self.reconnect_attempts == other.reconnect_attempts
            && self.last_error == other.last_error
            && self.is_authenticated == other.is_authenticated
    }
}

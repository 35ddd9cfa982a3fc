//! Session types: the server's record of one live browser connection.
//!
//! A session tracks:
//! - WHICH connection it is (`ConnectionId`)
//! - HOW to reach it (the sending half of its outbound queue)
//! - WHEN it connected (for logging how long it lived)

use std::time::{Duration, Instant};

use tether_protocol::ServerEvent;
use tether_transport::ConnectionId;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// Sensible defaults are provided; create one with
/// `SessionConfig::default()` and override just the fields you care about.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a connection may stay silent before the
    /// server closes it. Browsers heartbeat every few seconds, so a
    /// minute of silence means the tab is gone.
    ///
    /// Default: 60 seconds.
    pub idle_timeout_secs: u64,
}

impl SessionConfig {
    /// The idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single connected browser session.
///
/// Created when a WebSocket handshake completes, removed when the
/// connection closes. There is no "disconnected but resumable" state:
/// a browser that comes back opens a new session and rejoins its room.
#[derive(Debug, Clone)]
pub struct Session {
    /// The connection this session belongs to.
    pub id: ConnectionId,

    /// Sending half of the session's outbound queue.
    ///
    /// Unbounded so that pushing an event never waits on a slow browser;
    /// the connection's writer task drains it in FIFO order.
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// When the session was registered.
    pub connected_at: Instant,
}

impl Session {
    /// How long the session has been connected.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

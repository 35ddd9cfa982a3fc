//! Core protocol types for Tether's wire format.
//!
//! Every frame on the signaling socket is a JSON object of the form
//! `{"event": "<name>", "data": {...}}`. Inbound frames decode into
//! [`ClientEvent`], outbound frames are built from [`ServerEvent`].
//!
//! Browsers are sloppy about optional fields (`null`, missing keys,
//! `undefined` dropped by `JSON.stringify`), so every inbound field is an
//! `Option` with `#[serde(default)]`. The relay decides what a missing
//! value means; decoding never fails because a field is absent.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a room: an opaque, short random token.
///
/// `#[serde(transparent)]` serializes `RoomId("a1B2c3D4")` as the bare
/// string `"a1B2c3D4"`, which is what browser clients put in URLs.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a string as a room identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the identifier is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identity of a peer within a room.
///
/// Stable across reconnects: a browser that rejoins with the same peer id
/// is the same peer as far as the relay is concerned.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps a string as a peer identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the identifier is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// ClientEvent: browser → relay
// ---------------------------------------------------------------------------

/// Events a browser session sends to the relay.
///
/// `#[serde(tag = "event", content = "data")]` produces "adjacently
/// tagged" JSON:
///   `{ "event": "heartbeat", "data": { "room_id": "r1", "peer_id": "p1" } }`
/// Unit variants may omit `data` entirely: `{ "event": "status" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Attach this session to a room, optionally under a known peer id.
    JoinRoom {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        peer_id: Option<PeerId>,
    },

    /// Forward an opaque negotiation payload to one peer.
    Signal {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        to: Option<PeerId>,
        #[serde(default)]
        from: Option<PeerId>,
        #[serde(default)]
        signal: Value,
    },

    /// A file-listing announcement. Forwarded verbatim to the whole room;
    /// only `room_id` is read by the relay.
    FileList(Value),

    /// Liveness ping from a registered peer.
    Heartbeat {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        peer_id: Option<PeerId>,
    },

    /// Ask the relay to create a fresh room.
    CreateRoom,

    /// Ask for the health/status report.
    Status,
}

impl ClientEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::Signal { .. } => "signal",
            Self::FileList(_) => "file_list",
            Self::Heartbeat { .. } => "heartbeat",
            Self::CreateRoom => "create_room",
            Self::Status => "status",
        }
    }
}

/// Reads the `room_id` out of an opaque announcement such as `file_list`.
pub fn room_of(payload: &Value) -> Option<RoomId> {
    payload
        .get("room_id")
        .and_then(Value::as_str)
        .map(RoomId::from)
}

// ---------------------------------------------------------------------------
// ServerEvent: relay → browser
// ---------------------------------------------------------------------------

/// Events the relay sends to browser sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full membership of a room, broadcast after every join.
    RoomPeers { peers: Vec<PeerId> },

    /// A peer joined (or rejoined) the room.
    PeerJoined { peer_id: PeerId },

    /// Private acknowledgement of a join with the assigned identity.
    Registered { peer_id: PeerId, peers: Vec<PeerId> },

    /// A peer left, timed out, or its room was reclaimed.
    PeerDisconnected { peer_id: PeerId },

    /// A relayed negotiation payload. `signal` is passed through untouched.
    Signal { from: Option<PeerId>, signal: Value },

    /// A relayed file-listing announcement, exactly as the sender wrote it.
    FileList(Value),

    /// Heartbeat reply with the room's current peers.
    ActivePeers { peers: Vec<PeerId> },

    /// Reply to `create_room`.
    RoomCreated { room_id: RoomId },

    /// Reply to `status`.
    Status(StatusReport),

    /// Something the client asked for could not be done.
    Error { message: String },
}

impl ServerEvent {
    /// Creates an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The error clients receive for an unknown room.
    pub fn room_not_found() -> Self {
        Self::error("Room not found")
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomPeers { .. } => "room_peers",
            Self::PeerJoined { .. } => "peer_joined",
            Self::Registered { .. } => "registered",
            Self::PeerDisconnected { .. } => "peer_disconnected",
            Self::Signal { .. } => "signal",
            Self::FileList(_) => "file_list",
            Self::ActivePeers { .. } => "active_peers",
            Self::RoomCreated { .. } => "room_created",
            Self::Status(_) => "status",
            Self::Error { .. } => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Status report
// ---------------------------------------------------------------------------

/// Read-only projection of the room registry for health checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Always `"healthy"` when the relay can answer at all.
    pub status: String,
    /// Number of rooms in the registry.
    pub active_rooms_count: usize,
    /// Sum of peer counts over all rooms.
    pub total_peer_count: usize,
    /// Per-room details, ordered by room id.
    pub active_rooms: Vec<RoomStatus>,
}

/// One room's entry in a [`StatusReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStatus {
    pub room_id: RoomId,
    pub peer_count: usize,
    pub peers: Vec<PeerId>,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: f64,
    /// Seconds since creation at the time of the report.
    pub age_secs: f64,
}

// =========================================================================
// Tests
// =========================================================================

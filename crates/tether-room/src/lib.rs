//! Room registry, presence tracking, and signal routing for Tether.
//!
//! All relay state lives in one [`RoomRegistry`]: rooms, the peers present
//! in each room, and the session each peer is currently reachable on. The
//! registry is a plain struct; the server puts it behind a single async
//! mutex and calls its methods.
//!
//! Operations never send anything themselves. They return the events to
//! deliver as `(ConnectionId, ServerEvent)` pairs, and the caller dispatches
//! them after releasing the lock.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: create/look up/delete rooms, join, heartbeat,
//!   disconnect, relay, sweep, status
//! - [`Room`] / [`PeerRecord`]: one room and one member's presence
//! - [`PresenceConfig`]: liveness window, room age limit, id length
//! - [`Clock`]: time source ([`SystemClock`], [`ManualClock`] for tests)
//! - [`RegistrySnapshot`] / [`SnapshotStore`]: persistence

mod clock;
mod config;
mod error;
mod persist;
mod presence;
mod registry;
mod room;
mod router;
mod snapshot;
mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PresenceConfig;
pub use error::{PersistError, RoomError};
pub use persist::{load_snapshot, JsonFileStore, MemoryStore, SnapshotStore};
pub use presence::{DisconnectOutcome, HeartbeatOutcome, JoinOutcome};
pub use registry::RoomRegistry;
pub use room::{PeerRecord, Room};
pub use snapshot::{PeerSnapshot, RegistrySnapshot, RoomSnapshot};
pub use sweep::SweepReport;

/// One event addressed to one session.
pub type Delivery = (tether_transport::ConnectionId, tether_protocol::ServerEvent);

//! # Tether
//!
//! A rendezvous and signaling relay for browser peers.
//!
//! Browsers that want to talk to each other directly first meet here: they
//! join a short-lived room, learn who else is in it, and exchange opaque
//! connection-negotiation payloads through the relay. Once their direct
//! channel is up the relay is out of the data path; it only keeps track of
//! who is still around.
//!
//! The crates underneath split the work the usual way:
//!
//! - `tether-transport`: the HTTP/WebSocket listener and session handles
//! - `tether-protocol`: the JSON event vocabulary
//! - `tether-session`: per-session outbound queues
//! - `tether-room`: rooms, presence, routing, expiry and snapshots
//! - `tether-janitor`: the periodic sweep task
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether::prelude::*;
//!
//! # async fn run() -> Result<(), TetherError> {
//! let server = TetherServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .snapshot_path("rooms.json")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod http;
mod persistence;
mod server;

pub use error::TetherError;
pub use server::{TetherServer, TetherServerBuilder};

pub mod prelude {
    //! Everything needed to configure and run a relay.

    pub use crate::{TetherError, TetherServer, TetherServerBuilder};
    pub use tether_janitor::JanitorConfig;
    pub use tether_protocol::{ClientEvent, PeerId, RoomId, ServerEvent, StatusReport};
    pub use tether_room::{
        JsonFileStore, MemoryStore, PresenceConfig, SnapshotStore,
    };
    pub use tether_session::SessionConfig;
}

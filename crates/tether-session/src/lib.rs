//! Browser session management for Tether.
//!
//! A *session* is one live WebSocket connection. This crate keeps track of
//! which sessions are connected and owns the outbound queue of each one:
//!
//! 1. **Registration**: a connection handler registers its session and
//!    gets back the receiving end of an unbounded queue.
//! 2. **Delivery**: the relay core hands back `(ConnectionId, ServerEvent)`
//!    pairs; [`SessionManager::deliver_all`] pushes each into its queue.
//! 3. **Teardown**: unregistering drops the sender, which ends the
//!    connection's writer task.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← decides WHO gets WHICH event
//!     ↕
//! Session Layer (this crate)  ← knows HOW to reach a live connection
//!     ↕
//! Transport Layer (below)  ← provides ConnectionId
//! ```
//!
//! Peer identity lives in the room layer, not here: the same browser may
//! rejoin under the same peer id from a brand-new session.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig};

//! Wire protocol for Tether.
//!
//! This crate defines the "language" that browsers and the relay speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomId`], [`PeerId`],
//!   [`StatusReport`]): the events that travel on the signaling socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the relay
//! core (rooms and presence). It doesn't know about connections or
//! rooms, only how to serialize and deserialize events.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Room registry (presence)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    room_of, ClientEvent, PeerId, RoomId, RoomStatus, ServerEvent,
    StatusReport,
};

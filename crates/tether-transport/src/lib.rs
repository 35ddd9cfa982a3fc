//! Transport layer for Tether.
//!
//! Provides the [`Connection`] trait and the [`ConnectionId`] session
//! handle. The relay core only ever sees a `ConnectionId`; everything
//! socket-shaped stays in this crate.
//!
//! # Feature Flags
//!
//! - `websocket` (default): the hyper listener that serves the WebSocket
//!   upgrade and the plain JSON endpoints on one port

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod http;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use http::{Body, Method, Request, Response, StatusCode, json_response};
#[cfg(feature = "websocket")]
pub use websocket::{
    Endpoint, IncomingConnection, REQUEST_TIMEOUT, WebSocketConnection,
    WebSocketTransport,
};

use std::fmt;

/// Opaque handle for one live transport session.
///
/// Two handles are equal only if they name the same connection. Handles
/// are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the session handle for this connection.
    fn id(&self) -> ConnectionId;
}

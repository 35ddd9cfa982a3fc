//! Error types for the protocol layer.
//!
//! Each crate in Tether defines its own error enum. When you see a
//! `ProtocolError`, the problem is in turning frames into events (or back),
//! not in networking or room bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into an event).
    ///
    /// Common causes: not JSON at all, an unknown `event` name, or a
    /// `data` value of the wrong shape (e.g. a number where an object
    /// was expected). Missing optional fields are *not* a decode error.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but makes no sense at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

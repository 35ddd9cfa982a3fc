//! Error types for the room layer.

use tether_protocol::{PeerId, RoomId};

/// Errors that can occur during room operations.
///
/// Neither is fatal: the connection handler turns `NotFound` into an
/// `error` event for the caller and logs `TargetUnreachable`.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (never created, swept, or deleted).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The signal target is not present in the room, or has no live
    /// session to deliver to.
    #[error("peer {0} not reachable in room {1}")]
    TargetUnreachable(PeerId, RoomId),
}

/// Errors from loading or saving registry snapshots.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded, or the file is not valid JSON.
    #[error("snapshot json invalid: {0}")]
    Json(#[from] serde_json::Error),
}

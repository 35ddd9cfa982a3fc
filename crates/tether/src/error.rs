//! Unified error type for the relay.

use tether_protocol::ProtocolError;
use tether_room::{PersistError, RoomError};
use tether_session::SessionError;
use tether_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    /// Loading or saving a registry snapshot failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tether_protocol::{PeerId, RoomId};
    use tether_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::RequestTimeout(Duration::from_secs(5));
        let tether_err: TetherError = err.into();
        assert!(matches!(tether_err, TetherError::Transport(_)));
        assert!(tether_err.to_string().contains("5s"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let tether_err: TetherError = err.into();
        assert!(matches!(tether_err, TetherError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotFound(ConnectionId::new(7));
        let tether_err: TetherError = err.into();
        assert!(matches!(tether_err, TetherError::Session(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err = RoomError::TargetUnreachable(PeerId::new("p2"), RoomId::new("r1"));
        let tether_err: TetherError = err.into();
        assert!(matches!(tether_err, TetherError::Room(_)));
        assert!(tether_err.to_string().contains("p2"));
    }

    #[test]
    fn test_from_persist_error() {
        let err = PersistError::Io(std::io::Error::other("disk full"));
        let tether_err: TetherError = err.into();
        assert!(matches!(tether_err, TetherError::Persist(_)));
        assert!(tether_err.to_string().contains("disk full"));
    }
}

//! Error types for the session layer.

use tether_transport::ConnectionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is registered for the given connection.
    /// Usually the connection already went away and was unregistered.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// The connection id is already registered. Connection ids are
    /// process-unique, so this points at a handler bug.
    #[error("{0} already has a registered session")]
    AlreadyRegistered(ConnectionId),

    /// The session's outbound queue is closed (its writer task ended).
    #[error("outbound queue closed for {0}")]
    QueueClosed(ConnectionId),
}

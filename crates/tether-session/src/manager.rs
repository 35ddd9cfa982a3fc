//! The session manager: tracks every live connection and its outbound queue.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself: it uses a plain
//! `HashMap`. The server wraps it in a mutex and only holds that lock
//! long enough to push events into queues; actual socket writes happen
//! in each connection's writer task.

use std::collections::HashMap;
use std::time::Instant;

use tether_protocol::ServerEvent;
use tether_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::{Session, SessionConfig, SessionError};

/// Manages all connected browser sessions.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ deliver()/deliver_all() ... ──→ unregister()
///     │                                              │
///     ▼                                              ▼
///  queue receiver handed to the          sender dropped, writer
///  connection's writer task              task sees end of queue
/// ```
pub struct SessionManager {
    /// All live sessions, keyed by connection id.
    sessions: HashMap<ConnectionId, Session>,

    /// Configuration (idle timeout).
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers a new session and returns the receiving end of its
    /// outbound queue.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] if the connection id
    /// is already in use.
    pub fn register(
        &mut self,
        id: ConnectionId,
    ) -> Result<mpsc::UnboundedReceiver<ServerEvent>, SessionError> {
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyRegistered(id));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        self.sessions.insert(
            id,
            Session {
                id,
                sender,
                connected_at: Instant::now(),
            },
        );

        tracing::debug!(conn_id = %id, "session registered");
        Ok(receiver)
    }

    /// Removes a session, closing its outbound queue.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session is registered.
    pub fn unregister(
        &mut self,
        id: ConnectionId,
    ) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;

        tracing::debug!(
            conn_id = %id,
            secs = session.age().as_secs(),
            "session unregistered"
        );
        Ok(session)
    }

    /// Queues one event for one session.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: the session is not registered
    /// - [`SessionError::QueueClosed`]: its writer task already ended
    pub fn deliver(
        &self,
        id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), SessionError> {
        let session =
            self.sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        session
            .sender
            .send(event)
            .map_err(|_| SessionError::QueueClosed(id))
    }

    /// Queues a batch of deliveries, in order.
    ///
    /// Deliveries to sessions that are gone are skipped: the peer left
    /// between the room layer computing the batch and us dispatching it,
    /// and its own disconnect handling takes care of the rest.
    ///
    /// Returns how many events were queued.
    pub fn deliver_all(
        &self,
        deliveries: impl IntoIterator<Item = (ConnectionId, ServerEvent)>,
    ) -> usize {
        let mut queued = 0;
        for (id, event) in deliveries {
            let name = event.name();
            match self.deliver(id, event) {
                Ok(()) => queued += 1,
                Err(e) => {
                    tracing::debug!(conn_id = %id, event = name, error = %e, "delivery skipped");
                }
            }
        }
        queued
    }

    /// Looks up a session by connection id.
    pub fn get(&self, id: &ConnectionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Returns `true` if the connection has a registered session.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use tether_protocol::PeerId;

    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(SessionConfig::default())
    }

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn joined(peer: &str) -> ServerEvent {
        ServerEvent::PeerJoined {
            peer_id: PeerId::new(peer),
        }
    }

    // =====================================================================
    // register() / unregister()
    // =====================================================================

    #[test]
    fn test_register_new_connection_tracks_session() {
        let mut mgr = manager();

        mgr.register(cid(1)).expect("should succeed");

        assert!(mgr.contains(&cid(1)));
        assert_eq!(mgr.get(&cid(1)).unwrap().id, cid(1));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_register_twice_returns_already_registered() {
        let mut mgr = manager();
        let _rx = mgr.register(cid(1)).unwrap();

        let result = mgr.register(cid(1));

        assert!(
            matches!(result, Err(SessionError::AlreadyRegistered(c)) if c == cid(1)),
            "duplicate registration must be rejected"
        );
    }

    #[test]
    fn test_unregister_unknown_returns_not_found() {
        let mut mgr = manager();

        let result = mgr.unregister(cid(99));

        assert!(matches!(result, Err(SessionError::NotFound(c)) if c == cid(99)));
    }

    #[tokio::test]
    async fn test_unregister_closes_outbound_queue() {
        // Dropping the sender is what ends the writer task.
        let mut mgr = manager();
        let mut rx = mgr.register(cid(1)).unwrap();

        mgr.unregister(cid(1)).unwrap();

        assert!(rx.recv().await.is_none());
        assert!(mgr.is_empty());
    }

    // =====================================================================
    // deliver() / deliver_all()
    // =====================================================================

    #[tokio::test]
    async fn test_deliver_queues_event_for_session() {
        let mut mgr = manager();
        let mut rx = mgr.register(cid(1)).unwrap();

        mgr.deliver(cid(1), joined("p1")).unwrap();

        assert_eq!(rx.recv().await, Some(joined("p1")));
    }

    #[test]
    fn test_deliver_unknown_session_returns_not_found() {
        let mgr = manager();

        let result = mgr.deliver(cid(7), joined("p1"));

        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_deliver_after_receiver_dropped_returns_queue_closed() {
        let mut mgr = manager();
        drop(mgr.register(cid(1)).unwrap());

        let result = mgr.deliver(cid(1), joined("p1"));

        assert!(matches!(result, Err(SessionError::QueueClosed(_))));
    }

    #[tokio::test]
    async fn test_deliver_all_preserves_order_and_skips_missing() {
        let mut mgr = manager();
        let mut rx1 = mgr.register(cid(1)).unwrap();
        let mut rx2 = mgr.register(cid(2)).unwrap();

        let queued = mgr.deliver_all(vec![
            (cid(1), joined("a")),
            (cid(2), joined("a")),
            (cid(3), joined("a")), // not registered
            (cid(1), joined("b")),
        ]);

        assert_eq!(queued, 3);
        assert_eq!(rx1.recv().await, Some(joined("a")));
        assert_eq!(rx1.recv().await, Some(joined("b")));
        assert_eq!(rx2.recv().await, Some(joined("a")));
    }

    #[test]
    fn test_config_default_idle_timeout_is_one_minute() {
        let mgr = manager();
        assert_eq!(mgr.config().idle_timeout().as_secs(), 60);
    }
}

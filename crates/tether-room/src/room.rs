//! A room and the presence records of its members.
//!
//! `peers` (join order, what clients see) and `members` (lookup by peer
//! id) describe the same set. Both are private and only changed through
//! [`Room::upsert`] and [`Room::remove`], so they can never drift apart.

use std::collections::HashMap;

use tether_protocol::{PeerId, RoomId};
use tether_transport::ConnectionId;

/// Presence of one peer in one room.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerRecord {
    /// The peer's identity within the room.
    pub peer_id: PeerId,

    /// The session the peer is currently reachable on. The latest join
    /// wins. `None` for records restored from a snapshot until the peer
    /// rejoins or heartbeats.
    pub session: Option<ConnectionId>,

    /// Last join or heartbeat, seconds since the Unix epoch.
    pub last_seen: f64,
}

impl PeerRecord {
    /// `true` if more than `liveness_secs` have passed since `last_seen`.
    pub fn is_expired(&self, now: f64, liveness_secs: f64) -> bool {
        now - self.last_seen > liveness_secs
    }
}

/// A rendezvous room.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    peers: Vec<PeerId>,
    members: HashMap<PeerId, PeerRecord>,
    created_at: f64,
}

impl Room {
    /// Creates an empty room.
    pub fn new(id: RoomId, created_at: f64) -> Self {
        Self {
            id,
            peers: Vec::new(),
            members: HashMap::new(),
            created_at,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Present peers, in the order they first joined.
    pub fn peers(&self) -> &[PeerId] {
        &self.peers
    }

    /// Creation time, seconds since the Unix epoch.
    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// Seconds since creation.
    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }

    pub fn member(&self, peer_id: &PeerId) -> Option<&PeerRecord> {
        self.members.get(peer_id)
    }

    /// Member records, in join order.
    pub fn members(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.iter().filter_map(|p| self.members.get(p))
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.members.contains_key(peer_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Distinct bound sessions of the room's members, in join order.
    pub fn sessions(&self) -> Vec<ConnectionId> {
        let mut sessions = Vec::with_capacity(self.peers.len());
        for record in self.members() {
            if let Some(session) = record.session {
                if !sessions.contains(&session) {
                    sessions.push(session);
                }
            }
        }
        sessions
    }

    /// `true` if `peers` holds each member exactly once and nothing else.
    pub fn is_consistent(&self) -> bool {
        self.peers.len() == self.members.len()
            && self.peers.iter().all(|p| self.members.contains_key(p))
    }

    /// Inserts or replaces a member. Returns `true` if the peer is new.
    pub(crate) fn upsert(&mut self, record: PeerRecord) -> bool {
        let is_new = !self.members.contains_key(&record.peer_id);
        if is_new {
            self.peers.push(record.peer_id.clone());
        }
        self.members.insert(record.peer_id.clone(), record);
        is_new
    }

    /// Removes a member, returning its record.
    pub(crate) fn remove(&mut self, peer_id: &PeerId) -> Option<PeerRecord> {
        let record = self.members.remove(peer_id)?;
        self.peers.retain(|p| p != peer_id);
        Some(record)
    }

    pub(crate) fn member_mut(
        &mut self,
        peer_id: &PeerId,
    ) -> Option<&mut PeerRecord> {
        self.members.get_mut(peer_id)
    }

    /// Removes every member matching `predicate`, returning them in join
    /// order.
    pub(crate) fn remove_where(
        &mut self,
        mut predicate: impl FnMut(&PeerRecord) -> bool,
    ) -> Vec<PeerRecord> {
        let doomed: Vec<PeerId> = self
            .members()
            .filter(|r| predicate(r))
            .map(|r| r.peer_id.clone())
            .collect();
        doomed.iter().filter_map(|p| self.remove(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(peer: &str, session: u64, last_seen: f64) -> PeerRecord {
        PeerRecord {
            peer_id: PeerId::new(peer),
            session: Some(ConnectionId::new(session)),
            last_seen,
        }
    }

    fn room() -> Room {
        Room::new(RoomId::new("r1"), 0.0)
    }

    #[test]
    fn test_upsert_new_peer_appends_in_join_order() {
        let mut room = room();
        assert!(room.upsert(record("b", 1, 0.0)));
        assert!(room.upsert(record("a", 2, 0.0)));

        assert_eq!(room.peers(), &[PeerId::new("b"), PeerId::new("a")]);
        assert!(room.is_consistent());
    }

    #[test]
    fn test_upsert_existing_peer_replaces_record_once() {
        let mut room = room();
        room.upsert(record("a", 1, 0.0));

        let is_new = room.upsert(record("a", 2, 10.0));

        assert!(!is_new);
        assert_eq!(room.peer_count(), 1);
        let member = room.member(&PeerId::new("a")).unwrap();
        assert_eq!(member.session, Some(ConnectionId::new(2)));
        assert_eq!(member.last_seen, 10.0);
    }

    #[test]
    fn test_remove_keeps_peers_and_members_in_step() {
        let mut room = room();
        room.upsert(record("a", 1, 0.0));
        room.upsert(record("b", 2, 0.0));

        assert!(room.remove(&PeerId::new("a")).is_some());
        assert!(room.remove(&PeerId::new("a")).is_none());

        assert_eq!(room.peers(), &[PeerId::new("b")]);
        assert!(room.is_consistent());
    }

    #[test]
    fn test_sessions_deduplicates_shared_session() {
        let mut room = room();
        room.upsert(record("a", 1, 0.0));
        room.upsert(record("b", 1, 0.0));
        room.upsert(record("c", 2, 0.0));
        room.upsert(PeerRecord {
            peer_id: PeerId::new("d"),
            session: None,
            last_seen: 0.0,
        });

        assert_eq!(
            room.sessions(),
            vec![ConnectionId::new(1), ConnectionId::new(2)]
        );
    }

    #[test]
    fn test_remove_where_returns_removed_in_join_order() {
        let mut room = room();
        room.upsert(record("a", 1, 0.0));
        room.upsert(record("b", 2, 50.0));
        room.upsert(record("c", 3, 0.0));

        let removed = room.remove_where(|r| r.is_expired(40.0, 30.0));

        let ids: Vec<_> = removed.iter().map(|r| r.peer_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(room.peers(), &[PeerId::new("b")]);
        assert!(room.is_consistent());
    }

    #[test]
    fn test_is_expired_is_strictly_greater_than_window() {
        let r = record("a", 1, 100.0);
        assert!(!r.is_expired(130.0, 30.0));
        assert!(r.is_expired(130.5, 30.0));
    }
}

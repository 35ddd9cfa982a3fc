//! The room registry: owns every room and answers status queries.
//!
//! Presence (join/heartbeat/disconnect), routing, sweeping and snapshots
//! are further `impl RoomRegistry` blocks in their own modules.
//!
//! # Concurrency note
//!
//! `RoomRegistry` is NOT thread-safe by itself. The server owns exactly
//! one, behind a `tokio::sync::Mutex`, and every mutation goes through
//! these methods while that lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tether_protocol::{RoomId, RoomStatus, StatusReport};

use crate::{Clock, PresenceConfig, Room, RoomError, SystemClock};

/// Registry of all live rooms.
pub struct RoomRegistry {
    pub(crate) rooms: HashMap<RoomId, Room>,
    pub(crate) config: PresenceConfig,
    clock: Arc<dyn Clock>,
}

impl RoomRegistry {
    /// Creates an empty registry on the system clock.
    pub fn new(config: PresenceConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty registry on a custom clock.
    pub fn with_clock(config: PresenceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Creates an empty room under a fresh random id.
    pub fn create_room(&mut self) -> RoomId {
        let room_id = loop {
            let candidate = RoomId::new(random_id(self.config.id_length));
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Room::new(room_id.clone(), self.now());
        self.rooms.insert(room_id.clone(), room);
        tracing::info!(%room_id, "room created");
        room_id
    }

    /// Looks up a room.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if the room doesn't exist.
    pub fn room(&self, room_id: &RoomId) -> Result<&Room, RoomError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    pub(crate) fn room_mut(
        &mut self,
        room_id: &RoomId,
    ) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Removes a room and all its members. Deleting an unknown room is
    /// not an error.
    pub fn delete_room(&mut self, room_id: &RoomId) -> Option<Room> {
        let room = self.rooms.remove(room_id)?;
        tracing::info!(%room_id, peers = room.peer_count(), "room deleted");
        Some(room)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// All rooms, in no particular order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Health report: a read-only projection of every room.
    pub fn status(&self) -> StatusReport {
        let now = self.now();
        let mut active_rooms: Vec<RoomStatus> = self
            .rooms
            .values()
            .map(|room| RoomStatus {
                room_id: room.id().clone(),
                peer_count: room.peer_count(),
                peers: room.peers().to_vec(),
                created_at: room.created_at(),
                age_secs: room.age(now),
            })
            .collect();
        active_rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));

        StatusReport {
            status: "healthy".to_string(),
            active_rooms_count: active_rooms.len(),
            total_peer_count: active_rooms.iter().map(|r| r.peer_count).sum(),
            active_rooms,
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(PresenceConfig::default())
    }
}

/// A random alphanumeric token of the given length.
pub(crate) fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::ManualClock;

    use super::*;

    fn registry() -> (RoomRegistry, ManualClock) {
        let clock = ManualClock::new(1_000.0);
        let registry = RoomRegistry::with_clock(
            PresenceConfig::default(),
            Arc::new(clock.clone()),
        );
        (registry, clock)
    }

    #[test]
    fn test_create_room_returns_eight_char_alphanumeric_id() {
        let (mut reg, _) = registry();

        let id = reg.create_room();

        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        let room = reg.room(&id).unwrap();
        assert!(room.is_empty());
        assert_eq!(room.created_at(), 1_000.0);
    }

    #[test]
    fn test_create_room_ids_are_unique() {
        let (mut reg, _) = registry();
        let a = reg.create_room();
        let b = reg.create_room();
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_room_unknown_returns_not_found() {
        let (reg, _) = registry();
        let result = reg.room(&RoomId::new("nope"));
        assert!(matches!(result, Err(RoomError::NotFound(id)) if id.as_str() == "nope"));
    }

    #[test]
    fn test_delete_room_is_idempotent() {
        let (mut reg, _) = registry();
        let id = reg.create_room();

        assert!(reg.delete_room(&id).is_some());
        assert!(reg.delete_room(&id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_status_reports_counts_and_age() {
        let (mut reg, clock) = registry();
        reg.create_room();
        reg.create_room();
        clock.advance(12.0);

        let status = reg.status();

        assert_eq!(status.status, "healthy");
        assert_eq!(status.active_rooms_count, 2);
        assert_eq!(status.total_peer_count, 0);
        assert!(status.active_rooms.iter().all(|r| r.age_secs == 12.0));
        assert!(status.active_rooms[0].room_id < status.active_rooms[1].room_id);
    }
}

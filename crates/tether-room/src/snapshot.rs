//! Registry snapshots: the on-disk shape of the room table.
//!
//! ```json
//! { "a1B2c3D4": { "peers": ["p1"], "created_at": 1700000000.0,
//!   "peer_data": [{ "peer_id": "p1", "socket_id": "conn-3", "last_seen": 1700000012.5 }] } }
//! ```
//!
//! Every field is optional on load so older or hand-edited files still
//! restore. Session handles are written for inspection only; they mean
//! nothing after a restart, so restored members start unbound.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tether_protocol::{PeerId, RoomId};

use crate::{PeerRecord, Room, RoomRegistry};

/// The whole registry, keyed by room id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrySnapshot {
    pub rooms: BTreeMap<RoomId, RoomSnapshot>,
}

/// One room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    #[serde(default)]
    pub peers: Vec<PeerId>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub peer_data: Vec<PeerSnapshot>,
}

/// One member record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerSnapshot {
    #[serde(default)]
    pub peer_id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
    #[serde(default)]
    pub last_seen: Option<f64>,
}

impl RoomRegistry {
    /// Captures every room and member record.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let rooms = self
            .rooms
            .values()
            .map(|room| (room.id().clone(), RoomSnapshot::from(room)))
            .collect();
        RegistrySnapshot { rooms }
    }

    /// Replaces the registry's contents with a snapshot.
    ///
    /// Missing `created_at` and `last_seen` become "now". A peer listed
    /// without a record gets a fresh one; a record whose peer isn't
    /// listed is added to the peer list. Either way the member starts
    /// with no session.
    pub fn restore(&mut self, snapshot: RegistrySnapshot) {
        let now = self.now();
        self.rooms.clear();

        for (room_id, saved) in snapshot.rooms {
            if room_id.is_empty() {
                continue;
            }
            let mut room = Room::new(room_id.clone(), saved.created_at.unwrap_or(now));

            let mut last_seen: BTreeMap<PeerId, f64> = BTreeMap::new();
            for data in &saved.peer_data {
                if !data.peer_id.is_empty() {
                    last_seen.insert(data.peer_id.clone(), data.last_seen.unwrap_or(now));
                }
            }

            let listed = saved.peers.iter();
            let unlisted = saved
                .peer_data
                .iter()
                .map(|d| &d.peer_id)
                .filter(|p| !saved.peers.contains(p));
            for peer_id in listed.chain(unlisted) {
                if peer_id.is_empty() {
                    continue;
                }
                room.upsert(PeerRecord {
                    peer_id: peer_id.clone(),
                    session: None,
                    last_seen: last_seen.get(peer_id).copied().unwrap_or(now),
                });
            }

            self.rooms.insert(room_id, room);
        }

        tracing::info!(rooms = self.rooms.len(), "registry restored");
    }
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            peers: room.peers().to_vec(),
            created_at: Some(room.created_at()),
            peer_data: room
                .members()
                .map(|record| PeerSnapshot {
                    peer_id: record.peer_id.clone(),
                    socket_id: record.session.map(|s| s.to_string()),
                    last_seen: Some(record.last_seen),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tether_transport::ConnectionId;

    use crate::{ManualClock, PresenceConfig};

    use super::*;

    fn registry() -> (RoomRegistry, ManualClock) {
        let clock = ManualClock::new(500.0);
        let reg = RoomRegistry::with_clock(
            PresenceConfig::default(),
            Arc::new(clock.clone()),
        );
        (reg, clock)
    }

    #[test]
    fn test_snapshot_restore_reproduces_rooms_peers_and_timestamps() {
        let (mut reg, clock) = registry();
        let room = reg.create_room();
        reg.join(&room, Some(PeerId::new("p1")), ConnectionId::new(1)).unwrap();
        clock.advance(3.0);
        reg.join(&room, Some(PeerId::new("p2")), ConnectionId::new(2)).unwrap();

        let snapshot = reg.snapshot();
        let (mut restored, _) = registry();
        restored.restore(snapshot);

        let r = restored.room(&room).unwrap();
        assert_eq!(r.peers(), &[PeerId::new("p1"), PeerId::new("p2")]);
        assert_eq!(r.created_at(), 500.0);
        assert_eq!(r.member(&PeerId::new("p1")).unwrap().last_seen, 500.0);
        assert_eq!(r.member(&PeerId::new("p2")).unwrap().last_seen, 503.0);
        assert!(r.members().all(|m| m.session.is_none()));
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let (mut reg, _) = registry();
        let room = reg.create_room();
        reg.join(&room, Some(PeerId::new("p1")), ConnectionId::new(7)).unwrap();

        let value = serde_json::to_value(reg.snapshot()).unwrap();

        assert_eq!(
            value[room.as_str()],
            json!({
                "peers": ["p1"],
                "created_at": 500.0,
                "peer_data": [{ "peer_id": "p1", "socket_id": "conn-7", "last_seen": 500.0 }]
            })
        );
    }

    #[test]
    fn test_unbound_member_omits_socket_id() {
        let (mut reg, _) = registry();
        let snapshot: RegistrySnapshot =
            serde_json::from_value(json!({ "r": { "peers": ["p1"] } })).unwrap();
        reg.restore(snapshot);

        let value = serde_json::to_value(reg.snapshot()).unwrap();

        assert_eq!(
            value["r"]["peer_data"],
            json!([{ "peer_id": "p1", "last_seen": 500.0 }])
        );
    }

    #[test]
    fn test_restore_backfills_missing_fields() {
        let (mut reg, _) = registry();
        let snapshot: RegistrySnapshot = serde_json::from_value(json!({
            "bare": {},
            "listed": { "peers": ["a"] },
            "recorded": { "peer_data": [{ "peer_id": "b", "last_seen": 490.0 }] }
        }))
        .unwrap();

        reg.restore(snapshot);

        let bare = reg.room(&RoomId::new("bare")).unwrap();
        assert!(bare.is_empty());
        assert_eq!(bare.created_at(), 500.0);

        let listed = reg.room(&RoomId::new("listed")).unwrap();
        assert_eq!(listed.member(&PeerId::new("a")).unwrap().last_seen, 500.0);

        let recorded = reg.room(&RoomId::new("recorded")).unwrap();
        assert_eq!(recorded.peers(), &[PeerId::new("b")]);
        assert_eq!(recorded.member(&PeerId::new("b")).unwrap().last_seen, 490.0);
        assert!(reg.rooms().all(Room::is_consistent));
    }

    #[test]
    fn test_restore_replaces_existing_rooms() {
        let (mut reg, _) = registry();
        let old = reg.create_room();

        reg.restore(RegistrySnapshot::default());

        assert!(!reg.contains(&old));
    }

    #[test]
    fn test_restored_member_binds_session_on_heartbeat() {
        let (mut reg, _) = registry();
        let snapshot: RegistrySnapshot =
            serde_json::from_value(json!({ "r": { "peers": ["p1"] } })).unwrap();
        reg.restore(snapshot);
        let room = RoomId::new("r");

        assert!(reg.relay(&room, None, &PeerId::new("p1"), json!(1)).is_err());
        reg.heartbeat(&room, &PeerId::new("p1"), ConnectionId::new(4));

        let (conn, _) = reg.relay(&room, None, &PeerId::new("p1"), json!(1)).unwrap();
        assert_eq!(conn, ConnectionId::new(4));
    }
}

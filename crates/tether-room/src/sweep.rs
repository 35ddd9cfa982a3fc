//! The expiry sweep: drop silent members, then reclaim empty or aged rooms.

use tether_protocol::{RoomId, ServerEvent};

use crate::{Delivery, RoomRegistry};

/// What a sweep removed.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Members removed for exceeding the liveness window.
    pub expired_peers: usize,
    /// Rooms deleted for being empty or too old.
    pub removed_rooms: Vec<RoomId>,
    /// `peer_disconnected` notices for the survivors of each room.
    pub deliveries: Vec<Delivery>,
}

impl SweepReport {
    /// `true` if the sweep changed the registry.
    pub fn changed(&self) -> bool {
        self.expired_peers > 0 || !self.removed_rooms.is_empty()
    }
}

impl RoomRegistry {
    /// Removes members silent for longer than the liveness window, then
    /// deletes rooms that are empty or older than the maximum room age.
    ///
    /// Members of an aged room are told about each other's removal just
    /// like expired members. Running the sweep twice in a row is the
    /// same as running it once.
    pub fn sweep(&mut self) -> SweepReport {
        let now = self.now();
        let liveness = self.config.liveness_timeout_secs;
        let max_age = self.config.max_room_age_secs;
        let mut report = SweepReport::default();

        for room in self.rooms.values_mut() {
            let expired = room.remove_where(|r| r.is_expired(now, liveness));
            report.expired_peers += expired.len();

            let aged = room.age(now) > max_age;
            let evicted = if aged {
                room.remove_where(|_| true)
            } else {
                Vec::new()
            };

            // Survivors of expiry hear about expiry; members of an aged
            // room hear about everyone evicted with them.
            let mut audience = room.sessions();
            for record in &evicted {
                if let Some(conn) = record.session {
                    if !audience.contains(&conn) {
                        audience.push(conn);
                    }
                }
            }
            for record in expired.iter().chain(&evicted) {
                tracing::info!(room_id = %room.id(), peer_id = %record.peer_id, "peer timed out");
                for conn in &audience {
                    report.deliveries.push((
                        *conn,
                        ServerEvent::PeerDisconnected {
                            peer_id: record.peer_id.clone(),
                        },
                    ));
                }
            }

            if room.is_empty() {
                report.removed_rooms.push(room.id().clone());
            }
        }

        for room_id in &report.removed_rooms {
            self.delete_room(room_id);
        }

        if report.changed() {
            tracing::info!(
                "removed {} inactive peers and {} empty/old rooms",
                report.expired_peers,
                report.removed_rooms.len()
            );
        }
        report
    }
}

//! Presence tracking: who is in which room, and on which session.

use rand::Rng;
use tether_protocol::{PeerId, RoomId, ServerEvent};
use tether_transport::ConnectionId;

use crate::registry::random_id;
use crate::{Delivery, PeerRecord, RoomError, RoomRegistry, SweepReport};

/// Result of a successful join.
#[derive(Debug)]
pub struct JoinOutcome {
    /// The peer id the session joined under (minted if none was given).
    pub peer_id: PeerId,
    /// `true` if the peer was not present before.
    pub is_new: bool,
    /// Events to dispatch: `room_peers` and `peer_joined` to the room,
    /// then `registered` to the joining session.
    pub deliveries: Vec<Delivery>,
}

/// Result of a heartbeat.
#[derive(Debug, Default)]
pub struct HeartbeatOutcome {
    /// Sweep notices (if a sweep ran), then `active_peers` for the caller.
    pub deliveries: Vec<Delivery>,
    /// Set when the heartbeat triggered a sweep. Its notices have been
    /// moved into `deliveries`.
    pub sweep: Option<SweepReport>,
}

/// Result of a session closing.
#[derive(Debug, Default)]
pub struct DisconnectOutcome {
    /// Every member removed, with its room.
    pub departed: Vec<(RoomId, PeerId)>,
    /// `peer_disconnected` notices for the rest of each room.
    pub deliveries: Vec<Delivery>,
}

impl RoomRegistry {
    /// Attaches `session` to a room as `peer_id`, minting an id when none
    /// (or an empty one) is given.
    ///
    /// Joining with an id that is already present refreshes that member
    /// and moves it to the new session. This is how a browser reconnects.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if the room doesn't exist.
    pub fn join(
        &mut self,
        room_id: &RoomId,
        peer_id: Option<PeerId>,
        session: ConnectionId,
    ) -> Result<JoinOutcome, RoomError> {
        let now = self.now();
        let id_length = self.config.id_length;
        let room = self.room_mut(room_id)?;

        let peer_id = match peer_id.filter(|p| !p.is_empty()) {
            Some(peer_id) => peer_id,
            None => loop {
                let candidate = PeerId::new(random_id(id_length));
                if !room.contains(&candidate) {
                    break candidate;
                }
            },
        };

        let is_new = room.upsert(PeerRecord {
            peer_id: peer_id.clone(),
            session: Some(session),
            last_seen: now,
        });

        let peers = room.peers().to_vec();
        let sessions = room.sessions();
        let mut deliveries = Vec::with_capacity(sessions.len() * 2 + 1);
        for conn in &sessions {
            deliveries.push((
                *conn,
                ServerEvent::RoomPeers {
                    peers: peers.clone(),
                },
            ));
        }
        for conn in &sessions {
            deliveries.push((
                *conn,
                ServerEvent::PeerJoined {
                    peer_id: peer_id.clone(),
                },
            ));
        }
        deliveries.push((
            session,
            ServerEvent::Registered {
                peer_id: peer_id.clone(),
                peers,
            },
        ));

        tracing::info!(%room_id, %peer_id, conn_id = %session, is_new, "peer joined");
        Ok(JoinOutcome {
            peer_id,
            is_new,
            deliveries,
        })
    }

    /// Refreshes a member's `last_seen` and answers with the room's peers.
    ///
    /// A member restored from a snapshot has no session yet; the
    /// heartbeat binds it to the caller. Heartbeats for an unknown room
    /// or without a peer id do nothing. With probability
    /// `heartbeat_sweep_probability` a sweep runs before the reply.
    pub fn heartbeat(
        &mut self,
        room_id: &RoomId,
        peer_id: &PeerId,
        session: ConnectionId,
    ) -> HeartbeatOutcome {
        if peer_id.is_empty() {
            return HeartbeatOutcome::default();
        }
        let now = self.now();
        let Ok(room) = self.room_mut(room_id) else {
            return HeartbeatOutcome::default();
        };

        if let Some(member) = room.member_mut(peer_id) {
            member.last_seen = now;
            if member.session.is_none() {
                member.session = Some(session);
                tracing::debug!(%room_id, %peer_id, conn_id = %session, "session bound by heartbeat");
            }
        }

        let mut outcome = HeartbeatOutcome::default();
        if self.roll_sweep() {
            let mut report = self.sweep();
            outcome.deliveries.append(&mut report.deliveries);
            outcome.sweep = Some(report);
        }

        let peers = self
            .rooms
            .get(room_id)
            .map(|room| room.peers().to_vec())
            .unwrap_or_default();
        outcome
            .deliveries
            .push((session, ServerEvent::ActivePeers { peers }));
        outcome
    }

    /// Removes every member bound to `session`, in every room, and tells
    /// each room who left.
    pub fn disconnect(&mut self, session: ConnectionId) -> DisconnectOutcome {
        let mut outcome = DisconnectOutcome::default();
        for room in self.rooms.values_mut() {
            let left = room.remove_where(|r| r.session == Some(session));
            if left.is_empty() {
                continue;
            }
            let remaining = room.sessions();
            for record in left {
                tracing::info!(room_id = %room.id(), peer_id = %record.peer_id, conn_id = %session, "peer left");
                for conn in &remaining {
                    outcome.deliveries.push((
                        *conn,
                        ServerEvent::PeerDisconnected {
                            peer_id: record.peer_id.clone(),
                        },
                    ));
                }
                outcome.departed.push((room.id().clone(), record.peer_id));
            }
        }
        outcome
    }

    fn roll_sweep(&self) -> bool {
        let p = self.config.heartbeat_sweep_probability;
        p > 0.0 && rand::rng().random::<f64>() < p
    }
}

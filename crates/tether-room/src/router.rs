//! Signal routing: fan-out to a room and point-to-point relay.
//!
//! Routing never changes the registry. Payloads are passed through
//! untouched.

use serde_json::Value;
use tether_protocol::{PeerId, RoomId, ServerEvent};

use crate::{Delivery, RoomError, RoomRegistry};

impl RoomRegistry {
    /// One copy of `event` per distinct session in the room. Unknown
    /// rooms yield nothing.
    pub fn broadcast(&self, room_id: &RoomId, event: ServerEvent) -> Vec<Delivery> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        room.sessions()
            .into_iter()
            .map(|conn| (conn, event.clone()))
            .collect()
    }

    /// Addresses a negotiation payload to the session of peer `to`.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]: the room doesn't exist
    /// - [`RoomError::TargetUnreachable`]: `to` is not present, or was
    ///   restored from a snapshot and has not reattached yet
    pub fn relay(
        &self,
        room_id: &RoomId,
        from: Option<PeerId>,
        to: &PeerId,
        signal: Value,
    ) -> Result<Delivery, RoomError> {
        let room = self.room(room_id)?;
        let session = room
            .member(to)
            .and_then(|record| record.session)
            .ok_or_else(|| {
                RoomError::TargetUnreachable(to.clone(), room_id.clone())
            })?;

        tracing::debug!(%room_id, %to, conn_id = %session, "relaying signal");
        Ok((session, ServerEvent::Signal { from, signal }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tether_transport::ConnectionId;

    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn setup() -> (RoomRegistry, RoomId) {
        let mut reg = RoomRegistry::default();
        let room = reg.create_room();
        reg.join(&room, Some(PeerId::new("p1")), cid(1)).unwrap();
        reg.join(&room, Some(PeerId::new("p2")), cid(2)).unwrap();
        (reg, room)
    }

    #[test]
    fn test_relay_present_peer_targets_its_session() {
        let (reg, room) = setup();

        let delivery = reg
            .relay(&room, Some(PeerId::new("p1")), &PeerId::new("p2"), json!({"sdp": "x"}))
            .unwrap();

        assert_eq!(
            delivery,
            (
                cid(2),
                ServerEvent::Signal {
                    from: Some(PeerId::new("p1")),
                    signal: json!({"sdp": "x"}),
                }
            )
        );
    }

    #[test]
    fn test_relay_absent_peer_returns_target_unreachable() {
        let (reg, room) = setup();

        let result = reg.relay(&room, None, &PeerId::new("ghost"), Value::Null);

        assert!(matches!(result, Err(RoomError::TargetUnreachable(p, _)) if p.as_str() == "ghost"));
    }

    #[test]
    fn test_relay_unknown_room_returns_not_found() {
        let (reg, _) = setup();

        let result = reg.relay(&RoomId::new("x"), None, &PeerId::new("p2"), Value::Null);

        assert!(matches!(result, Err(RoomError::NotFound(_))));
    }

    #[test]
    fn test_broadcast_reaches_each_session_once() {
        let (mut reg, room) = setup();
        // A second identity on session 1.
        reg.join(&room, Some(PeerId::new("p3")), cid(1)).unwrap();

        let deliveries = reg.broadcast(&room, ServerEvent::FileList(json!({"room_id": "r"})));

        let targets: Vec<_> = deliveries.iter().map(|(c, _)| *c).collect();
        assert_eq!(targets, vec![cid(1), cid(2)]);
    }

    #[test]
    fn test_broadcast_unknown_room_is_empty() {
        let reg = RoomRegistry::default();
        assert!(reg.broadcast(&RoomId::new("x"), ServerEvent::error("e")).is_empty());
    }
}

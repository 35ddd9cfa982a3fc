//! Codec trait and implementations for serializing/deserializing events.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The relay only talks to the codec through the [`Codec`] trait, so the
//! server and its tests never call `serde_json` directly.
//!
//! Browsers speak JSON, so [`JsonCodec`] is the only implementation.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → safe to share between connection tasks (the codec
///   lives inside the shared server state).
/// - `'static` → the codec doesn't borrow temporary data, so it can be
///   stored in long-lived async tasks.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the decoded value
/// doesn't borrow from the input frame, which is dropped right after.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use tether_protocol::{ClientEvent, Codec, JsonCodec, PeerId, ServerEvent};
///
/// let codec = JsonCodec;
///
/// let event = ServerEvent::PeerJoined { peer_id: PeerId::new("p1") };
/// let bytes = codec.encode(&event).unwrap();
/// assert_eq!(bytes, br#"{"event":"peer_joined","data":{"peer_id":"p1"}}"#);
///
/// let inbound: ClientEvent = codec.decode(br#"{"event":"status"}"#).unwrap();
/// assert_eq!(inbound, ClientEvent::Status);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientEvent, RoomId};

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_join_room_from_bytes() {
        let event: ClientEvent = JsonCodec
            .decode(br#"{"event":"join_room","data":{"room_id":"abc"}}"#)
            .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: Some(RoomId::new("abc")),
                peer_id: None,
            }
        );
    }
}

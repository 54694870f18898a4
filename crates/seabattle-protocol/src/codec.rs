//! Codec trait and implementations for serializing/deserializing values.
//!
//! Only two places in Seabattle deal in bytes: the resume cache (a board
//! snapshot per player) and the pub/sub relay (frames broadcast between
//! processes). Both go through a [`Codec`], so the encoding can be swapped
//! without touching either of them.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs live inside long-lived shared
/// state (the resume cache, the room registry) used from many tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Cached boards stay human-readable, which helps when inspecting the
/// cache by hand.
///
/// ## Example
///
/// ```rust
/// use seabattle_protocol::{Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&RoomId::new("room-7")).unwrap();
/// assert_eq!(bytes, b"\"room-7\"");
///
/// let decoded: RoomId = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded.as_str(), "room-7");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

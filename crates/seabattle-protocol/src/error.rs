//! Error types for the protocol layer.
//!
//! Parsing errors are recoverable: the turn protocol answers each of them
//! with a re-prompt. Codec errors come from the resume cache and relay.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The ship type token is not one of the catalog ids.
    #[error("invalid ship type: {0:?}")]
    InvalidShipType(String),

    /// The vertical flag is neither `True` nor `False`.
    #[error("invalid vertical flag: {0:?}")]
    InvalidVertical(String),

    /// The coordinate token is not `<letter><1-2 digits>`.
    #[error("invalid coordinate: {0:?}")]
    InvalidCoordinate(String),

    /// The room id token is empty or contains whitespace.
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),

    /// The message decoded but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

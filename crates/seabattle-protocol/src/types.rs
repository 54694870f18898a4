//! Identifier types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A stable player identity, as yielded by the identity provider.
///
/// This is a newtype over the identity string (a username in the demo
/// server) so that a `PlayerId` can't be passed where a `RoomId` is
/// expected. `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier of a room: the id of the game record behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses a room id typed by a client.
    ///
    /// A room id is a single word: surrounding whitespace is dropped, and
    /// an empty token or one with inner whitespace is rejected.
    pub fn parse(token: &str) -> Result<Self, ProtocolError> {
        let trimmed = token.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidRoomId(token.to_string()));
        }
        Ok(Self::new(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

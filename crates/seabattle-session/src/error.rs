//! Error types for the session layer.

use seabattle_protocol::{PlayerId, ProtocolError};

/// Errors that can occur while identifying and tracking players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was rejected by the [`IdentityProvider`](crate::IdentityProvider).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The player already has a live connection.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),

    /// The identity backend could not be reached. Fatal for the connection.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the resume cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache backend could not be reached. Fatal for the connection.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A board could not be encoded for storage.
    #[error(transparent)]
    Codec(#[from] ProtocolError),
}

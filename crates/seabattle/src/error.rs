//! Unified error type for the Seabattle server.

use seabattle_protocol::ProtocolError;
use seabattle_room::{DirectoryError, RoomError};
use seabattle_session::{CacheError, SessionError};
use seabattle_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Handlers use this single type and let `?` convert sub-crate errors.
/// Player mistakes never surface here: they are answered with a notice
/// and the conversation goes on. What does surface ends the connection.
#[derive(Debug, thiserror::Error)]
pub enum SeabattleError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unexpected frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Identification failed, or the player is already connected.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The resume cache could not be reached.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A room-level error the handler could not answer in-band.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The room directory could not be reached.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use seabattle_protocol::{PlayerId, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let seabattle_err: SeabattleError = err.into();
        assert!(matches!(seabattle_err, SeabattleError::Transport(_)));
        assert!(seabattle_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let seabattle_err: SeabattleError = err.into();
        assert!(matches!(seabattle_err, SeabattleError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AlreadyConnected(PlayerId::new("alice"));
        let seabattle_err: SeabattleError = err.into();
        assert!(matches!(seabattle_err, SeabattleError::Session(_)));
        assert!(seabattle_err.to_string().contains("alice"));
    }

    #[test]
    fn test_from_cache_error() {
        let err = CacheError::Unavailable("offline".into());
        let seabattle_err: SeabattleError = err.into();
        assert!(matches!(seabattle_err, SeabattleError::Cache(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::new("r1"));
        let seabattle_err: SeabattleError = err.into();
        assert!(matches!(seabattle_err, SeabattleError::Room(_)));
    }

    #[test]
    fn test_from_directory_error() {
        let err = DirectoryError::Unavailable("offline".into());
        let seabattle_err: SeabattleError = err.into();
        assert!(matches!(seabattle_err, SeabattleError::Directory(_)));
    }
}

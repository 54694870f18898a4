//! Error types for the room layer.

use seabattle_board::BoardError;
use seabattle_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room already seats two players.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player is already in this room.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not in this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// The player's opponent is not connected.
    #[error("no opponent in room {0}")]
    NoOpponent(RoomId),

    /// An attack came from the player whose turn it is not.
    #[error("not the turn of player {0}")]
    NotYourTurn(PlayerId),

    /// A player tried to rejoin a running game without a complete board.
    #[error("player {0} has no board to resume in room {1}")]
    BoardLost(PlayerId, RoomId),

    /// A winner was asked for before any board was sunk.
    #[error("game in room {0} is not over")]
    GameNotOver(RoomId),

    /// The room is in a state that doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The board rejected the operation.
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Errors from the room directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No game record with this id.
    #[error("room {0} not found in directory")]
    NotFound(RoomId),

    /// The directory backend could not be reached. Fatal for the connection.
    #[error("room directory unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the pub/sub channel.
#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    /// The broker could not be reached.
    #[error("pub/sub unavailable: {0}")]
    Unavailable(String),
}

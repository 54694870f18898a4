//! Game configuration and the room state machine.

use std::time::Duration;

use seabattle_board::DEFAULT_BOARD_SIZE;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room on a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Side length of every board.
    pub board_size: usize,

    /// Players per room. Battleship is a two-player game.
    pub max_players: usize,

    /// How long a placed-out player waits for the opponent to finish
    /// placing before the room is abandoned.
    pub ready_timeout: Duration,

    /// How often the readiness wait re-checks both boards.
    pub ready_poll_interval: Duration,

    /// How often the readiness wait tells the player how long is left.
    pub ready_notice_every: Duration,

    /// Deadline for the identity token, the first frame on a connection.
    pub identify_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            max_players: 2,
            ready_timeout: Duration::from_secs(20),
            ready_poll_interval: Duration::from_secs(1),
            ready_notice_every: Duration::from_secs(5),
            identify_timeout: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Empty → OneJoined ⇄ ReadyWait → InProgress → Ended
///             │           │            │
///             └───────────┴────────────┴──────→ Abandoned
/// ```
///
/// - **Empty**: created for its first join.
/// - **OneJoined**: one player is placing ships, waiting for a second.
/// - **ReadyWait**: both seats taken, placement and readiness wait
///   running. A player leaving drops the room back to `OneJoined`.
/// - **InProgress**: both boards were initialized; attacks are accepted.
///   Players may leave and resume without changing state.
/// - **Ended**: one board was sunk. Terminal.
/// - **Abandoned**: the readiness wait expired or everybody left before
///   the game ended. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Empty,
    OneJoined,
    ReadyWait,
    InProgress,
    Ended,
    Abandoned,
}

impl RoomState {
    /// Returns `true` once no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Abandoned)
    }

    /// Returns `true` while both players have been paired.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ReadyWait | Self::InProgress)
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomState::*;
        matches!(
            (self, target),
            (Empty, OneJoined)
                | (OneJoined, ReadyWait)
                | (ReadyWait, OneJoined)
                | (ReadyWait, InProgress)
                | (InProgress, Ended)
                | (Empty | OneJoined | ReadyWait | InProgress, Abandoned)
        )
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::OneJoined => write!(f, "OneJoined"),
            Self::ReadyWait => write!(f, "ReadyWait"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Ended => write!(f, "Ended"),
            Self::Abandoned => write!(f, "Abandoned"),
        }
    }
}

//! Server → client text frames.

use std::fmt;

use seabattle_board::{Coordinate, ShipTypeId};

use crate::{PlayerId, RoomId};

/// Everything the server says to a player.
///
/// Rendering goes through [`Display`](fmt::Display), so handlers send
/// `notice.to_string()` and tests compare against the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    // -- Connection and room selection --
    Connected,
    Restored,
    AlreadyConnected,
    Unauthorized,
    SelectRoom(Vec<RoomId>),
    WrongRoomId,
    RoomNotFound(RoomId),
    RoomFull,

    // -- Placement --
    ShipTypePrompt,
    VerticalPrompt,
    CoordinatePrompt,
    InvalidShipType,
    InvalidVertical,
    InvalidCoordinate,
    CellsNotFree,
    ShipPlaced,
    FleetExhausted(ShipTypeId),

    // -- Readiness wait --
    WaitForOpponent,
    SecondsRemaining(u64),
    GameNotStarted,
    GameStarted { first: PlayerId },

    // -- Attack phase --
    YourMove,
    NotYourMove,
    Hit,
    HitAt(Coordinate),
    Miss,
    OpponentLeft,
    OpponentNotConnected,
    GameOver,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("You're successfully connected."),
            Self::Restored => f.write_str("Your gaming session has been restored."),
            Self::AlreadyConnected => f.write_str("You are already connected from another session."),
            Self::Unauthorized => f.write_str("Authentication failed."),
            Self::SelectRoom(rooms) => {
                f.write_str("Select room id from the list: ")?;
                for (i, room) in rooms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{room}")?;
                }
                Ok(())
            }
            Self::WrongRoomId => f.write_str("Wrong room id"),
            Self::RoomNotFound(room) => write!(f, "Not found game with id: {room}"),
            Self::RoomFull => f.write_str("This room is full!"),

            Self::ShipTypePrompt => f.write_str("Enter ship type. 1, 2, 3, 4"),
            Self::VerticalPrompt => f.write_str("Is the ship vertical? False or True."),
            Self::CoordinatePrompt => f.write_str("Enter cords. A1 or B2 or C3."),
            Self::InvalidShipType => f.write_str("Enter valid ship type. 1, 2, 3, 4"),
            Self::InvalidVertical => {
                f.write_str("Enter valid is vertical or not. False or True.")
            }
            Self::InvalidCoordinate => f.write_str("Enter valid cords. A1 or B2 or C3."),
            Self::CellsNotFree => f.write_str("Ship is not placed. Coordinates is not free."),
            Self::ShipPlaced => f.write_str("OK!"),
            Self::FleetExhausted(ship_type) => write!(f, "Ship with type {ship_type} is over!"),

            Self::WaitForOpponent => f.write_str("Wait for other user initialize a game"),
            Self::SecondsRemaining(secs) => write!(f, "{secs} seconds remaining!"),
            Self::GameNotStarted => f.write_str("Game is not started!"),
            Self::GameStarted { first } => write!(f, "Game started! First move to {first}."),

            Self::YourMove => f.write_str("Your move now."),
            Self::NotYourMove => f.write_str("This is not your move now!"),
            Self::Hit => f.write_str("Hit!"),
            Self::HitAt(at) => write!(f, "Hit at {at}!"),
            Self::Miss => f.write_str("Miss!"),
            Self::OpponentLeft => f.write_str("Your opponent has left the game."),
            Self::OpponentNotConnected => f.write_str("Your opponent is not connected."),
            Self::GameOver => f.write_str("Game Over!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_list_is_comma_separated() {
        let notice = Notice::SelectRoom(vec![RoomId::new("r1"), RoomId::new("r2")]);
        assert_eq!(notice.to_string(), "Select room id from the list: r1, r2");
        assert_eq!(
            Notice::SelectRoom(Vec::new()).to_string(),
            "Select room id from the list: "
        );
    }

    #[test]
    fn test_parameterized_notices() {
        assert_eq!(Notice::FleetExhausted(4).to_string(), "Ship with type 4 is over!");
        assert_eq!(Notice::HitAt(Coordinate::new('C', 3)).to_string(), "Hit at C3!");
        assert_eq!(
            Notice::GameStarted { first: PlayerId::new("alice") }.to_string(),
            "Game started! First move to alice."
        );
        assert_eq!(Notice::SecondsRemaining(15).to_string(), "15 seconds remaining!");
        assert_eq!(
            Notice::RoomNotFound(RoomId::new("x9")).to_string(),
            "Not found game with id: x9"
        );
    }
}

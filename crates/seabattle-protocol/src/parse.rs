//! Parsing of client tokens.
//!
//! Every field is validated on its own so the turn protocol can re-prompt
//! for exactly the field that was wrong.

use seabattle_board::{Coordinate, ShipTypeId, ship_type};

use crate::{ProtocolError, RoomId};

/// Parses a ship type id. Only ids in the fleet catalog are accepted.
pub fn parse_ship_type(token: &str) -> Result<ShipTypeId, ProtocolError> {
    let invalid = || ProtocolError::InvalidShipType(token.to_string());
    let id: ShipTypeId = token.trim().parse().map_err(|_| invalid())?;
    ship_type(id).map(|ship| ship.id()).map_err(|_| invalid())
}

/// Parses the vertical flag: `True` or `False` in any case.
///
/// An empty token means `False`.
pub fn parse_vertical(token: &str) -> Result<bool, ProtocolError> {
    let token_trimmed = token.trim();
    if token_trimmed.is_empty() || token_trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else if token_trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else {
        Err(ProtocolError::InvalidVertical(token.to_string()))
    }
}

/// Parses a coordinate token such as `A1` or `j10`.
///
/// Whether the coordinate lies on a given board is checked by the board.
pub fn parse_coordinate(token: &str) -> Result<Coordinate, ProtocolError> {
    Coordinate::parse(token).map_err(|_| ProtocolError::InvalidCoordinate(token.to_string()))
}

/// What a client answered to the room selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomChoice {
    /// Fetch the room list again.
    Reload,
    /// Join this room.
    Room(RoomId),
}

impl RoomChoice {
    /// Any token mentioning `reload` (case-insensitive) asks for a reload.
    pub fn parse(token: &str) -> Result<Self, ProtocolError> {
        if token.to_ascii_lowercase().contains("reload") {
            return Ok(Self::Reload);
        }
        RoomId::parse(token).map(Self::Room)
    }
}

//! Error types for the board engine.

use crate::{Coordinate, ShipTypeId};

/// Errors returned by [`Board`](crate::Board) operations.
///
/// Spatial conflicts during placement (a run that leaves the grid or
/// crosses another ship) are not errors: `place_ship` answers `Ok(false)`
/// for those so callers can simply ask for another position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The requested board size cannot hold a lettered grid.
    #[error("invalid board size {0}")]
    InvalidSize(usize),

    /// No ship type with this id exists in the fleet catalog.
    #[error("unknown ship type {0}")]
    UnknownShipType(ShipTypeId),

    /// Every ship of this type has already been placed.
    #[error("no ships of type {0} left to place")]
    FleetExhausted(ShipTypeId),

    /// The text could not be read as `<letter><number>`.
    #[error("malformed coordinate {0:?}")]
    MalformedCoordinate(String),

    /// The coordinate is well formed but lies outside this board.
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coordinate),

    /// This coordinate was already hit on the same ship.
    #[error("coordinate {0} was already attacked")]
    RepeatedAttack(Coordinate),

    /// A snapshot could not be turned back into a consistent board.
    #[error("invalid board snapshot: {0}")]
    InvalidSnapshot(String),
}

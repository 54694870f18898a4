//! The fleet catalog shared by every board.

use serde::{Deserialize, Serialize};

use crate::BoardError;

/// Identifier of a ship type, as typed by players (`1`..=`4`).
pub type ShipTypeId = u8;

/// Board size used when none is configured.
pub const DEFAULT_BOARD_SIZE: usize = 10;

/// Smallest board that can hold the longest ship.
pub const MIN_BOARD_SIZE: usize = 4;

/// Columns are letters, so a board is at most `A..=Z` wide.
pub const MAX_BOARD_SIZE: usize = 26;

/// An immutable catalog entry: how long a ship is and how many of them
/// each player places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipType {
    id: ShipTypeId,
    length: usize,
    initial_count: u8,
}

impl ShipType {
    /// Creates a catalog entry.
    pub const fn new(id: ShipTypeId, length: usize, initial_count: u8) -> Self {
        Self {
            id,
            length,
            initial_count,
        }
    }

    pub fn id(&self) -> ShipTypeId {
        self.id
    }

    /// Number of cells the ship occupies.
    pub fn length(&self) -> usize {
        self.length
    }

    /// How many ships of this type a fresh board holds in inventory.
    pub fn initial_count(&self) -> u8 {
        self.initial_count
    }
}

/// The standard fleet: four single-cell boats down to one four-cell ship.
///
/// The type id equals the ship length.
pub const FLEET: [ShipType; 4] = [
    ShipType::new(1, 1, 4),
    ShipType::new(2, 2, 3),
    ShipType::new(3, 3, 2),
    ShipType::new(4, 4, 1),
];

/// Total number of ships in [`FLEET`].
pub const FLEET_TOTAL: usize = 10;

/// Looks up a ship type in the catalog.
pub fn ship_type(id: ShipTypeId) -> Result<&'static ShipType, BoardError> {
    FLEET
        .iter()
        .find(|ship| ship.id == id)
        .ok_or(BoardError::UnknownShipType(id))
}

/// Direction a ship extends from its starting cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Towards later column letters.
    Horizontal,
    /// Towards higher row numbers.
    Vertical,
}

impl Orientation {
    /// `true` maps to [`Orientation::Vertical`].
    pub fn from_vertical(vertical: bool) -> Self {
        if vertical {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }
}

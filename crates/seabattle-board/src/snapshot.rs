//! Versioned, serializable form of a [`Board`].
//!
//! The snapshot is a plain data schema: grid size, turn flag, remaining
//! inventory, placed ships with their cells, and the attack log. The grid
//! itself is not stored; it is rebuilt from the ships on restore, which
//! also re-checks every board invariant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{ShipKey, Target};
use crate::{Board, BoardError, Coordinate, FLEET, ShipTypeId};

/// Current schema version written by [`BoardSnapshot::from`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// A ship as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipRecord {
    pub type_id: ShipTypeId,
    pub sequence: u8,
    pub cells: Vec<Coordinate>,
}

/// One attack-log entry: a target and the coordinates recorded on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub target: Target,
    pub coordinates: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub version: u32,
    pub size: usize,
    pub turn: bool,
    pub inventory: BTreeMap<ShipTypeId, u8>,
    pub ships: Vec<ShipRecord>,
    pub moves: Vec<MoveRecord>,
}

impl From<&Board> for BoardSnapshot {
    fn from(board: &Board) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            size: board.size(),
            turn: board.turn(),
            inventory: board.inventory().clone(),
            ships: board
                .ships()
                .iter()
                .map(|ship| ShipRecord {
                    type_id: ship.key().type_id,
                    sequence: ship.key().sequence,
                    cells: ship.cells().to_vec(),
                })
                .collect(),
            moves: board
                .moves()
                .iter()
                .map(|(target, coordinates)| MoveRecord {
                    target: *target,
                    coordinates: coordinates.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<BoardSnapshot> for Board {
    type Error = BoardError;

    fn try_from(snapshot: BoardSnapshot) -> Result<Self, Self::Error> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BoardError::InvalidSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }

        let mut board = Board::new(snapshot.size)?;
        board.set_turn(snapshot.turn);

        for record in snapshot.ships {
            let key = ShipKey {
                type_id: record.type_id,
                sequence: record.sequence,
            };
            board.restore_ship(key, record.cells)?;
        }

        // Inventory plus placed ships must add up to the catalog count.
        for ship_type in FLEET {
            let left = snapshot.inventory.get(&ship_type.id()).copied().unwrap_or(0);
            let placed = board
                .ships()
                .iter()
                .filter(|ship| ship.key().type_id == ship_type.id())
                .count();
            if left as usize + placed != ship_type.initial_count() as usize {
                return Err(BoardError::InvalidSnapshot(format!(
                    "type {} has {left} left and {placed} placed",
                    ship_type.id()
                )));
            }
        }
        if snapshot.inventory.keys().any(|id| crate::ship_type(*id).is_err()) {
            return Err(BoardError::InvalidSnapshot("unknown ship type in inventory".into()));
        }
        board.restore_inventory(snapshot.inventory);

        for record in snapshot.moves {
            for at in &record.coordinates {
                let on_target = match record.target {
                    Target::Water => board.contains(*at) && board.ship_at(*at).is_none(),
                    Target::Ship(key) => board.ship_at(*at).is_some_and(|s| s.key() == key),
                };
                if !on_target {
                    return Err(BoardError::InvalidSnapshot(format!(
                        "move {at} does not belong to {:?}",
                        record.target
                    )));
                }
            }
            board.restore_moves(record.target, record.coordinates);
        }

        Ok(board)
    }
}

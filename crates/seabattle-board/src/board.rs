//! The per-player board state machine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fleet::{self, DEFAULT_BOARD_SIZE, FLEET, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::{BoardError, Coordinate, Orientation, ShipTypeId};

/// Identity of a placed ship: its type and its 1-based sequence number
/// among ships of that type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
pub struct ShipKey {
    pub type_id: ShipTypeId,
    pub sequence: u8,
}

impl fmt::Display for ShipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_id, self.sequence)
    }
}

/// What an attack landed on. Hits are logged against the ship; misses
/// all go to open water and are never checked for repeats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
pub enum Target {
    Water,
    Ship(ShipKey),
}

/// A ship that has been put on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedShip {
    key: ShipKey,
    cells: Vec<Coordinate>,
}

impl PlacedShip {
    pub fn key(&self) -> ShipKey {
        self.key
    }

    /// Number of cells the ship covers.
    pub fn length(&self) -> usize {
        self.cells.len()
    }

    /// Occupied cells, from the starting cell outwards.
    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }
}

/// One player's grid, fleet inventory, and attack log.
///
/// Invariants kept by every method:
/// - a cell is occupied by at most one ship;
/// - inventory plus placed ships always equals the full fleet;
/// - a hit coordinate is logged at most once per ship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    columns: Vec<char>,
    /// Row-major; each entry indexes into `ships`.
    grid: Vec<Option<usize>>,
    inventory: BTreeMap<ShipTypeId, u8>,
    ships: Vec<PlacedShip>,
    moves: BTreeMap<Target, Vec<Coordinate>>,
    turn: bool,
}

impl Board {
    /// Creates an empty `size`×`size` board with a full inventory.
    ///
    /// Columns are the first `size` letters starting at `A`.
    pub fn new(size: usize) -> Result<Self, BoardError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(BoardError::InvalidSize(size));
        }

        let columns = ('A'..='Z').take(size).collect();
        let inventory = FLEET
            .iter()
            .map(|ship| (ship.id(), ship.initial_count()))
            .collect();

        Ok(Self {
            size,
            columns,
            grid: vec![None; size * size],
            inventory,
            ships: Vec::new(),
            moves: BTreeMap::new(),
            turn: false,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Column letters in order.
    pub fn columns(&self) -> &[char] {
        &self.columns
    }

    /// Returns `true` if the coordinate lies on this board.
    pub fn contains(&self, at: Coordinate) -> bool {
        self.index_of(at).is_some()
    }

    /// Ships of `type_id` still waiting to be placed.
    pub fn remaining(&self, type_id: ShipTypeId) -> Option<u8> {
        self.inventory.get(&type_id).copied()
    }

    /// Sum of the remaining inventory over all ship types.
    pub fn remaining_total(&self) -> usize {
        self.inventory.values().map(|n| *n as usize).sum()
    }

    pub fn inventory(&self) -> &BTreeMap<ShipTypeId, u8> {
        &self.inventory
    }

    /// Placed ships in placement order.
    pub fn ships(&self) -> &[PlacedShip] {
        &self.ships
    }

    /// The ship covering `at`, if any.
    pub fn ship_at(&self, at: Coordinate) -> Option<&PlacedShip> {
        let idx = self.index_of(at)?;
        self.grid[idx].map(|ship| &self.ships[ship])
    }

    /// Attack log: every target that was attacked and the coordinates, in
    /// order, that hit it.
    pub fn moves(&self) -> &BTreeMap<Target, Vec<Coordinate>> {
        &self.moves
    }

    /// Whether this board's owner currently holds the turn.
    pub fn turn(&self) -> bool {
        self.turn
    }

    pub fn set_turn(&mut self, turn: bool) {
        self.turn = turn;
    }

    /// Places one ship of `type_id` starting at `at`.
    ///
    /// Horizontal ships extend towards later columns, vertical ones
    /// towards higher rows. Returns `Ok(false)` without touching anything
    /// when the run leaves the grid or crosses an occupied cell.
    ///
    /// # Errors
    /// - [`BoardError::UnknownShipType`]: `type_id` is not in the fleet
    /// - [`BoardError::FleetExhausted`]: no ship of this type is left
    /// - [`BoardError::OutOfBounds`]: the starting cell is off the board
    pub fn place_ship(
        &mut self,
        type_id: ShipTypeId,
        at: Coordinate,
        orientation: Orientation,
    ) -> Result<bool, BoardError> {
        let ship_type = fleet::ship_type(type_id)?;
        let remaining = self.remaining(type_id).unwrap_or(0);
        if remaining == 0 {
            return Err(BoardError::FleetExhausted(type_id));
        }
        if !self.contains(at) {
            return Err(BoardError::OutOfBounds(at));
        }

        let Some(cells) = self.run(at, ship_type.length(), orientation) else {
            tracing::debug!(%at, type_id, "ship run leaves the board");
            return Ok(false);
        };
        if cells.iter().any(|c| self.ship_at(*c).is_some()) {
            tracing::debug!(%at, type_id, "ship run crosses an occupied cell");
            return Ok(false);
        }

        let key = ShipKey {
            type_id,
            sequence: ship_type.initial_count() - remaining + 1,
        };
        let ship_idx = self.ships.len();
        for cell in &cells {
            if let Some(idx) = self.index_of(*cell) {
                self.grid[idx] = Some(ship_idx);
            }
        }
        self.ships.push(PlacedShip { key, cells });
        self.inventory.insert(type_id, remaining - 1);

        tracing::debug!(%key, %at, ?orientation, "ship placed");
        Ok(true)
    }

    /// Fires at `at`. Returns `true` on a hit.
    ///
    /// # Errors
    /// - [`BoardError::OutOfBounds`]: the coordinate is off the board
    /// - [`BoardError::RepeatedAttack`]: this cell of this ship was
    ///   already hit; nothing is recorded
    pub fn attack(&mut self, at: Coordinate) -> Result<bool, BoardError> {
        let idx = self.index_of(at).ok_or(BoardError::OutOfBounds(at))?;

        let Some(ship_idx) = self.grid[idx] else {
            self.moves.entry(Target::Water).or_default().push(at);
            return Ok(false);
        };

        let key = self.ships[ship_idx].key;
        let hits = self.moves.entry(Target::Ship(key)).or_default();
        if hits.contains(&at) {
            return Err(BoardError::RepeatedAttack(at));
        }
        hits.push(at);

        if self.is_sunk(key) {
            tracing::debug!(%key, %at, "ship sunk");
        }
        Ok(true)
    }

    /// Number of distinct cells of the ship that have been hit.
    pub fn hits_on(&self, key: ShipKey) -> usize {
        self.moves
            .get(&Target::Ship(key))
            .map_or(0, |hits| hits.len())
    }

    /// Returns `true` once every cell of the ship has been hit.
    pub fn is_sunk(&self, key: ShipKey) -> bool {
        self.ships
            .iter()
            .find(|ship| ship.key == key)
            .is_some_and(|ship| self.hits_on(key) == ship.length())
    }

    /// Every ship is on the grid and the grid has all its columns.
    pub fn is_initialized(&self) -> bool {
        self.inventory.values().all(|n| *n == 0)
            && self.columns.len() == self.size
            && self.grid.len() == self.size * self.size
    }

    /// At least one ship is on the grid and every placed ship has been hit
    /// on all of its cells. A board with no ships is never over.
    pub fn is_over(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(|ship| self.is_sunk(ship.key))
    }

    /// Row-major grid index of `at`, if it lies on the board.
    fn index_of(&self, at: Coordinate) -> Option<usize> {
        let col = self.columns.iter().position(|c| *c == at.col())?;
        let row = at.row() as usize;
        if row == 0 || row > self.size {
            return None;
        }
        Some((row - 1) * self.size + col)
    }

    /// The `length` coordinates starting at `at`, or `None` if any of them
    /// falls off the board.
    fn run(
        &self,
        at: Coordinate,
        length: usize,
        orientation: Orientation,
    ) -> Option<Vec<Coordinate>> {
        let col = self.columns.iter().position(|c| *c == at.col())?;
        let row = at.row() as usize;

        (0..length)
            .map(|step| {
                let (c, r) = match orientation {
                    Orientation::Horizontal => (col + step, row),
                    Orientation::Vertical => (col, row + step),
                };
                let letter = *self.columns.get(c)?;
                let cell = Coordinate::new(letter, u8::try_from(r).ok()?);
                self.contains(cell).then_some(cell)
            })
            .collect()
    }

    /// Puts a ship back on the grid while rebuilding from a snapshot.
    pub(crate) fn restore_ship(
        &mut self,
        key: ShipKey,
        cells: Vec<Coordinate>,
    ) -> Result<(), BoardError> {
        let invalid = |msg: String| BoardError::InvalidSnapshot(msg);

        let ship_type = fleet::ship_type(key.type_id)?;
        if cells.len() != ship_type.length() {
            return Err(invalid(format!("ship {key} has {} cells", cells.len())));
        }
        if self.ships.iter().any(|ship| ship.key == key) {
            return Err(invalid(format!("ship {key} appears twice")));
        }

        let ship_idx = self.ships.len();
        for cell in &cells {
            let idx = self
                .index_of(*cell)
                .ok_or_else(|| invalid(format!("ship {key} cell {cell} is off the board")))?;
            if self.grid[idx].is_some() {
                return Err(invalid(format!("ship {key} overlaps at {cell}")));
            }
            self.grid[idx] = Some(ship_idx);
        }
        self.ships.push(PlacedShip { key, cells });
        Ok(())
    }

    pub(crate) fn restore_inventory(&mut self, inventory: BTreeMap<ShipTypeId, u8>) {
        self.inventory = inventory;
    }

    pub(crate) fn restore_moves(&mut self, target: Target, coordinates: Vec<Coordinate>) {
        self.moves.insert(target, coordinates);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE).expect("default board size is valid")
    }
}

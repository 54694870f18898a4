//! Board engine for Seabattle.
//!
//! One [`Board`] holds one player's private state: the grid, the ships
//! still waiting to be placed, the ships already on the grid, and the log
//! of attacks received. Nothing in this crate does I/O; the session layers
//! above drive it.
//!
//! # Lifecycle
//!
//! ```text
//! Board::new ──place_ship()*──→ is_initialized() ──attack()*──→ is_over()
//! ```
//!
//! A [`BoardSnapshot`] is the versioned, serializable form of a board. It
//! is what the resume cache stores between connections.

mod board;
mod coordinate;
mod error;
mod fleet;
mod snapshot;

pub use board::{Board, PlacedShip, ShipKey, Target};
pub use coordinate::Coordinate;
pub use error::BoardError;
pub use fleet::{
    DEFAULT_BOARD_SIZE, FLEET, FLEET_TOTAL, MAX_BOARD_SIZE, MIN_BOARD_SIZE,
    Orientation, ShipType, ShipTypeId, ship_type,
};
pub use snapshot::{BoardSnapshot, MoveRecord, SNAPSHOT_VERSION, ShipRecord};

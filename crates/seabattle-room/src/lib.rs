//! Room lifecycle management for Seabattle.
//!
//! Pairs players into two-seat rooms and arbitrates their turns.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: every live room and its player sessions
//! - [`RoomState`]: lifecycle state machine
//! - [`GameConfig`]: board size, seat count, readiness timings
//! - [`RoomDirectory`]: persisted game records (open rooms, winners)
//! - [`PubSub`]: best-effort broadcast between server processes

mod config;
mod directory;
mod error;
mod pubsub;
mod registry;

pub use config::{GameConfig, RoomState};
pub use directory::{InMemoryDirectory, RoomDirectory, RoomRecord, RoomStatus};
pub use error::{DirectoryError, PubSubError, RoomError};
pub use pubsub::{LocalPubSub, PubSub, RelayFrame, room_channel};
pub use registry::{AttackReport, ClosedRoom, JoinOutcome, PlayerSession, RoomRegistry};

//! # Seabattle
//!
//! A two-player Battleship session server.
//!
//! Players connect over a text-frame transport (WebSocket by default),
//! identify with a token, pick a room, place their fleet, and then take
//! turns firing at each other's board. The server is authoritative: every
//! placement and every shot is validated here, and each player only ever
//! sees the text notices the server sends.
//!
//! The surrounding system is reached through three contracts the caller
//! provides: an [`IdentityProvider`](seabattle_session::IdentityProvider),
//! a [`RoomDirectory`](seabattle_room::RoomDirectory) holding persisted
//! game records, and a [`CacheStore`](seabattle_session::CacheStore) that
//! keeps boards across reconnects. A [`PubSub`](seabattle_room::PubSub)
//! channel relays room broadcasts between server processes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use seabattle::prelude::*;
//!
//! struct DevIdentity;
//!
//! impl IdentityProvider for DevIdentity {
//!     async fn identify(&self, token: &str) -> Result<PlayerId, SessionError> {
//!         Ok(PlayerId::new(token.trim()))
//!     }
//!
//!     async fn active_room(&self, _: &PlayerId) -> Result<Option<RoomId>, SessionError> {
//!         Ok(None)
//!     }
//! }
//!
//! # async fn run() -> Result<(), SeabattleError> {
//! let directory = InMemoryDirectory::new();
//! directory.create_room(RoomId::new("room-1")).await;
//!
//! let server = SeabattleServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(DevIdentity, directory, InMemoryCache::new(), Arc::new(LocalPubSub::new()))
//!     .await?;
//! server.run().await
//! # }
//! ```

mod attack;
mod error;
mod handler;
mod lifecycle;
mod placement;
mod server;

pub use error::SeabattleError;
pub use server::{SeabattleServer, SeabattleServerBuilder};

/// Installs a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Everything needed to stand up a server.
pub mod prelude {
    pub use crate::{SeabattleError, SeabattleServer, SeabattleServerBuilder, init_tracing};
    pub use seabattle_board::Board;
    pub use seabattle_protocol::{Notice, PlayerId, RoomId};
    pub use seabattle_room::{
        GameConfig, InMemoryDirectory, LocalPubSub, PubSub, RoomDirectory, RoomRecord, RoomStatus,
    };
    pub use seabattle_session::{CacheStore, IdentityProvider, InMemoryCache, SessionError};
    pub use seabattle_transport::{MemoryConnector, MemoryTransport, WebSocketTransport};
}

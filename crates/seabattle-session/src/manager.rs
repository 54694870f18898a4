//! The session manager: tracks which players are connected right now.
//!
//! A player may hold at most one live connection. A second connection
//! with the same identity is refused until the first one goes away, so
//! two sockets can never drive the same board.
//!
//! Only live connections are tracked. A disconnect removes the entry;
//! whatever the player needs to come back (their room, their board) lives
//! in the room directory and the resume cache, not here.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap`; the server keeps it behind a
//! mutex in its shared state.

use std::collections::HashMap;
use std::time::Instant;

use seabattle_protocol::PlayerId;
use seabattle_transport::ConnectionId;

use crate::SessionError;

/// A player's live connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub connection: ConnectionId,
    pub connected_at: Instant,
}

/// Tracks every player connected to this process.
///
/// ```text
/// identify() ──→ connect() ──→ disconnect() ──→ connect() ...
///                    │               │
///                    ▼               ▼
///               [tracked]       [forgotten]
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live connection for a player.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the player already
    /// has a live connection.
    pub fn connect(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyConnected(player_id));
        }

        tracing::info!(%player_id, %connection, "session connected");
        let session = Session {
            player_id: player_id.clone(),
            connection,
            connected_at: Instant::now(),
        };
        Ok(self.sessions.entry(player_id).or_insert(session))
    }

    /// Forgets a player's session.
    ///
    /// Only the connection that owns the session can end it; a call with a
    /// stale connection id is ignored and returns `Ok(false)`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(
        &mut self,
        player_id: &PlayerId,
        connection: ConnectionId,
    ) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get(player_id)
            .ok_or_else(|| SessionError::NotFound(player_id.clone()))?;
        if session.connection != connection {
            return Ok(false);
        }

        let session = self.sessions.remove(player_id);
        tracing::info!(
            %player_id,
            %connection,
            connected_for = ?session.map(|s| s.connected_at.elapsed()),
            "session disconnected"
        );
        Ok(true)
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Returns the number of connected players.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

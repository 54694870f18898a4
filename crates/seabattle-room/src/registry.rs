//! The room registry: every live room and the player sessions inside it.
//!
//! One mutex guards the whole room table. Each operation (join, leave, a
//! full attack step with its turn flip) runs inside a single lock scope,
//! so two players' tasks can never interleave half-way through a turn.
//! Connection I/O happens after the lock is released.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use rand::Rng;
use seabattle_board::{Board, Coordinate};
use seabattle_protocol::{Codec, JsonCodec, Notice, PlayerId, RoomId};
use seabattle_transport::Connection;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::pubsub::{RelayFrame, room_channel};
use crate::{GameConfig, PubSub, RoomError, RoomState};

/// One player seated in a room.
pub struct PlayerSession<C> {
    player_id: PlayerId,
    connection: Arc<C>,
    board: Board,
    is_turn: bool,
}

impl<C> PlayerSession<C> {
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_turn(&self) -> bool {
        self.is_turn
    }

    /// Keeps the session flag and the board's own flag in step, so a
    /// cached board carries the turn it was saved with.
    fn set_turn(&mut self, is_turn: bool) {
        self.is_turn = is_turn;
        self.board.set_turn(is_turn);
    }
}

struct Room<C> {
    state: RoomState,
    players: Vec<PlayerSession<C>>,
    /// Everyone who ever took a seat, for cache cleanup on close.
    members: Vec<PlayerId>,
    relay: JoinHandle<()>,
}

impl<C> Room<C> {
    fn position(&self, player: &PlayerId) -> Option<usize> {
        self.players.iter().position(|s| s.player_id == *player)
    }

    fn session(&self, player: &PlayerId) -> Option<&PlayerSession<C>> {
        self.players.iter().find(|s| s.player_id == *player)
    }

    fn connections(&self) -> Vec<Arc<C>> {
        self.players.iter().map(|s| Arc::clone(&s.connection)).collect()
    }

    fn transition(&mut self, room_id: &RoomId, target: RoomState) -> Result<(), RoomError> {
        if !self.state.can_transition_to(target) {
            return Err(RoomError::InvalidState(format!(
                "room {room_id} cannot go from {} to {target}",
                self.state
            )));
        }
        tracing::debug!(%room_id, from = %self.state, to = %target, "room state changed");
        self.state = target;
        Ok(())
    }
}

/// Result of a successful [`RoomRegistry::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub state: RoomState,
    pub players: usize,
    pub is_turn: bool,
}

/// Everything the turn protocol needs after one accepted attack.
pub struct AttackReport<C> {
    pub hit: bool,
    pub coordinate: Coordinate,
    pub attacker_connection: Arc<C>,
    pub defender: PlayerId,
    pub defender_connection: Arc<C>,
    /// The defender's board after the attack, for the resume cache.
    pub defender_board: Board,
    pub game_over: bool,
}

/// What is left of a room after [`RoomRegistry::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedRoom {
    pub room_id: RoomId,
    pub state: RoomState,
    pub members: Vec<PlayerId>,
}

type RoomTable<C> = Arc<Mutex<HashMap<RoomId, Room<C>>>>;

/// Owns all rooms and player sessions of this process.
pub struct RoomRegistry<C: Connection> {
    rooms: RoomTable<C>,
    config: GameConfig,
    pubsub: Arc<dyn PubSub>,
    node_id: String,
}

impl<C: Connection> RoomRegistry<C> {
    pub fn new(config: GameConfig, pubsub: Arc<dyn PubSub>) -> Self {
        let node_id = generate_node_id();
        tracing::debug!(%node_id, "room registry created");
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            config,
            pubsub,
            node_id,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Identifies this process on the pub/sub channel.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Seats a player in a room, creating the room on first join.
    ///
    /// `board` is a board restored from the resume cache; without one the
    /// player starts with a fresh board. The joiner holds the turn if they
    /// are alone or the other occupant does not hold it, so once two
    /// players are seated exactly one of them has the turn.
    ///
    /// # Errors
    /// - [`RoomError::RoomFull`]: two players are seated; the joining
    ///   connection is told so before the error is returned
    /// - [`RoomError::AlreadyInRoom`]: the player is already seated here
    /// - [`RoomError::InvalidState`]: the room has ended
    /// - [`RoomError::BoardLost`]: the game is running and `board` is
    ///   missing or incomplete
    pub async fn join(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        connection: Arc<C>,
        board: Option<Board>,
    ) -> Result<JoinOutcome, RoomError> {
        let restored = board.is_some();
        let mut board = match board {
            Some(board) => board,
            None => Board::new(self.config.board_size)?,
        };

        let mut rooms = self.rooms.lock().await;
        let room = match rooms.entry(room_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::info!(%room_id, "room created");
                entry.insert(Room {
                    state: RoomState::Empty,
                    players: Vec::new(),
                    members: Vec::new(),
                    relay: self.spawn_relay(room_id),
                })
            }
        };

        if room.state.is_terminal() {
            return Err(RoomError::InvalidState(format!(
                "room {room_id} is {}",
                room.state
            )));
        }
        if room.session(&player_id).is_some() {
            return Err(RoomError::AlreadyInRoom(player_id, room_id.clone()));
        }
        if room.players.len() >= self.config.max_players {
            drop(rooms);
            tracing::info!(%room_id, %player_id, "join rejected, room full");
            if let Err(e) = connection.send(&Notice::RoomFull.to_string()).await {
                tracing::debug!(%room_id, error = %e, "could not deliver room-full notice");
            }
            return Err(RoomError::RoomFull(room_id.clone()));
        }
        if room.state == RoomState::InProgress && !(restored && board.is_initialized()) {
            tracing::warn!(%room_id, %player_id, restored, "rejoin without a usable board");
            return Err(RoomError::BoardLost(player_id, room_id.clone()));
        }

        let is_turn = room.players.first().is_none_or(|other| !other.is_turn);
        board.set_turn(is_turn);
        room.players.push(PlayerSession {
            player_id: player_id.clone(),
            connection,
            board,
            is_turn,
        });
        if !room.members.contains(&player_id) {
            room.members.push(player_id.clone());
        }

        match (room.state, room.players.len()) {
            (RoomState::Empty, 1) => room.transition(room_id, RoomState::OneJoined)?,
            (RoomState::OneJoined, 2) => room.transition(room_id, RoomState::ReadyWait)?,
            _ => {}
        }

        tracing::info!(
            %room_id,
            %player_id,
            players = room.players.len(),
            is_turn,
            state = %room.state,
            "player joined room"
        );
        Ok(JoinOutcome {
            state: room.state,
            players: room.players.len(),
            is_turn,
        })
    }

    /// Removes a player's session, returning how many players remain.
    ///
    /// The room itself stays, so the player can resume; an empty room is
    /// closed by the caller.
    pub async fn leave(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<usize, RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let idx = room
            .position(player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone(), room_id.clone()))?;

        room.players.remove(idx);
        if room.state == RoomState::ReadyWait {
            room.transition(room_id, RoomState::OneJoined)?;
        }

        tracing::info!(%room_id, %player_id, players = room.players.len(), "player left room");
        Ok(room.players.len())
    }

    /// The seated opponent of `player_id`.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`]: `player_id` is not seated here
    /// - [`RoomError::NoOpponent`]: nobody else is seated
    pub async fn other_player(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<PlayerId, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = get(&rooms, room_id)?;
        if room.session(player_id).is_none() {
            return Err(RoomError::NotInRoom(player_id.clone(), room_id.clone()));
        }
        room.players
            .iter()
            .find(|s| s.player_id != *player_id)
            .map(|s| s.player_id.clone())
            .ok_or_else(|| RoomError::NoOpponent(room_id.clone()))
    }

    /// Returns `true` once a board in a running game is fully sunk.
    pub async fn is_game_over(&self, room_id: &RoomId) -> Result<bool, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = get(&rooms, room_id)?;
        Ok(room.state == RoomState::InProgress && room.players.iter().any(|s| s.board.is_over()))
    }

    /// The player whose board is not sunk.
    ///
    /// # Errors
    /// [`RoomError::GameNotOver`] if no board is sunk yet.
    pub async fn winner(&self, room_id: &RoomId) -> Result<PlayerId, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = get(&rooms, room_id)?;
        if room.state != RoomState::InProgress || !room.players.iter().any(|s| s.board.is_over()) {
            return Err(RoomError::GameNotOver(room_id.clone()));
        }
        room.players
            .iter()
            .find(|s| !s.board.is_over())
            .map(|s| s.player_id.clone())
            .ok_or_else(|| RoomError::NoOpponent(room_id.clone()))
    }

    /// The player who holds the turn.
    pub async fn first_mover(&self, room_id: &RoomId) -> Result<PlayerId, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = get(&rooms, room_id)?;
        room.players
            .iter()
            .find(|s| s.is_turn)
            .map(|s| s.player_id.clone())
            .ok_or_else(|| RoomError::InvalidState(format!("nobody holds the turn in {room_id}")))
    }

    pub async fn is_turn(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<bool, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = get(&rooms, room_id)?;
        room.session(player_id)
            .map(PlayerSession::is_turn)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone(), room_id.clone()))
    }

    /// Sends `text` to every seated player, then publishes it for other
    /// processes. Local delivery failures are logged and skipped.
    pub async fn broadcast(&self, room_id: &RoomId, text: &str) -> Result<(), RoomError> {
        let connections = {
            let rooms = self.rooms.lock().await;
            get(&rooms, room_id)?.connections()
        };
        for connection in connections {
            if let Err(e) = connection.send(text).await {
                tracing::debug!(%room_id, error = %e, "broadcast delivery failed");
            }
        }

        let frame = RelayFrame {
            origin: self.node_id.clone(),
            text: text.to_string(),
        };
        match JsonCodec.encode(&frame) {
            Ok(payload) => {
                if let Err(e) = self.pubsub.publish(&room_channel(room_id), payload) {
                    tracing::warn!(%room_id, error = %e, "broadcast publish failed");
                }
            }
            Err(e) => tracing::warn!(%room_id, error = %e, "broadcast frame encoding failed"),
        }
        Ok(())
    }

    /// Sends `text` to one seated player.
    pub async fn send_to(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        text: &str,
    ) -> Result<(), RoomError> {
        let connection = {
            let rooms = self.rooms.lock().await;
            let room = get(&rooms, room_id)?;
            let session = room
                .session(player_id)
                .ok_or_else(|| RoomError::NotInRoom(player_id.clone(), room_id.clone()))?;
            Arc::clone(&session.connection)
        };
        if let Err(e) = connection.send(text).await {
            tracing::debug!(%room_id, %player_id, error = %e, "delivery failed");
        }
        Ok(())
    }

    /// Currently seated players, in join order.
    pub async fn players(&self, room_id: &RoomId) -> Result<Vec<PlayerId>, RoomError> {
        let rooms = self.rooms.lock().await;
        Ok(get(&rooms, room_id)?
            .players
            .iter()
            .map(|s| s.player_id.clone())
            .collect())
    }

    /// Everyone who ever took a seat in the room.
    pub async fn members(&self, room_id: &RoomId) -> Result<Vec<PlayerId>, RoomError> {
        let rooms = self.rooms.lock().await;
        Ok(get(&rooms, room_id)?.members.clone())
    }

    pub async fn state(&self, room_id: &RoomId) -> Result<RoomState, RoomError> {
        let rooms = self.rooms.lock().await;
        Ok(get(&rooms, room_id)?.state)
    }

    /// Both seats are taken and both boards hold their full fleet.
    pub async fn all_initialized(&self, room_id: &RoomId) -> Result<bool, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = get(&rooms, room_id)?;
        Ok(room.players.len() == self.config.max_players
            && room.players.iter().all(|s| s.board.is_initialized()))
    }

    /// Starts the attack phase once both boards are initialized.
    ///
    /// Returns `true` only for the call that made the transition, so
    /// exactly one waiting task announces the game.
    pub async fn mark_in_progress(&self, room_id: &RoomId) -> Result<bool, RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let ready = room.players.len() == self.config.max_players
            && room.players.iter().all(|s| s.board.is_initialized());
        if room.state != RoomState::ReadyWait || !ready {
            return Ok(false);
        }
        room.transition(room_id, RoomState::InProgress)?;
        tracing::info!(%room_id, "game started");
        Ok(true)
    }

    /// Runs `f` on a seated player's board under the room lock.
    pub async fn with_board<R>(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        f: impl FnOnce(&mut Board) -> R,
    ) -> Result<R, RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let idx = room
            .position(player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone(), room_id.clone()))?;
        Ok(f(&mut room.players[idx].board))
    }

    /// A copy of a seated player's board.
    pub async fn board(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<Board, RoomError> {
        self.with_board(room_id, player_id, |board| board.clone()).await
    }

    /// Resolves one attack by `attacker` on the opponent's board.
    ///
    /// The turn check, the board update, and the turn flip on a miss all
    /// happen under one lock. A hit keeps the turn with the attacker.
    ///
    /// # Errors
    /// - [`RoomError::InvalidState`]: the game is not running
    /// - [`RoomError::NotYourTurn`]: `attacker` does not hold the turn
    /// - [`RoomError::NoOpponent`]: the opponent is not connected
    /// - [`RoomError::Board`]: off-board coordinate or repeated hit;
    ///   nothing changed
    pub async fn attack(
        &self,
        room_id: &RoomId,
        attacker: &PlayerId,
        at: Coordinate,
    ) -> Result<AttackReport<C>, RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        if room.state != RoomState::InProgress {
            return Err(RoomError::InvalidState(format!(
                "room {room_id} is {}",
                room.state
            )));
        }

        let a = room
            .position(attacker)
            .ok_or_else(|| RoomError::NotInRoom(attacker.clone(), room_id.clone()))?;
        if !room.players[a].is_turn {
            return Err(RoomError::NotYourTurn(attacker.clone()));
        }
        let d = room
            .players
            .iter()
            .position(|s| s.player_id != *attacker)
            .ok_or_else(|| RoomError::NoOpponent(room_id.clone()))?;

        let hit = room.players[d].board.attack(at)?;
        if !hit {
            room.players[a].set_turn(false);
            room.players[d].set_turn(true);
        }

        let defender = &room.players[d];
        let report = AttackReport {
            hit,
            coordinate: at,
            attacker_connection: Arc::clone(&room.players[a].connection),
            defender: defender.player_id.clone(),
            defender_connection: Arc::clone(&defender.connection),
            defender_board: defender.board.clone(),
            game_over: defender.board.is_over(),
        };
        tracing::info!(
            %room_id,
            %attacker,
            defender = %report.defender,
            coordinate = %at,
            hit,
            game_over = report.game_over,
            "attack resolved"
        );
        Ok(report)
    }

    /// Removes the room and closes every seated connection.
    ///
    /// Returns the room summary to the first caller only; later calls and
    /// calls for unknown rooms return `None`.
    pub async fn close(&self, room_id: &RoomId, final_state: RoomState) -> Option<ClosedRoom> {
        let mut room = self.rooms.lock().await.remove(room_id)?;

        if let Err(e) = room.transition(room_id, final_state) {
            tracing::warn!(%room_id, error = %e, "closing room from unexpected state");
            room.state = final_state;
        }
        // The relay holds a receiver until its task is dropped, and the
        // channel is only released once no receiver is left.
        room.relay.abort();
        match (&mut room.relay).await {
            Err(e) if !e.is_cancelled() => {
                tracing::warn!(%room_id, error = %e, "relay task failed");
            }
            _ => {}
        }
        self.pubsub.unsubscribe(&room_channel(room_id));

        for connection in room.connections() {
            if let Err(e) = connection.close().await {
                tracing::debug!(%room_id, error = %e, "connection already closed");
            }
        }

        tracing::info!(%room_id, state = %room.state, members = room.members.len(), "room closed");
        Some(ClosedRoom {
            room_id: room_id.clone(),
            state: room.state,
            members: room.members,
        })
    }

    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.lock().await.contains_key(room_id)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Forwards frames that other processes broadcast to this room to the
    /// locally seated players.
    fn spawn_relay(&self, room_id: &RoomId) -> JoinHandle<()> {
        let mut frames = self.pubsub.subscribe(&room_channel(room_id));
        let rooms = Arc::clone(&self.rooms);
        let node_id = self.node_id.clone();
        let room_id = room_id.clone();

        tokio::spawn(async move {
            loop {
                let payload = match frames.recv().await {
                    Ok(payload) => payload,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%room_id, skipped, "relay lagged, frames dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let frame: RelayFrame = match JsonCodec.decode(&payload) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(%room_id, error = %e, "unreadable relay frame");
                        continue;
                    }
                };
                if frame.origin == node_id {
                    continue;
                }

                let connections = {
                    let rooms = rooms.lock().await;
                    match rooms.get(&room_id) {
                        Some(room) => room.connections(),
                        None => break,
                    }
                };
                for connection in connections {
                    if let Err(e) = connection.send(&frame.text).await {
                        tracing::debug!(%room_id, error = %e, "relay delivery failed");
                    }
                }
            }
        })
    }
}

fn get<'a, C>(
    rooms: &'a HashMap<RoomId, Room<C>>,
    room_id: &RoomId,
) -> Result<&'a Room<C>, RoomError> {
    rooms
        .get(room_id)
        .ok_or_else(|| RoomError::NotFound(room_id.clone()))
}

/// Random 64-bit hex id for this process.
fn generate_node_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

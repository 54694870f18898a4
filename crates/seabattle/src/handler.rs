//! Per-connection handler: identification, room selection, and the
//! hand-off into the game phases.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the identity token → resolve a `PlayerId`
//!   2. Register the live session (one connection per player)
//!   3. Resume the player's unfinished game, or let them pick a room
//!   4. Placement → readiness wait → attack phase
//!   5. Leave the room; tear it down if nobody is left

use std::sync::{Arc, PoisonError};

use seabattle_protocol::{Notice, PlayerId, ProtocolError, RoomChoice, RoomId};
use seabattle_room::{DirectoryError, RoomDirectory, RoomError, RoomState, RoomStatus};
use seabattle_session::{CacheStore, IdentityProvider, SessionError};
use seabattle_transport::{Connection, ConnectionId};

use crate::server::ServerState;
use crate::{SeabattleError, attack, lifecycle, placement};

/// Whether the conversation goes on after a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Next,
    Stop,
}

/// Drop guard that releases a player's session when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. The session
/// table sits behind a synchronous lock, so the release happens before
/// the handler task is gone and a quick reconnect finds it free.
struct SessionGuard<C: Connection, I, D, S> {
    player_id: PlayerId,
    conn_id: ConnectionId,
    state: Arc<ServerState<C, I, D, S>>,
}

impl<C: Connection, I, D, S> Drop for SessionGuard<C, I, D, S> {
    fn drop(&mut self) {
        let mut sessions = self
            .state
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sessions.disconnect(&self.player_id, self.conn_id) {
            tracing::debug!(player_id = %self.player_id, error = %e, "session already gone");
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, I, D, S>(
    conn: C,
    state: Arc<ServerState<C, I, D, S>>,
) -> Result<(), SeabattleError>
where
    C: Connection,
    I: IdentityProvider,
    D: RoomDirectory,
    S: CacheStore,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let result = serve(&conn, &state).await;

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "connection already closed");
    }
    result
}

async fn serve<C, I, D, S>(
    conn: &Arc<C>,
    state: &Arc<ServerState<C, I, D, S>>,
) -> Result<(), SeabattleError>
where
    C: Connection,
    I: IdentityProvider,
    D: RoomDirectory,
    S: CacheStore,
{
    let shared = Arc::clone(state);
    let state: &ServerState<C, I, D, S> = state;
    let conn_id = conn.id();
    let player_id = identify(conn.as_ref(), state).await?;

    // Create session and guard together: if registration fails no guard
    // is needed, if it succeeds the guard is immediately active.
    let registered = state
        .sessions
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .connect(player_id.clone(), conn_id)
        .map(|_| ());
    if let Err(e) = registered {
        if matches!(e, SessionError::AlreadyConnected(_)) {
            send_notice(conn.as_ref(), Notice::AlreadyConnected).await?;
        }
        return Err(e.into());
    }
    let _guard = SessionGuard {
        player_id: player_id.clone(),
        conn_id,
        state: shared,
    };
    tracing::info!(%conn_id, %player_id, "player identified");

    let Some(room_id) = enter_room(conn, state, &player_id).await? else {
        tracing::info!(%player_id, "connection closed before joining a room");
        return Ok(());
    };

    let played = play(conn, state, &player_id, &room_id).await;
    let left = lifecycle::handle_disconnect(state, &room_id, &player_id).await;

    match played {
        // The room was torn down under us: game over or abandoned.
        Ok(()) | Err(SeabattleError::Room(RoomError::NotFound(_))) => left,
        Err(e) => {
            if let Err(cleanup) = left {
                tracing::warn!(%player_id, %room_id, error = %cleanup, "room cleanup failed");
            }
            Err(e)
        }
    }
}

/// Reads the identity token and resolves it to a player.
async fn identify<C, I, D, S>(
    conn: &C,
    state: &ServerState<C, I, D, S>,
) -> Result<PlayerId, SeabattleError>
where
    C: Connection,
    I: IdentityProvider,
{
    let deadline = state.registry.config().identify_timeout;
    let token = match tokio::time::timeout(deadline, conn.recv()).await {
        Ok(Ok(Some(token))) => token,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before identification".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("identification timed out".into()).into());
        }
    };

    match state.identity.identify(&token).await {
        Ok(player_id) => Ok(player_id),
        Err(e @ SessionError::AuthFailed(_)) => {
            tracing::info!(conn_id = %conn.id(), error = %e, "identification rejected");
            send_notice(conn, Notice::Unauthorized).await?;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Seats the player in a room: their unfinished game if they have one,
/// otherwise one they pick from the open rooms.
///
/// Returns `None` if the connection closed first.
async fn enter_room<C, I, D, S>(
    conn: &Arc<C>,
    state: &ServerState<C, I, D, S>,
    player_id: &PlayerId,
) -> Result<Option<RoomId>, SeabattleError>
where
    C: Connection,
    I: IdentityProvider,
    D: RoomDirectory,
    S: CacheStore,
{
    if let Some(room_id) = resume(conn, state, player_id).await? {
        return Ok(Some(room_id));
    }

    loop {
        let open = state.directory.list_open_rooms().await?;
        send_notice(conn.as_ref(), Notice::SelectRoom(open)).await?;

        let Some(token) = next_frame(conn.as_ref()).await else {
            return Ok(None);
        };
        let room_id = match RoomChoice::parse(&token) {
            Ok(RoomChoice::Room(room_id)) => room_id,
            Ok(RoomChoice::Reload) => {
                if let Some(room_id) = resume(conn, state, player_id).await? {
                    return Ok(Some(room_id));
                }
                continue;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "unreadable room choice");
                send_notice(conn.as_ref(), Notice::WrongRoomId).await?;
                continue;
            }
        };

        let record = match state.directory.get_room(&room_id).await {
            Ok(record) => record,
            Err(DirectoryError::NotFound(_)) => {
                send_notice(conn.as_ref(), Notice::RoomNotFound(room_id)).await?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if record.status != RoomStatus::Free {
            send_notice(conn.as_ref(), Notice::RoomFull).await?;
            continue;
        }

        match state
            .registry
            .join(&room_id, player_id.clone(), Arc::clone(conn), None)
            .await
        {
            Ok(outcome) => {
                state.directory.add_player(&room_id, player_id).await?;
                if outcome.players >= state.registry.config().max_players {
                    state
                        .directory
                        .mark_room_status(&room_id, RoomStatus::InGame)
                        .await?;
                }
                send_notice(conn.as_ref(), Notice::Connected).await?;
                return Ok(Some(room_id));
            }
            // The registry already told the player.
            Err(RoomError::RoomFull(_)) => continue,
            Err(e) => {
                tracing::warn!(%player_id, %room_id, error = %e, "join refused");
                send_notice(conn.as_ref(), Notice::RoomFull).await?;
            }
        }
    }
}

/// Puts the player back into their unfinished game, with their cached
/// board if one survived.
///
/// A running game whose board did not survive cannot go on: it is
/// abandoned and the player falls back to the room list.
async fn resume<C, I, D, S>(
    conn: &Arc<C>,
    state: &ServerState<C, I, D, S>,
    player_id: &PlayerId,
) -> Result<Option<RoomId>, SeabattleError>
where
    C: Connection,
    I: IdentityProvider,
    D: RoomDirectory,
    S: CacheStore,
{
    let Some(room_id) = state.identity.active_room(player_id).await? else {
        return Ok(None);
    };
    let board = state.resume.load(player_id).await?;
    let restored_board = board.is_some();

    match state
        .registry
        .join(&room_id, player_id.clone(), Arc::clone(conn), board)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                %player_id,
                %room_id,
                restored_board,
                state = %outcome.state,
                "session restored"
            );
            send_notice(conn.as_ref(), Notice::Restored).await?;
            Ok(Some(room_id))
        }
        Err(e @ RoomError::BoardLost(..)) => {
            tracing::warn!(%player_id, %room_id, error = %e, "board lost, abandoning game");
            lifecycle::abandon_game(state, &room_id).await?;
            Ok(None)
        }
        Err(e) => {
            tracing::warn!(%player_id, %room_id, error = %e, "resume failed, falling back to room list");
            Ok(None)
        }
    }
}

/// Runs the game phases the room still needs.
async fn play<C, I, D, S>(
    conn: &Arc<C>,
    state: &ServerState<C, I, D, S>,
    player_id: &PlayerId,
    room_id: &RoomId,
) -> Result<(), SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    let conn = conn.as_ref();
    let mut pending = None;

    if state.registry.state(room_id).await? == RoomState::InProgress {
        if state.registry.is_turn(room_id, player_id).await? {
            send_notice(conn, Notice::YourMove).await?;
        }
    } else {
        if placement::place_fleet(conn, state, player_id, room_id).await? == Flow::Stop {
            return Ok(());
        }
        match placement::await_opponent(conn, state, player_id, room_id).await? {
            placement::Readiness::Started(first_frame) => pending = first_frame,
            placement::Readiness::Stopped => return Ok(()),
        }
    }

    attack::attack_loop(conn, state, player_id, room_id, pending).await
}

/// Reads the next frame. `None` once the connection is closed or broken.
pub(crate) async fn next_frame<C: Connection>(conn: &C) -> Option<String> {
    match conn.recv().await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "recv error");
            None
        }
    }
}

pub(crate) async fn send_notice<C: Connection>(
    conn: &C,
    notice: Notice,
) -> Result<(), SeabattleError> {
    conn.send(&notice.to_string()).await?;
    Ok(())
}

/// Asks one question until the answer parses.
///
/// Every unreadable answer is met with `invalid`, which repeats the
/// expected format. Returns `None` if the connection closed.
pub(crate) async fn prompt<C, T>(
    conn: &C,
    ask: Notice,
    invalid: Notice,
    parse: impl Fn(&str) -> Result<T, ProtocolError>,
) -> Result<Option<T>, SeabattleError>
where
    C: Connection,
{
    send_notice(conn, ask).await?;
    loop {
        let Some(token) = next_frame(conn).await else {
            return Ok(None);
        };
        match parse(&token) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => {
                tracing::debug!(conn_id = %conn.id(), error = %e, "invalid input");
                send_notice(conn, invalid.clone()).await?;
            }
        }
    }
}

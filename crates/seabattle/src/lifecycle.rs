//! How a room ends: finished, abandoned, or left by a player.

use seabattle_protocol::{Notice, PlayerId, RoomId};
use seabattle_room::{DirectoryError, RoomDirectory, RoomError, RoomState, RoomStatus};
use seabattle_session::CacheStore;
use seabattle_transport::Connection;

use crate::SeabattleError;
use crate::server::ServerState;

/// Ends a game that has a winner.
///
/// Announces the end, records the result, drops both cached boards, and
/// only then closes the room and its connections. The room is closed even
/// when recording the result fails.
pub(crate) async fn finish_game<C, I, D, S>(
    state: &ServerState<C, I, D, S>,
    room_id: &RoomId,
) -> Result<(), SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    let winner = state.registry.winner(room_id).await?;
    let members = state.registry.members(room_id).await?;

    state
        .registry
        .broadcast(room_id, &Notice::GameOver.to_string())
        .await?;
    let recorded = record_result(state, room_id, &winner, &members).await;

    state.registry.close(room_id, RoomState::Ended).await;
    match &recorded {
        Ok(()) => tracing::info!(%room_id, %winner, "game over"),
        Err(e) => tracing::warn!(%room_id, %winner, error = %e, "game over, result not recorded"),
    }
    recorded
}

async fn record_result<C, I, D, S>(
    state: &ServerState<C, I, D, S>,
    room_id: &RoomId,
    winner: &PlayerId,
    members: &[PlayerId],
) -> Result<(), SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    state
        .directory
        .mark_room_status(room_id, RoomStatus::Ended)
        .await?;
    state.directory.record_winner(room_id, winner).await?;
    state.resume.discard(members).await?;
    Ok(())
}

/// Tears down a game that will never finish.
///
/// Cached boards are dropped and the directory record is deleted rather
/// than marked ended.
pub(crate) async fn abandon_game<C, I, D, S>(
    state: &ServerState<C, I, D, S>,
    room_id: &RoomId,
) -> Result<(), SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    let members = match state.registry.members(room_id).await {
        Ok(members) => members,
        Err(RoomError::NotFound(_)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    state.resume.discard(&members).await?;
    match state.directory.delete_room(room_id).await {
        Ok(()) | Err(DirectoryError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    if state.registry.close(room_id, RoomState::Abandoned).await.is_some() {
        tracing::info!(%room_id, members = members.len(), "game abandoned");
    }
    Ok(())
}

/// Takes a departing player out of their room.
///
/// The opponent, if seated, is told. If nobody is left the game is
/// abandoned.
pub(crate) async fn handle_disconnect<C, I, D, S>(
    state: &ServerState<C, I, D, S>,
    room_id: &RoomId,
    player_id: &PlayerId,
) -> Result<(), SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    let opponent = match state.registry.other_player(room_id, player_id).await {
        Ok(opponent) => Some(opponent),
        Err(RoomError::NoOpponent(_)) => None,
        // Already closed by a finished or abandoned game.
        Err(RoomError::NotFound(_) | RoomError::NotInRoom(..)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let remaining = match state.registry.leave(room_id, player_id).await {
        Ok(remaining) => remaining,
        Err(RoomError::NotFound(_) | RoomError::NotInRoom(..)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if remaining == 0 {
        return abandon_game(state, room_id).await;
    }
    if let Some(opponent) = opponent {
        match state
            .registry
            .send_to(room_id, &opponent, &Notice::OpponentLeft.to_string())
            .await
        {
            // The opponent left in the meantime.
            Ok(()) | Err(RoomError::NotFound(_) | RoomError::NotInRoom(..)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

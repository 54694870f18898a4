//! The attack phase.
//!
//! Every player's task reads its own connection. A frame from the player
//! without the turn is refused before it is even parsed. The registry
//! checks the turn again when it applies the shot.

use seabattle_board::BoardError;
use seabattle_protocol::{Notice, PlayerId, RoomId, parse_coordinate};
use seabattle_room::{AttackReport, RoomDirectory, RoomError};
use seabattle_session::CacheStore;
use seabattle_transport::Connection;

use crate::handler::{Flow, next_frame, send_notice};
use crate::server::ServerState;
use crate::{SeabattleError, lifecycle};

/// Reads shots from `conn` until the game ends or the connection closes.
///
/// `pending` is a frame that already arrived before the loop started.
pub(crate) async fn attack_loop<C, I, D, S>(
    conn: &C,
    state: &ServerState<C, I, D, S>,
    player_id: &PlayerId,
    room_id: &RoomId,
    mut pending: Option<String>,
) -> Result<(), SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    loop {
        let token = match pending.take() {
            Some(token) => token,
            None => match next_frame(conn).await {
                Some(token) => token,
                None => return Ok(()),
            },
        };

        match state.registry.is_turn(room_id, player_id).await {
            Ok(true) => {}
            Ok(false) => {
                send_notice(conn, Notice::NotYourMove).await?;
                continue;
            }
            Err(RoomError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let Ok(at) = parse_coordinate(&token) else {
            send_notice(conn, Notice::InvalidCoordinate).await?;
            continue;
        };

        match state.registry.attack(room_id, player_id, at).await {
            Ok(report) => {
                if resolve(state, room_id, report).await? == Flow::Stop {
                    return Ok(());
                }
            }
            Err(RoomError::NotYourTurn(_)) => send_notice(conn, Notice::NotYourMove).await?,
            Err(RoomError::NoOpponent(_)) => {
                send_notice(conn, Notice::OpponentNotConnected).await?
            }
            Err(RoomError::Board(BoardError::RepeatedAttack(_) | BoardError::OutOfBounds(_))) => {
                send_notice(conn, Notice::InvalidCoordinate).await?
            }
            Err(RoomError::InvalidState(reason)) => {
                tracing::debug!(%room_id, %player_id, %reason, "attack outside a running game");
                send_notice(conn, Notice::GameNotStarted).await?;
            }
            Err(RoomError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Persists the defender's board, tells both sides what happened, and
/// ends the game if that was the last ship.
async fn resolve<C, I, D, S>(
    state: &ServerState<C, I, D, S>,
    room_id: &RoomId,
    report: AttackReport<C>,
) -> Result<Flow, SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    state
        .resume
        .save(&report.defender, &report.defender_board)
        .await?;

    let (to_attacker, to_defender) = if report.hit {
        (Notice::Hit, Notice::HitAt(report.coordinate))
    } else {
        (Notice::Miss, Notice::YourMove)
    };
    send_notice(report.attacker_connection.as_ref(), to_attacker).await?;
    if let Err(e) = report.defender_connection.send(&to_defender.to_string()).await {
        tracing::debug!(%room_id, defender = %report.defender, error = %e, "defender unreachable");
    }

    if report.game_over {
        lifecycle::finish_game(state, room_id).await?;
        return Ok(Flow::Stop);
    }
    Ok(Flow::Next)
}

//! Placement phase and the readiness wait.

use std::time::Duration;

use seabattle_board::{BoardError, Orientation};
use seabattle_protocol::{
    Notice, PlayerId, RoomId, parse_coordinate, parse_ship_type, parse_vertical,
};
use seabattle_room::{RoomDirectory, RoomError, RoomState};
use seabattle_session::CacheStore;
use seabattle_transport::Connection;
use tokio::time::{Instant, MissedTickBehavior};

use crate::handler::{Flow, next_frame, prompt, send_notice};
use crate::server::ServerState;
use crate::{SeabattleError, lifecycle};

/// How the readiness wait ended.
#[derive(Debug)]
pub(crate) enum Readiness {
    /// The attack phase is on. Carries a frame that arrived just as the
    /// game started, which belongs to the attack phase.
    Started(Option<String>),
    Stopped,
}

/// Asks for ships until the player's whole fleet is on the board.
///
/// Each field is asked for separately and re-asked until it parses. A
/// placement the board refuses leaves the inventory untouched and starts
/// over with the ship type. Every accepted ship is written through to the
/// resume cache.
pub(crate) async fn place_fleet<C, I, D, S>(
    conn: &C,
    state: &ServerState<C, I, D, S>,
    player_id: &PlayerId,
    room_id: &RoomId,
) -> Result<Flow, SeabattleError>
where
    C: Connection,
    S: CacheStore,
{
    loop {
        let initialized = state
            .registry
            .with_board(room_id, player_id, |board| board.is_initialized())
            .await?;
        if initialized {
            return Ok(Flow::Next);
        }

        let Some(type_id) = prompt(
            conn,
            Notice::ShipTypePrompt,
            Notice::InvalidShipType,
            parse_ship_type,
        )
        .await?
        else {
            return Ok(Flow::Stop);
        };

        let left = state
            .registry
            .with_board(room_id, player_id, |board| board.remaining(type_id))
            .await?;
        if left == Some(0) {
            send_notice(conn, Notice::FleetExhausted(type_id)).await?;
            continue;
        }

        // A single-cell boat has no direction.
        let vertical = if type_id == 1 {
            false
        } else {
            match prompt(
                conn,
                Notice::VerticalPrompt,
                Notice::InvalidVertical,
                parse_vertical,
            )
            .await?
            {
                Some(vertical) => vertical,
                None => return Ok(Flow::Stop),
            }
        };

        let Some(at) = prompt(
            conn,
            Notice::CoordinatePrompt,
            Notice::InvalidCoordinate,
            parse_coordinate,
        )
        .await?
        else {
            return Ok(Flow::Stop);
        };

        let placed = state
            .registry
            .with_board(room_id, player_id, |board| {
                board
                    .place_ship(type_id, at, Orientation::from_vertical(vertical))
                    .map(|placed| placed.then(|| board.clone()))
            })
            .await?;

        match placed {
            Ok(Some(board)) => {
                state.resume.save(player_id, &board).await?;
                tracing::info!(
                    %room_id,
                    %player_id,
                    type_id,
                    %at,
                    vertical,
                    left = board.remaining_total(),
                    "ship placed"
                );
                send_notice(conn, Notice::ShipPlaced).await?;
            }
            Ok(None) => send_notice(conn, Notice::CellsNotFree).await?,
            Err(BoardError::OutOfBounds(_)) => send_notice(conn, Notice::InvalidCoordinate).await?,
            Err(BoardError::FleetExhausted(type_id)) => {
                send_notice(conn, Notice::FleetExhausted(type_id)).await?
            }
            Err(e) => return Err(RoomError::from(e).into()),
        }
    }
}

/// Waits for the opponent to finish placing, then starts the game.
///
/// Both boards are re-checked every `ready_poll_interval`. Whichever
/// waiting player sees both fleets first announces the game. Past
/// `ready_timeout` the room is abandoned. Frames sent during the wait are
/// answered with a reminder, except one that races the game start.
pub(crate) async fn await_opponent<C, I, D, S>(
    conn: &C,
    state: &ServerState<C, I, D, S>,
    player_id: &PlayerId,
    room_id: &RoomId,
) -> Result<Readiness, SeabattleError>
where
    C: Connection,
    D: RoomDirectory,
    S: CacheStore,
{
    let config = state.registry.config();
    if state.registry.state(room_id).await? == RoomState::InProgress {
        return Ok(Readiness::Started(None));
    }
    send_notice(conn, Notice::WaitForOpponent).await?;

    let started = Instant::now();
    let mut ticks = tokio::time::interval(config.ready_poll_interval.max(Duration::from_millis(1)));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_notice = config.ready_notice_every;

    loop {
        let frame = tokio::select! {
            _ = ticks.tick() => None,
            frame = next_frame(conn) => match frame {
                Some(frame) => Some(frame),
                None => return Ok(Readiness::Stopped),
            },
        };

        if let Some(frame) = frame {
            match state.registry.state(room_id).await {
                Ok(RoomState::InProgress) => return Ok(Readiness::Started(Some(frame))),
                Ok(_) => send_notice(conn, Notice::WaitForOpponent).await?,
                Err(RoomError::NotFound(_)) => return Ok(Readiness::Stopped),
                Err(e) => return Err(e.into()),
            }
            continue;
        }

        match state.registry.state(room_id).await {
            Ok(RoomState::InProgress) => return Ok(Readiness::Started(None)),
            Ok(_) => {}
            Err(RoomError::NotFound(_)) => return Ok(Readiness::Stopped),
            Err(e) => return Err(e.into()),
        }

        if state.registry.mark_in_progress(room_id).await? {
            let first = state.registry.first_mover(room_id).await?;
            tracing::info!(%room_id, %first, "both fleets placed");
            state
                .registry
                .broadcast(room_id, &Notice::GameStarted { first: first.clone() }.to_string())
                .await?;
            state
                .registry
                .send_to(room_id, &first, &Notice::YourMove.to_string())
                .await?;
            return Ok(Readiness::Started(None));
        }

        let elapsed = started.elapsed();
        if elapsed >= config.ready_timeout {
            tracing::info!(%room_id, %player_id, "readiness wait timed out");
            state
                .registry
                .broadcast(room_id, &Notice::GameNotStarted.to_string())
                .await?;
            lifecycle::abandon_game(state, room_id).await?;
            return Ok(Readiness::Stopped);
        }

        if !next_notice.is_zero() && elapsed >= next_notice {
            let remaining = config.ready_timeout.saturating_sub(next_notice).as_secs();
            send_notice(conn, Notice::SecondsRemaining(remaining)).await?;
            next_notice += config.ready_notice_every;
        }
    }
}

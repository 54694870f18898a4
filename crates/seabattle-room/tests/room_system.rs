//! Integration tests for the room registry over in-memory connections.

use std::sync::Arc;
use std::time::Duration;

use seabattle_board::{Board, BoardError, Coordinate, Orientation};
use seabattle_protocol::{Notice, PlayerId, RoomId};
use seabattle_room::{
    GameConfig, LocalPubSub, PubSub, RoomError, RoomRegistry, RoomState, room_channel,
};
use seabattle_transport::{MemoryClient, MemoryConnection};

// =========================================================================
// Helpers
// =========================================================================

fn pid(name: &str) -> PlayerId {
    PlayerId::new(name)
}

fn room() -> RoomId {
    RoomId::new("room-1")
}

fn at(s: &str) -> Coordinate {
    Coordinate::parse(s).unwrap()
}

fn registry() -> RoomRegistry<MemoryConnection> {
    RoomRegistry::new(GameConfig::default(), Arc::new(LocalPubSub::new()))
}

/// A board holding the whole fleet, every ship horizontal.
fn full_board() -> Board {
    let mut board = Board::default();
    for (type_id, start) in [
        (4, "A1"),
        (3, "A3"),
        (3, "E3"),
        (2, "A5"),
        (2, "D5"),
        (2, "G5"),
        (1, "A7"),
        (1, "C7"),
        (1, "E7"),
        (1, "G7"),
    ] {
        assert!(board.place_ship(type_id, at(start), Orientation::Horizontal).unwrap());
    }
    assert!(board.is_initialized());
    board
}

/// Joins `name` to `room()` and returns the client end of its connection.
async fn join(
    registry: &RoomRegistry<MemoryConnection>,
    name: &str,
    board: Option<Board>,
) -> MemoryClient {
    let (server, client) = MemoryConnection::pair();
    registry
        .join(&room(), pid(name), Arc::new(server), board)
        .await
        .expect("join should succeed");
    client
}

/// Two players with full fleets, game started, alice to move.
async fn started_game(
    registry: &RoomRegistry<MemoryConnection>,
) -> (MemoryClient, MemoryClient) {
    let alice = join(registry, "alice", Some(full_board())).await;
    let bob = join(registry, "bob", Some(full_board())).await;
    assert!(registry.all_initialized(&room()).await.unwrap());
    assert!(registry.mark_in_progress(&room()).await.unwrap());
    (alice, bob)
}

async fn next_frame(client: &MemoryClient) -> String {
    tokio::time::timeout(Duration::from_secs(1), client.recv())
        .await
        .expect("frame should arrive")
        .expect("connection should be open")
}

// =========================================================================
// Pairing
// =========================================================================

#[tokio::test]
async fn test_two_players_pair_with_exactly_one_turn() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;
    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::OneJoined);

    let _bob = join(&registry, "bob", None).await;

    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::ReadyWait);
    assert!(registry.is_turn(&room(), &pid("alice")).await.unwrap());
    assert!(!registry.is_turn(&room(), &pid("bob")).await.unwrap());
    assert_eq!(registry.first_mover(&room()).await.unwrap(), pid("alice"));
    assert_eq!(registry.players(&room()).await.unwrap(), vec![pid("alice"), pid("bob")]);
}

#[tokio::test]
async fn test_third_join_is_rejected_and_notified() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;
    let _bob = join(&registry, "bob", None).await;

    let (server, carol) = MemoryConnection::pair();
    let result = registry.join(&room(), pid("carol"), Arc::new(server), None).await;

    assert!(matches!(result, Err(RoomError::RoomFull(_))));
    assert_eq!(next_frame(&carol).await, Notice::RoomFull.to_string());
    assert_eq!(registry.players(&room()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_same_player_cannot_join_twice() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;

    let (server, _client) = MemoryConnection::pair();
    let result = registry.join(&room(), pid("alice"), Arc::new(server), None).await;

    assert!(matches!(result, Err(RoomError::AlreadyInRoom(_, _))));
}

#[tokio::test]
async fn test_leave_during_ready_wait_reopens_seat() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;
    let _bob = join(&registry, "bob", None).await;

    assert_eq!(registry.leave(&room(), &pid("alice")).await.unwrap(), 1);
    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::OneJoined);

    // Bob does not hold the turn, so the returning player gets it.
    let _alice = join(&registry, "alice", None).await;
    assert!(registry.is_turn(&room(), &pid("alice")).await.unwrap());
    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::ReadyWait);
    assert_eq!(registry.members(&room()).await.unwrap(), vec![pid("alice"), pid("bob")]);
}

#[tokio::test]
async fn test_other_player_names_the_opponent() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;
    assert!(matches!(
        registry.other_player(&room(), &pid("alice")).await,
        Err(RoomError::NoOpponent(_))
    ));

    let _bob = join(&registry, "bob", None).await;
    assert_eq!(registry.other_player(&room(), &pid("alice")).await.unwrap(), pid("bob"));
    assert_eq!(registry.other_player(&room(), &pid("bob")).await.unwrap(), pid("alice"));

    assert!(matches!(
        registry.other_player(&room(), &pid("carol")).await,
        Err(RoomError::NotInRoom(_, _))
    ));
    assert!(matches!(
        registry.other_player(&RoomId::new("nope"), &pid("alice")).await,
        Err(RoomError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_leave_unknown_player_or_room() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;

    assert!(matches!(
        registry.leave(&room(), &pid("bob")).await,
        Err(RoomError::NotInRoom(_, _))
    ));
    assert!(matches!(
        registry.leave(&RoomId::new("nope"), &pid("alice")).await,
        Err(RoomError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_game_starts_only_when_both_boards_initialized() {
    let registry = registry();
    let _alice = join(&registry, "alice", Some(full_board())).await;
    let _bob = join(&registry, "bob", None).await;

    assert!(!registry.all_initialized(&room()).await.unwrap());
    assert!(!registry.mark_in_progress(&room()).await.unwrap());

    registry
        .with_board(&room(), &pid("bob"), |board| *board = full_board())
        .await
        .unwrap();

    assert!(registry.mark_in_progress(&room()).await.unwrap());
    // A second waiter must not announce the game again.
    assert!(!registry.mark_in_progress(&room()).await.unwrap());
    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::InProgress);
}

// =========================================================================
// Attacks
// =========================================================================

#[tokio::test]
async fn test_attack_before_start_is_invalid_state() {
    let registry = registry();
    let _alice = join(&registry, "alice", None).await;
    let _bob = join(&registry, "bob", None).await;

    assert!(matches!(
        registry.attack(&room(), &pid("alice"), at("A1")).await,
        Err(RoomError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_miss_passes_turn_and_hit_keeps_it() {
    let registry = registry();
    let _clients = started_game(&registry).await;

    assert!(matches!(
        registry.attack(&room(), &pid("bob"), at("A1")).await,
        Err(RoomError::NotYourTurn(_))
    ));

    let report = registry.attack(&room(), &pid("alice"), at("J10")).await.unwrap();
    assert!(!report.hit);
    assert_eq!(report.defender, pid("bob"));
    assert!(!registry.is_turn(&room(), &pid("alice")).await.unwrap());
    assert!(registry.is_turn(&room(), &pid("bob")).await.unwrap());
    assert!(report.defender_board.turn());

    let report = registry.attack(&room(), &pid("bob"), at("A1")).await.unwrap();
    assert!(report.hit);
    assert!(!report.game_over);
    assert!(registry.is_turn(&room(), &pid("bob")).await.unwrap());
    assert!(!registry.is_turn(&room(), &pid("alice")).await.unwrap());
}

#[tokio::test]
async fn test_repeated_hit_is_rejected_without_losing_turn() {
    let registry = registry();
    let _clients = started_game(&registry).await;

    registry.attack(&room(), &pid("alice"), at("B1")).await.unwrap();
    let result = registry.attack(&room(), &pid("alice"), at("B1")).await;

    assert!(matches!(
        result,
        Err(RoomError::Board(BoardError::RepeatedAttack(c))) if c == at("B1")
    ));
    assert!(registry.is_turn(&room(), &pid("alice")).await.unwrap());
}

#[tokio::test]
async fn test_off_board_attack_is_rejected() {
    let registry = registry();
    let _clients = started_game(&registry).await;

    assert!(matches!(
        registry.attack(&room(), &pid("alice"), at("K1")).await,
        Err(RoomError::Board(BoardError::OutOfBounds(_)))
    ));
}

#[tokio::test]
async fn test_sinking_every_ship_ends_game() {
    let registry = registry();
    let _clients = started_game(&registry).await;
    assert!(matches!(
        registry.winner(&room()).await,
        Err(RoomError::GameNotOver(_))
    ));

    let targets: Vec<Coordinate> = full_board()
        .ships()
        .iter()
        .flat_map(|ship| ship.cells().to_vec())
        .collect();
    let (last, rest) = targets.split_last().unwrap();
    for cell in rest {
        let report = registry.attack(&room(), &pid("alice"), *cell).await.unwrap();
        assert!(report.hit);
        assert!(!report.game_over);
        assert!(!registry.is_game_over(&room()).await.unwrap());
    }

    let report = registry.attack(&room(), &pid("alice"), *last).await.unwrap();
    assert!(report.game_over);
    assert!(registry.is_game_over(&room()).await.unwrap());
    assert_eq!(registry.winner(&room()).await.unwrap(), pid("alice"));
}

#[tokio::test]
async fn test_attack_without_opponent_is_rejected() {
    let registry = registry();
    let _clients = started_game(&registry).await;
    registry.leave(&room(), &pid("bob")).await.unwrap();

    // The game keeps running so bob can resume.
    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::InProgress);
    assert!(matches!(
        registry.attack(&room(), &pid("alice"), at("A1")).await,
        Err(RoomError::NoOpponent(_))
    ));
}

#[tokio::test]
async fn test_rejoin_running_game_without_board_is_refused() {
    let registry = registry();
    let _clients = started_game(&registry).await;
    registry.leave(&room(), &pid("bob")).await.unwrap();

    let (server, _bob) = MemoryConnection::pair();
    let result = registry.join(&room(), pid("bob"), Arc::new(server), None).await;
    assert!(matches!(result, Err(RoomError::BoardLost(_, _))));

    // A half-placed board is no better than none.
    let mut partial = Board::default();
    partial.place_ship(4, at("A1"), Orientation::Horizontal).unwrap();
    let (server, _bob) = MemoryConnection::pair();
    let result = registry
        .join(&room(), pid("bob"), Arc::new(server), Some(partial))
        .await;
    assert!(matches!(result, Err(RoomError::BoardLost(_, _))));

    assert_eq!(registry.players(&room()).await.unwrap(), vec![pid("alice")]);
    assert!(!registry.is_game_over(&room()).await.unwrap());
}

#[tokio::test]
async fn test_rejoin_running_game_with_cached_board() {
    let registry = registry();
    let _clients = started_game(&registry).await;
    registry.attack(&room(), &pid("alice"), at("J10")).await.unwrap();
    let cached = registry.board(&room(), &pid("bob")).await.unwrap();
    registry.leave(&room(), &pid("bob")).await.unwrap();

    let _bob = join(&registry, "bob", Some(cached)).await;

    assert_eq!(registry.state(&room()).await.unwrap(), RoomState::InProgress);
    assert!(registry.is_turn(&room(), &pid("bob")).await.unwrap());
    assert!(!registry.is_game_over(&room()).await.unwrap());
}

// =========================================================================
// Delivery and teardown
// =========================================================================

#[tokio::test]
async fn test_broadcast_and_send_to() {
    let registry = registry();
    let (alice, bob) = started_game(&registry).await;

    registry.broadcast(&room(), "Game Over!").await.unwrap();
    assert_eq!(next_frame(&alice).await, "Game Over!");
    assert_eq!(next_frame(&bob).await, "Game Over!");

    registry.send_to(&room(), &pid("bob"), "Your move now.").await.unwrap();
    assert_eq!(next_frame(&bob).await, "Your move now.");
}

#[tokio::test]
async fn test_close_is_idempotent_and_closes_connections() {
    let registry = registry();
    let (alice, bob) = started_game(&registry).await;

    let closed = registry
        .close(&room(), RoomState::Abandoned)
        .await
        .expect("first close returns the room");
    assert_eq!(closed.state, RoomState::Abandoned);
    assert_eq!(closed.members, vec![pid("alice"), pid("bob")]);

    assert!(registry.close(&room(), RoomState::Abandoned).await.is_none());
    assert!(!registry.contains(&room()).await);
    assert_eq!(alice.recv().await, None);
    assert_eq!(bob.recv().await, None);
}

#[tokio::test]
async fn test_close_releases_pubsub_channels() {
    let pubsub = Arc::new(LocalPubSub::new());
    let registry = RoomRegistry::<MemoryConnection>::new(GameConfig::default(), pubsub.clone());

    let mut clients = Vec::new();
    for n in 0..5 {
        let (server, client) = MemoryConnection::pair();
        registry
            .join(&RoomId::new(format!("room-{n}")), pid("alice"), Arc::new(server), None)
            .await
            .unwrap();
        clients.push(client);
    }
    assert_eq!(pubsub.channel_count(), 5);

    for n in 0..5 {
        registry
            .close(&RoomId::new(format!("room-{n}")), RoomState::Abandoned)
            .await
            .unwrap();
    }
    assert_eq!(registry.room_count().await, 0);
    assert_eq!(pubsub.channel_count(), 0);

    // Nothing is listening any more.
    assert_eq!(pubsub.publish(&room_channel(&room()), b"x".to_vec()).unwrap(), 0);
}

#[tokio::test]
async fn test_relay_forwards_frames_between_processes() {
    let pubsub = Arc::new(LocalPubSub::new());
    let node_a = RoomRegistry::<MemoryConnection>::new(GameConfig::default(), pubsub.clone());
    let node_b = RoomRegistry::<MemoryConnection>::new(GameConfig::default(), pubsub);
    assert_ne!(node_a.node_id(), node_b.node_id());

    let alice = join(&node_a, "alice", None).await;
    let bob = join(&node_b, "bob", None).await;

    node_a.broadcast(&room(), "Game started! First move to alice.").await.unwrap();

    assert_eq!(next_frame(&alice).await, "Game started! First move to alice.");
    assert_eq!(next_frame(&bob).await, "Game started! First move to alice.");

    // The sender's own relay must not echo the frame back.
    let echo = tokio::time::timeout(Duration::from_millis(50), alice.recv()).await;
    assert!(echo.is_err(), "unexpected echo: {echo:?}");
}

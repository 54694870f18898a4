//! Property tests for the board invariants.

use proptest::prelude::*;
use seabattle_board::{
    Board, BoardError, BoardSnapshot, Coordinate, FLEET_TOTAL, Orientation,
};

fn coordinate() -> impl Strategy<Value = Coordinate> {
    (0u8..10, 1u8..=10).prop_map(|(c, r)| Coordinate::new((b'A' + c) as char, r))
}

fn placement() -> impl Strategy<Value = (u8, Coordinate, Orientation)> {
    (
        1u8..=4,
        coordinate(),
        any::<bool>().prop_map(Orientation::from_vertical),
    )
}

/// Applies placements, ignoring the ones the board refuses.
fn board_from(placements: &[(u8, Coordinate, Orientation)]) -> Board {
    let mut board = Board::default();
    for (type_id, at, orientation) in placements {
        let _ = board.place_ship(*type_id, *at, *orientation);
    }
    board
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn fleet_is_conserved(placements in prop::collection::vec(placement(), 0..40)) {
        let mut board = Board::default();
        for (type_id, at, orientation) in placements {
            let _ = board.place_ship(type_id, at, orientation);
            prop_assert_eq!(board.remaining_total() + board.ships().len(), FLEET_TOTAL);
        }
    }

    #[test]
    fn refused_placement_changes_nothing(
        placements in prop::collection::vec(placement(), 0..40),
        extra in placement(),
    ) {
        let mut board = board_from(&placements);
        let before = board.clone();
        let (type_id, at, orientation) = extra;
        match board.place_ship(type_id, at, orientation) {
            Ok(true) => prop_assert_eq!(board.ships().len(), before.ships().len() + 1),
            Ok(false) | Err(_) => prop_assert_eq!(&board, &before),
        }
    }

    #[test]
    fn no_cell_is_shared(placements in prop::collection::vec(placement(), 0..40)) {
        let board = board_from(&placements);
        let mut seen = std::collections::HashSet::new();
        for ship in board.ships() {
            for cell in ship.cells() {
                prop_assert!(seen.insert(*cell), "cell {} used twice", cell);
            }
        }
    }

    #[test]
    fn second_hit_on_same_cell_is_rejected(
        placements in prop::collection::vec(placement(), 1..40),
        target in coordinate(),
    ) {
        let mut board = board_from(&placements);
        let hit = board.attack(target).unwrap();
        let after_first = board.clone();
        let second = board.attack(target);
        if hit {
            prop_assert_eq!(second, Err(BoardError::RepeatedAttack(target)));
            prop_assert_eq!(&board, &after_first);
        } else {
            prop_assert_eq!(second, Ok(false));
        }
    }

    #[test]
    fn over_iff_ships_placed_and_fully_hit(
        placements in prop::collection::vec(placement(), 1..40),
        shots in prop::collection::vec(coordinate(), 0..120),
    ) {
        let mut board = board_from(&placements);
        for shot in shots {
            let _ = board.attack(shot);
            let all_hit = !board.ships().is_empty()
                && board
                    .ships()
                    .iter()
                    .all(|ship| board.hits_on(ship.key()) == ship.length());
            prop_assert_eq!(board.is_over(), all_hit);
        }
    }

    #[test]
    fn snapshot_round_trip(
        placements in prop::collection::vec(placement(), 0..40),
        shots in prop::collection::vec(coordinate(), 0..60),
        turn in any::<bool>(),
    ) {
        let mut board = board_from(&placements);
        for shot in shots {
            let _ = board.attack(shot);
        }
        board.set_turn(turn);

        let json = serde_json::to_vec(&BoardSnapshot::from(&board)).unwrap();
        let snapshot: BoardSnapshot = serde_json::from_slice(&json).unwrap();
        let restored = Board::try_from(snapshot).unwrap();
        prop_assert_eq!(restored, board);
    }
}

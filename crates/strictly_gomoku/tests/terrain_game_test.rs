//! Terrain variant games driven through the engine.

use strictly_gomoku::terrain::{TerrainEvent, TileWeights, compare};
use strictly_gomoku::{
    Coord, EndReason, MatchConfig, MatchEngine, Outcome, Side, TerrainPolicy, Variant,
    VariantEvent,
};

fn weights(double: u32, freeze: u32) -> TileWeights {
    TileWeights {
        skill: 0,
        double,
        block: 0,
        bomb: 0,
        freeze,
        teleport: 0,
        shield: 0,
        mystery: 0,
        score: 0,
    }
}

fn terrain_engine(board_size: usize, weights: TileWeights) -> MatchEngine {
    let policy = TerrainPolicy {
        weights,
        ..TerrainPolicy::default()
    };
    let config = MatchConfig::default()
        .with_variant(Variant::Terrain)
        .with_board_size(board_size)
        .with_terrain(policy)
        .with_seed(42);
    MatchEngine::new(config).expect("valid config")
}

#[test]
fn test_full_board_decided_by_score() {
    let mut e = terrain_engine(5, weights(0, 0));
    let cells: Vec<Coord> = e.state().board().coords().collect();

    let mut last = None;
    for coord in cells {
        let side = *e.state().side_to_move();
        last = Some(e.apply_move(side, coord).unwrap());
    }

    let outcome = last.expect("moves applied");
    let totals = outcome.terrain_totals.expect("terrain totals reported");
    let verdict = outcome.verdict.expect("full board ends the game");
    assert_eq!(verdict.result.reason, EndReason::Score);

    let black = e.state().terrain_score(Side::Black);
    let white = e.state().terrain_score(Side::White);
    assert_eq!(totals, [black.total, white.total]);
    let expected = match compare(&black, &white) {
        Some(side) => Outcome::Winner(side),
        None => Outcome::Draw,
    };
    assert_eq!(verdict.result.outcome, expected);
}

#[test]
fn test_five_in_a_row_does_not_end_terrain_game() {
    let mut e = terrain_engine(9, weights(0, 0));
    for x in 0..4 {
        e.apply_move(Side::Black, Coord::new(x, 0)).unwrap();
        e.apply_move(Side::White, Coord::new(x, 8)).unwrap();
    }
    let outcome = e.apply_move(Side::Black, Coord::new(4, 0)).unwrap();
    assert!(outcome.verdict.is_none());
    assert!(!e.state().is_over());
}

#[test]
fn test_double_tile_grants_extra_turn() {
    let mut e = terrain_engine(9, weights(100, 0));
    let outcome = e.apply_move(Side::Black, Coord::new(4, 4)).unwrap();
    assert!(outcome.events.iter().any(|ev| matches!(
        ev,
        VariantEvent::Terrain(TerrainEvent::ExtraTurn { side: Side::Black })
    )));
    assert_eq!(outcome.next_side, Side::Black);
}

#[test]
fn test_freeze_tile_skips_opponent() {
    let mut e = terrain_engine(9, weights(0, 100));
    let outcome = e.apply_move(Side::Black, Coord::new(4, 4)).unwrap();
    assert_eq!(outcome.next_side, Side::Black);
    let outcome = e.apply_move(Side::Black, Coord::new(5, 5)).unwrap();
    assert_eq!(outcome.next_side, Side::Black);
}

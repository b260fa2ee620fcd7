//! End-to-end games through the public engine surface.

use strictly_gomoku::{
    Coord, EndReason, MatchConfig, MatchEngine, Opening, Outcome, RuleViolation, Seat, Side,
    Swap2Action, Swap2Phase,
};

fn engine(config: MatchConfig) -> MatchEngine {
    MatchEngine::new(config).expect("valid config")
}

#[test]
fn test_vertical_five_wins() {
    let mut e = engine(MatchConfig::default());

    for y in 7..11 {
        e.apply_move(Side::Black, Coord::new(7, y)).unwrap();
        e.apply_move(Side::White, Coord::new(0, y)).unwrap();
    }
    let outcome = e.apply_move(Side::Black, Coord::new(7, 11)).unwrap();

    assert!(outcome.is_winning_move());
    let verdict = outcome.verdict.expect("game should end");
    assert_eq!(verdict.result.outcome, Outcome::Winner(Side::Black));
    assert_eq!(verdict.result.reason, EndReason::Line);
    assert_eq!(verdict.scores.black, 1);
    assert_eq!(verdict.series_winner, None);
    assert!(e.state().is_over());
}

#[test]
fn test_broken_line_does_not_win() {
    let mut e = engine(MatchConfig::default());

    // Black: (0,0) (1,0) (2,0) _ (4,0) with White filling the gap.
    e.apply_move(Side::Black, Coord::new(0, 0)).unwrap();
    e.apply_move(Side::White, Coord::new(3, 0)).unwrap();
    e.apply_move(Side::Black, Coord::new(1, 0)).unwrap();
    e.apply_move(Side::White, Coord::new(9, 9)).unwrap();
    e.apply_move(Side::Black, Coord::new(2, 0)).unwrap();
    e.apply_move(Side::White, Coord::new(9, 10)).unwrap();
    let outcome = e.apply_move(Side::Black, Coord::new(4, 0)).unwrap();

    assert!(outcome.verdict.is_none());
    assert_eq!(outcome.next_side, Side::White);
}

#[test]
fn test_series_to_two_wins() {
    let mut e = engine(MatchConfig::default().with_board_size(9).with_win_length(4));

    for x in 0..3 {
        e.apply_move(Side::Black, Coord::new(x, 0)).unwrap();
        e.apply_move(Side::White, Coord::new(x, 8)).unwrap();
    }
    e.apply_move(Side::Black, Coord::new(3, 0)).unwrap();
    assert_eq!(e.state().scores().black, 1);

    assert_eq!(e.next_game(), Ok(2));
    assert_eq!(e.state().move_count(), 0);
    assert_eq!(*e.state().side_to_move(), Side::Black);

    let verdict = e.resign(Side::White).unwrap();
    assert_eq!(verdict.series_winner, Some(Seat::First));
    assert_eq!(e.next_game(), Err(RuleViolation::MatchOver));
    assert_eq!(
        e.apply_move(Side::White, Coord::new(4, 4)),
        Err(RuleViolation::MatchOver)
    );
}

#[test]
fn test_swap2_three_stone_path() {
    let mut e = engine(MatchConfig::default().with_opening(Opening::Swap2));
    assert_eq!(e.state().phase(), Swap2Phase::Placement);

    let coords = [Coord::new(7, 7), Coord::new(8, 7), Coord::new(7, 8)];
    for (i, coord) in coords.iter().enumerate() {
        let step = e.apply_swap2(Seat::First, Swap2Action::Place(*coord)).unwrap();
        let placed = step.placed.expect("stone placed");
        assert_eq!(placed.move_number, i as u32 + 1);
    }
    assert_eq!(e.state().phase(), Swap2Phase::Choice);

    let step = e.apply_swap2(Seat::Second, Swap2Action::Choose(Side::Black)).unwrap();
    assert_eq!(step.phase, Swap2Phase::Complete);
    assert_eq!(step.next_side, Some(Side::White));

    let assignment = e.state().assignment().expect("assignment fixed");
    assert_eq!(assignment.side_of(Seat::Second), Side::Black);
    assert_eq!(assignment.side_of(Seat::First), Side::White);
    assert_eq!(*e.state().side_to_move(), Side::White);

    let board = e.state().board();
    assert_eq!(board.occupant(coords[0]), Some(Side::Black));
    assert_eq!(board.occupant(coords[1]), Some(Side::White));
    assert_eq!(board.occupant(coords[2]), Some(Side::Black));

    let outcome = e.apply_move(Side::White, Coord::new(0, 0)).unwrap();
    assert_eq!(outcome.move_number, 4);
}

#[test]
fn test_swap2_five_stone_path() {
    let mut e = engine(MatchConfig::default().with_opening(Opening::Swap2));
    let coords = [
        Coord::new(7, 7),
        Coord::new(8, 7),
        Coord::new(7, 8),
        Coord::new(6, 6),
        Coord::new(9, 9),
    ];

    for coord in &coords[..3] {
        e.apply_swap2(Seat::First, Swap2Action::Place(*coord)).unwrap();
    }
    let step = e.apply_swap2(Seat::Second, Swap2Action::Defer).unwrap();
    assert_eq!(step.phase, Swap2Phase::ExtraPlacement);
    assert_eq!(
        e.apply_swap2(Seat::First, Swap2Action::Place(Coord::new(0, 0))),
        Err(RuleViolation::WrongSeat(Seat::First))
    );
    for coord in &coords[3..] {
        e.apply_swap2(Seat::Second, Swap2Action::Place(*coord)).unwrap();
    }
    assert_eq!(e.state().phase(), Swap2Phase::FinalChoice);

    e.apply_swap2(Seat::First, Swap2Action::Choose(Side::White)).unwrap();
    let assignment = e.state().assignment().expect("assignment fixed");
    assert_eq!(assignment.side_of(Seat::First), Side::White);
    assert_eq!(*e.state().side_to_move(), Side::White);

    let board = e.state().board();
    for (i, coord) in coords.iter().enumerate() {
        let expected = if matches!(i + 1, 2 | 5) { Side::White } else { Side::Black };
        assert_eq!(board.occupant(*coord), Some(expected), "stone {}", i + 1);
    }
    assert_eq!(e.state().move_count(), 5);
}

#[test]
fn test_swap2_rejects_out_of_phase_actions() {
    let mut e = engine(MatchConfig::default().with_opening(Opening::Swap2));
    assert_eq!(
        e.apply_swap2(Seat::First, Swap2Action::Defer),
        Err(RuleViolation::WrongPhase(Swap2Phase::Placement))
    );
    e.apply_swap2(Seat::First, Swap2Action::Place(Coord::new(7, 7))).unwrap();
    assert_eq!(
        e.apply_swap2(Seat::First, Swap2Action::Place(Coord::new(7, 7))),
        Err(RuleViolation::CellOccupied(Coord::new(7, 7)))
    );
    assert_eq!(e.state().move_count(), 1);
}

#[test]
fn test_view_hides_nothing_in_custom() {
    let mut e = engine(MatchConfig::default());
    e.apply_move(Side::Black, Coord::new(7, 7)).unwrap();
    let view = e.state().view_for(Side::White);
    assert_eq!(view.occupant(Coord::new(7, 7)), Some(Side::Black));
}

#[test]
fn test_swap2_series_counts_wins_per_seat() {
    let mut e = engine(MatchConfig::default().with_opening(Opening::Swap2));
    let coords = [Coord::new(7, 7), Coord::new(8, 7), Coord::new(7, 8)];

    for second_takes in [Side::White, Side::Black] {
        for coord in coords {
            e.apply_swap2(Seat::First, Swap2Action::Place(coord)).unwrap();
        }
        e.apply_swap2(Seat::Second, Swap2Action::Choose(second_takes)).unwrap();
        let verdict = e.resign(second_takes).unwrap();
        assert_eq!(verdict.result.outcome, Outcome::Winner(second_takes.opponent()));
        if verdict.series_winner.is_none() {
            e.next_game().unwrap();
        }
    }

    let scores = *e.state().scores();
    assert_eq!((scores.black, scores.white), (1, 1));
    assert_eq!(scores.wins(Seat::First), 2);
    assert_eq!(e.state().series_winner(), Some(Seat::First));
    assert_eq!(e.next_game(), Err(RuleViolation::MatchOver));
}

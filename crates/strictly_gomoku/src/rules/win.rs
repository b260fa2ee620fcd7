//! Win detection: a line of `win_length` stones through the last placement.

use crate::types::{Axis, Board, Coord, Side};
use tracing::instrument;

/// Counts consecutive stones of `side` from `at` stepping `(dx, dy)`,
/// excluding `at` itself. The walk stops at the board edge.
fn count_direction(board: &Board, at: Coord, side: Side, dx: isize, dy: isize) -> Vec<Coord> {
    let mut cells = Vec::new();
    let mut cursor = at;
    while let Some(next) = board.offset(cursor, dx, dy) {
        match board.cell(next).and_then(|c| c.solid_occupant()) {
            Some(s) if s == side => {
                cells.push(next);
                cursor = next;
            }
            _ => break,
        }
    }
    cells
}

/// The full same-side run through `at` along `axis`, in ascending axis order.
///
/// Returns an empty vector when `at` does not hold a counting stone of `side`.
pub fn run_through(board: &Board, at: Coord, side: Side, axis: Axis) -> Vec<Coord> {
    if board.cell(at).and_then(|c| c.solid_occupant()) != Some(side) {
        return Vec::new();
    }
    let (dx, dy) = axis.delta();
    let mut run = count_direction(board, at, side, -dx, -dy);
    run.reverse();
    run.push(at);
    run.extend(count_direction(board, at, side, dx, dy));
    run
}

/// Returns the first winning run through `at`, if any.
#[instrument(skip(board))]
pub fn winning_line(board: &Board, at: Coord, side: Side, win_length: usize) -> Option<Vec<Coord>> {
    Axis::ALL
        .iter()
        .map(|axis| run_through(board, at, side, *axis))
        .find(|run| run.len() >= win_length)
}

/// Whether the stone just played at `at` completes a line of `win_length`
/// or more for `side`. The stone must already be on the board.
#[instrument(skip(board))]
pub fn check_win(board: &Board, at: Coord, side: Side, win_length: usize) -> bool {
    winning_line(board, at, side, win_length).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(usize, usize, Side)]) -> Board {
        let mut board = Board::new(15);
        for (x, y, side) in stones {
            board.place(Coord::new(*x, *y), *side).unwrap();
        }
        board
    }

    #[test]
    fn test_no_win_on_single_stone() {
        let board = board_with(&[(7, 7, Side::Black)]);
        assert!(!check_win(&board, Coord::new(7, 7), Side::Black, 5));
    }

    #[test]
    fn test_vertical_five_wins() {
        let stones: Vec<_> = (7..12).map(|y| (7, y, Side::Black)).collect();
        let board = board_with(&stones);
        assert!(check_win(&board, Coord::new(7, 11), Side::Black, 5));
        assert!(check_win(&board, Coord::new(7, 9), Side::Black, 5));
    }

    #[test]
    fn test_four_is_not_enough() {
        let stones: Vec<_> = (0..4).map(|x| (x, 0, Side::White)).collect();
        let board = board_with(&stones);
        for x in 0..4 {
            assert!(!check_win(&board, Coord::new(x, 0), Side::White, 5));
        }
    }

    #[test]
    fn test_anti_diagonal_at_edge() {
        let stones: Vec<_> = (0..5).map(|i| (i, 14 - i, Side::Black)).collect();
        let board = board_with(&stones);
        let line = winning_line(&board, Coord::new(0, 14), Side::Black, 5).unwrap();
        assert_eq!(line.len(), 5);
        assert_eq!(line[0], Coord::new(0, 14));
    }

    #[test]
    fn test_no_wraparound_across_rows() {
        // (13,0) (14,0) then (0,1) (1,1) (2,1): contiguous in memory only.
        let board = board_with(&[
            (13, 0, Side::Black),
            (14, 0, Side::Black),
            (0, 1, Side::Black),
            (1, 1, Side::Black),
            (2, 1, Side::Black),
        ]);
        assert!(!check_win(&board, Coord::new(14, 0), Side::Black, 5));
        assert!(!check_win(&board, Coord::new(0, 1), Side::Black, 5));
    }

    #[test]
    fn test_overline_counts() {
        let stones: Vec<_> = (2..8).map(|x| (x, 4, Side::White)).collect();
        let board = board_with(&stones);
        assert!(check_win(&board, Coord::new(4, 4), Side::White, 5));
    }

    #[test]
    fn test_opponent_stone_breaks_run() {
        let board = board_with(&[
            (0, 0, Side::Black),
            (1, 1, Side::Black),
            (2, 2, Side::White),
            (3, 3, Side::Black),
            (4, 4, Side::Black),
        ]);
        assert!(!check_win(&board, Coord::new(4, 4), Side::Black, 3));
    }
}

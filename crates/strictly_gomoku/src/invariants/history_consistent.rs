//! History numbering invariant.

use super::Invariant;
use crate::state::MatchState;

/// Invariant: history entries are numbered 1, 2, 3, ... in order and lie
/// on the board.
pub struct HistoryConsistentInvariant;

impl Invariant<MatchState> for HistoryConsistentInvariant {
    fn holds(state: &MatchState) -> bool {
        let board = state.board();
        state
            .history()
            .iter()
            .enumerate()
            .all(|(i, e)| e.move_number as usize == i + 1 && board.contains(e.coord))
    }

    fn description() -> &'static str {
        "History is numbered in order and stays on the board"
    }
}

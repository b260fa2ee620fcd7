//! Placement indices are unique and below the board's counter.

use super::Invariant;
use crate::state::MatchState;
use std::collections::BTreeSet;

/// Invariant: every stone carries a distinct placement index that was
/// issued by the board.
///
/// Skills may move stones around, but never mint or duplicate an index.
pub struct PlacementOrderInvariant;

impl Invariant<MatchState> for PlacementOrderInvariant {
    fn holds(state: &MatchState) -> bool {
        let board = state.board();
        let next = board.next_placement();
        let mut seen = BTreeSet::new();
        board
            .coords()
            .filter_map(|c| board.stone(c))
            .all(|s| {
                s.placement_index > 0 && s.placement_index < next && seen.insert(s.placement_index)
            })
    }

    fn description() -> &'static str {
        "Placement indices are unique and issued in order"
    }
}

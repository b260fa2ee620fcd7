//! Opening consistency invariant.

use super::Invariant;
use crate::state::MatchState;
use crate::swap2::Swap2Phase;

/// Invariant: the opening's stone count matches its phase, and a colour
/// assignment exists whenever normal play is possible.
pub struct Swap2ConsistentInvariant;

impl Invariant<MatchState> for Swap2ConsistentInvariant {
    fn holds(state: &MatchState) -> bool {
        let opening_ok = state.swap2().as_ref().is_none_or(|s| s.is_consistent());
        let assigned = state.phase() != Swap2Phase::Complete || state.assignment().is_some();
        opening_ok && assigned
    }

    fn description() -> &'static str {
        "Opening phase, stones and colour assignment agree"
    }
}

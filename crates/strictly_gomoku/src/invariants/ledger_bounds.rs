//! Ledger bounds invariant.

use super::Invariant;
use crate::state::MatchState;

/// Invariant: mana stays within the cap and held skills within the limit.
///
/// Per-turn uses may reach one above the base limit while the two-skills
/// buff is spent.
pub struct LedgerBoundsInvariant;

impl Invariant<MatchState> for LedgerBoundsInvariant {
    fn holds(state: &MatchState) -> bool {
        let config = state.config();
        state.ledgers().iter().all(|ledger| {
            ledger.mana() <= config.mana_cap
                && ledger.held().len() <= config.max_held
                && ledger.skills_used_this_turn() <= config.use_limit + 1
        })
    }

    fn description() -> &'static str {
        "Mana, held skills and per-turn uses stay within their limits"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchConfig, MatchEngine, Variant};

    #[test]
    fn test_holds_at_start_of_skill_match() {
        let engine = MatchEngine::new(MatchConfig::default().with_variant(Variant::Skill)).unwrap();
        assert!(LedgerBoundsInvariant::holds(engine.state()));
    }

    #[test]
    fn test_overflowing_mana_violates() {
        let config = MatchConfig::default().with_variant(Variant::Skill);
        let mut engine = MatchEngine::new(config).unwrap();
        engine.state_mut_for_tests().ledgers[0].gain_mana(100, 99);
        assert!(!LedgerBoundsInvariant::holds(engine.state()));
    }
}

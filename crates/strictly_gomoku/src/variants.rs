//! Variant strategies.
//!
//! The engine runs one shared placement path and asks the active
//! [`VariantRules`] at each hook: before the stone lands, after it lands,
//! and when deciding whether the game is over.

use crate::action::{EndReason, RuleViolation};
use crate::rules::{is_full, winning_line};
use crate::state::{GameResult, MatchState, Outcome};
use crate::terrain::{self, TerrainEvent, TileContext};
use crate::types::{Coord, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Rule set of a match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Variant {
    /// Plain five-in-a-row.
    #[default]
    Custom,
    /// Older stones are periodically concealed.
    Hidden,
    /// Mana-driven skills alongside placement.
    Skill,
    /// Hidden tiles and chain scoring.
    Terrain,
}

impl Variant {
    /// Strategy object for this variant.
    pub fn rules(self) -> &'static dyn VariantRules {
        match self {
            Variant::Custom => &CustomRules,
            Variant::Hidden => &HiddenRules,
            Variant::Skill => &SkillRules,
            Variant::Terrain => &TerrainRules,
        }
    }
}

/// Something a variant hook did besides placing the stone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantEvent {
    /// A terrain tile fired.
    Terrain(TerrainEvent),
    /// Older stones were concealed.
    Concealed {
        /// Stones newly hidden.
        count: usize,
    },
}

/// Per-variant hooks around the shared placement path.
pub trait VariantRules: std::fmt::Debug + Send + Sync {
    /// Which variant this is.
    fn variant(&self) -> Variant;

    /// Whether skills may be used at all.
    fn allows_skills(&self) -> bool {
        false
    }

    /// Whether each turn draws skill candidates.
    fn draws_candidates(&self) -> bool {
        false
    }

    /// Whether the turn only passes on an explicit end-turn.
    fn requires_end_turn(&self) -> bool {
        false
    }

    /// Per-game setup on a fresh board.
    fn prepare_game(&self, _state: &mut MatchState) {}

    /// Runs before the stone lands. `Some` consumes the placement.
    fn intercept(
        &self,
        _state: &mut MatchState,
        _side: Side,
        _coord: Coord,
    ) -> Option<Vec<VariantEvent>> {
        None
    }

    /// Runs after the stone lands and before the verdict.
    ///
    /// # Errors
    ///
    /// Only on internal board inconsistencies.
    fn after_place(
        &self,
        _state: &mut MatchState,
        _side: Side,
        _coord: Coord,
    ) -> Result<Vec<VariantEvent>, RuleViolation> {
        Ok(Vec::new())
    }

    /// Decides whether the game ended after `side` touched `cells`.
    fn verdict(&self, state: &MatchState, side: Side, cells: &[Coord]) -> Option<GameResult> {
        line_verdict(state, side, cells)
    }
}

/// Line check shared by the line variants: the acting side's lines first,
/// then any line the action completed for the opponent, then a full board.
#[instrument(skip(state, cells), fields(cells = cells.len()))]
pub fn line_verdict(state: &MatchState, side: Side, cells: &[Coord]) -> Option<GameResult> {
    let board = state.board();
    let win_length = state.config().win_length;
    for candidate in [side, side.opponent()] {
        let wins = cells.iter().any(|c| {
            board.cell(*c).and_then(|cell| cell.solid_occupant()) == Some(candidate)
                && winning_line(board, *c, candidate, win_length).is_some()
        });
        if wins {
            debug!(winner = %candidate, "Line completed");
            return Some(GameResult::new(Outcome::Winner(candidate), EndReason::Line));
        }
    }
    is_full(board).then(|| GameResult::new(Outcome::Draw, EndReason::BoardFull))
}

/// Plain rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomRules;

impl VariantRules for CustomRules {
    fn variant(&self) -> Variant {
        Variant::Custom
    }
}

/// Periodic concealment of older stones.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenRules;

impl VariantRules for HiddenRules {
    fn variant(&self) -> Variant {
        Variant::Hidden
    }

    fn after_place(
        &self,
        state: &mut MatchState,
        _side: Side,
        _coord: Coord,
    ) -> Result<Vec<VariantEvent>, RuleViolation> {
        let policy = state.config.hidden;
        if state.move_count() % policy.rehide_every != 0 {
            return Ok(Vec::new());
        }
        let newest = state.board.next_placement().saturating_sub(1);
        let cutoff = newest.saturating_sub(policy.visible_recent);
        let coords: Vec<Coord> = state.board.coords().collect();
        let mut count = 0;
        for c in coords {
            if let Some(stone) = state.board.stone_mut(c) {
                if !stone.concealed && stone.placement_index <= cutoff {
                    stone.concealed = true;
                    count += 1;
                }
            }
        }
        debug!(count, cutoff, "Stones concealed");
        Ok(vec![VariantEvent::Concealed { count }])
    }
}

/// Skills with an explicit end-turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillRules;

impl VariantRules for SkillRules {
    fn variant(&self) -> Variant {
        Variant::Skill
    }

    fn allows_skills(&self) -> bool {
        true
    }

    fn draws_candidates(&self) -> bool {
        true
    }

    fn requires_end_turn(&self) -> bool {
        true
    }
}

/// Hidden tiles; decided on score when the board fills.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainRules;

impl VariantRules for TerrainRules {
    fn variant(&self) -> Variant {
        Variant::Terrain
    }

    fn allows_skills(&self) -> bool {
        true
    }

    fn prepare_game(&self, state: &mut MatchState) {
        terrain::generate(&mut state.board, &state.config.terrain.weights, &mut state.rng);
    }

    fn intercept(
        &self,
        state: &mut MatchState,
        side: Side,
        coord: Coord,
    ) -> Option<Vec<VariantEvent>> {
        terrain::is_hidden_block(&state.board, coord).then(|| {
            terrain::reveal_block(&mut state.board, coord, side)
                .into_iter()
                .map(VariantEvent::Terrain)
                .collect()
        })
    }

    fn after_place(
        &self,
        state: &mut MatchState,
        side: Side,
        coord: Coord,
    ) -> Result<Vec<VariantEvent>, RuleViolation> {
        let pool = state.config.skill_pool();
        let mut ctx = TileContext {
            board: &mut state.board,
            ledgers: &mut state.ledgers,
            tile_bonus: &mut state.tile_bonus,
            rng: &mut state.rng,
            side,
            skill_pool: &pool,
            max_held: state.config.max_held,
            mystery: &state.config.terrain.mystery,
            steal_fallback: state.config.terrain.steal_fallback,
        };
        let events = terrain::trigger(&mut ctx, coord)?;
        Ok(events.into_iter().map(VariantEvent::Terrain).collect())
    }

    fn verdict(&self, state: &MatchState, _side: Side, _cells: &[Coord]) -> Option<GameResult> {
        if !is_full(state.board()) {
            return None;
        }
        let black = state.terrain_score(Side::Black);
        let white = state.terrain_score(Side::White);
        debug!(black = black.total, white = white.total, "Board full, comparing scores");
        let outcome = match terrain::compare(&black, &white) {
            Some(side) => Outcome::Winner(side),
            None => Outcome::Draw,
        };
        Some(GameResult::new(outcome, EndReason::Score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::types::Terrain;

    fn state(variant: Variant) -> MatchState {
        let config = MatchConfig::default().with_variant(variant).with_board_size(9);
        let mut state = MatchState::new(config);
        state.start_game(variant.rules());
        state
    }

    #[test]
    fn test_variant_flags() {
        assert!(!Variant::Custom.rules().allows_skills());
        assert!(Variant::Skill.rules().requires_end_turn());
        assert!(Variant::Terrain.rules().allows_skills());
        assert!(!Variant::Terrain.rules().draws_candidates());
        assert_eq!("hidden".parse::<Variant>(), Ok(Variant::Hidden));
    }

    #[test]
    fn test_hidden_conceals_older_stones_on_cadence() {
        let mut s = state(Variant::Hidden);
        let rules = Variant::Hidden.rules();
        for i in 0..4 {
            let c = Coord::new(i, 0);
            s.board.place(c, Side::Black).unwrap();
            s.history.push(crate::state::HistoryEntry::new(c, Side::Black, i as u32 + 1));
            rules.after_place(&mut s, Side::Black, c).unwrap();
        }
        assert!(s.board.stones_of(Side::Black).all(|c| !s.board.stone(c).unwrap().concealed));

        for i in 4..8 {
            let c = Coord::new(i, 0);
            s.board.place(c, Side::Black).unwrap();
            s.history.push(crate::state::HistoryEntry::new(c, Side::Black, i as u32 + 1));
            rules.after_place(&mut s, Side::Black, c).unwrap();
        }
        for i in 0..8 {
            let concealed = s.board.stone(Coord::new(i, 0)).unwrap().concealed;
            assert_eq!(concealed, i < 4, "stone {i}");
        }
    }

    #[test]
    fn test_concealed_stones_still_win() {
        let mut s = state(Variant::Hidden);
        for i in 0..5 {
            s.board.place(Coord::new(i, 2), Side::White).unwrap();
        }
        s.board.stone_mut(Coord::new(0, 2)).unwrap().concealed = true;
        let result = line_verdict(&s, Side::White, &[Coord::new(4, 2)]);
        assert_eq!(result.map(|r| r.outcome), Some(Outcome::Winner(Side::White)));
    }

    #[test]
    fn test_terrain_intercepts_hidden_block() {
        let mut s = state(Variant::Terrain);
        let c = Coord::new(3, 3);
        let cell = s.board.cell_mut(c).unwrap();
        cell.terrain = Terrain::Block;
        cell.terrain_revealed = false;
        let events = Variant::Terrain.rules().intercept(&mut s, Side::Black, c);
        assert!(events.is_some());
        assert!(s.board.cell(c).unwrap().is_blocked());
        assert_eq!(s.board.occupant(c), None);
    }

    #[test]
    fn test_terrain_ignores_lines() {
        let mut s = state(Variant::Terrain);
        for y in 0..9 {
            for x in 0..9 {
                let cell = s.board.cell_mut(Coord::new(x, y)).unwrap();
                cell.terrain = Terrain::Normal;
            }
        }
        for i in 0..5 {
            s.board.place(Coord::new(i, 0), Side::Black).unwrap();
        }
        let result = Variant::Terrain
            .rules()
            .verdict(&s, Side::Black, &[Coord::new(4, 0)]);
        assert_eq!(result, None);
    }
}

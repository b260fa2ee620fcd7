//! The match engine: the single public surface for changing a match.
//!
//! Every operation runs against a scratch copy of the state and commits only
//! if it succeeds, so a rejected action never leaves a partial mutation.

use crate::action::{EndReason, PlaceStone, RuleViolation};
use crate::config::{ConfigError, MatchConfig};
use crate::contracts::{Contract, MatchLive, MoveContract, OpeningComplete, check_invariants};
use crate::skills::{LedgerDelta, SkillContext, SkillId, SkillReport, SkillTarget, resolve};
use crate::state::{GameResult, HistoryEntry, MatchState, Outcome, SeriesScore, TurnOutcome};
use crate::swap2::{ColorAssignment, Seat, Swap2Action, Swap2Phase};
use crate::types::{Board, CellChange, Coord, Side};
use crate::variants::{VariantEvent, VariantRules};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// End-of-game report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Result of the game that just ended.
    pub result: GameResult,
    /// Series score including this game.
    pub scores: SeriesScore,
    /// Set once a seat has won the series.
    pub series_winner: Option<Seat>,
}

/// Result of an accepted placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Placing side.
    pub side: Side,
    /// Target cell.
    pub coord: Coord,
    /// 1-based number within the game.
    pub move_number: u32,
    /// Index of the new stone; `None` when a hidden block swallowed it.
    pub placement_index: Option<u32>,
    /// Cells whose occupant changed.
    pub board_delta: Vec<CellChange>,
    /// Variant side effects.
    pub events: Vec<VariantEvent>,
    /// Set when the game ended.
    pub verdict: Option<Verdict>,
    /// Side to move afterwards.
    pub next_side: Side,
    /// Terrain totals (Black, White) in the terrain variant.
    pub terrain_totals: Option<[u32; 2]>,
}

impl MoveOutcome {
    /// Whether this placement completed a winning line.
    pub fn is_winning_move(&self) -> bool {
        self.verdict.is_some_and(|v| {
            v.result.reason == EndReason::Line && v.result.outcome == Outcome::Winner(self.side)
        })
    }
}

/// Result of an accepted opening action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap2Outcome {
    /// Phase after the action.
    pub phase: Swap2Phase,
    /// Cells whose occupant changed.
    pub board_delta: Vec<CellChange>,
    /// Colour assignment once the opening completes.
    pub assignment: Option<ColorAssignment>,
    /// History entry for a placed stone.
    pub placed: Option<HistoryEntry>,
    /// Side to move once the opening completes.
    pub next_side: Option<Side>,
}

/// Result of an accepted skill use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillOutcome {
    /// What the skill touched.
    pub report: SkillReport,
    /// Cells whose occupant changed.
    pub board_delta: Vec<CellChange>,
    /// Caster's ledger before and after.
    pub ledger_delta: LedgerDelta,
    /// Set when the skill ended the game.
    pub verdict: Option<Verdict>,
}

/// Owns one match and applies actions to it.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    state: MatchState,
}

impl MatchEngine {
    /// Starts a match and its first game.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration does not validate.
    #[instrument(
        skip(config),
        fields(variant = %config.variant, size = config.board_size, opening = %config.opening)
    )]
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = config.variant.rules();
        let mut state = MatchState::new(config);
        state.start_game(rules);
        info!("Match created");
        Ok(Self { state })
    }

    /// Current state.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut_for_tests(&mut self) -> &mut MatchState {
        &mut self.state
    }

    fn rules(&self) -> &'static dyn VariantRules {
        self.state.config.variant.rules()
    }

    /// Runs `op` on a scratch copy and commits it on success.
    fn transact<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut MatchState) -> Result<T, RuleViolation>,
    ) -> Result<T, RuleViolation> {
        let mut scratch = self.state.clone();
        let out = f(&mut scratch).inspect_err(|e| warn!(op, error = %e, "Action rejected"))?;
        if cfg!(debug_assertions) {
            check_invariants(&scratch)?;
        }
        self.state = scratch;
        Ok(out)
    }

    fn verdict_for(state: &MatchState, result: GameResult) -> Verdict {
        Verdict {
            result,
            scores: state.scores,
            series_winner: state.series_winner(),
        }
    }

    fn terrain_totals(rules: &dyn VariantRules, state: &MatchState) -> Option<[u32; 2]> {
        (rules.variant() == crate::variants::Variant::Terrain).then(|| {
            [
                state.terrain_score(Side::Black).total,
                state.terrain_score(Side::White).total,
            ]
        })
    }

    /// Places a stone for `side`.
    ///
    /// # Errors
    ///
    /// `MatchOver`, `WrongPhase`, `OutOfTurn`, `OutOfBounds`, `CellOccupied`,
    /// `CellBlocked`, and `AlreadyPlaced` in the skill variant.
    #[instrument(skip(self), fields(x = coord.x, y = coord.y, game = self.state.game_number))]
    pub fn apply_move(&mut self, side: Side, coord: Coord) -> Result<MoveOutcome, RuleViolation> {
        let rules = self.rules();
        let outcome = self.transact("apply_move", |s| {
            let mv = PlaceStone::new(side, coord);
            MoveContract::pre(s, &mv)?;
            if rules.requires_end_turn() && s.placed_this_turn {
                return Err(RuleViolation::AlreadyPlaced);
            }

            let before = s.board.clone();
            let move_number = s.move_count() + 1;
            s.history.push(HistoryEntry::new(coord, side, move_number));

            if let Some(events) = rules.intercept(s, side, coord) {
                let turn = s.pass_turn(rules);
                return Ok(MoveOutcome {
                    side,
                    coord,
                    move_number,
                    placement_index: None,
                    board_delta: Board::diff(&before, &s.board),
                    events,
                    verdict: None,
                    next_side: turn.next_side,
                    terrain_totals: Self::terrain_totals(rules, s),
                });
            }

            let placement_index = s.board.place(coord, side)?;
            s.placed_this_turn = true;
            let events = rules.after_place(s, side, coord)?;

            let verdict = match rules.verdict(s, side, &[coord]) {
                Some(result) => {
                    s.finish(result);
                    Some(Self::verdict_for(s, result))
                }
                None => {
                    if !rules.requires_end_turn() {
                        s.pass_turn(rules);
                    }
                    None
                }
            };

            Ok(MoveOutcome {
                side,
                coord,
                move_number,
                placement_index: Some(placement_index),
                board_delta: Board::diff(&before, &s.board),
                events,
                verdict,
                next_side: s.side_to_move,
                terrain_totals: Self::terrain_totals(rules, s),
            })
        })?;

        debug!(
            move_number = outcome.move_number,
            next = %outcome.next_side,
            ended = outcome.verdict.is_some(),
            "Move applied"
        );
        Ok(outcome)
    }

    /// Applies an opening action from `seat`.
    ///
    /// # Errors
    ///
    /// `MatchOver`, `WrongPhase` outside the opening or for an action the
    /// phase does not accept, `WrongSeat`, and placement errors.
    #[instrument(skip(self))]
    pub fn apply_swap2(
        &mut self,
        seat: Seat,
        action: Swap2Action,
    ) -> Result<Swap2Outcome, RuleViolation> {
        let rules = self.rules();
        self.transact("apply_swap2", |s| {
            MatchLive::check(s)?;
            let before = s.board.clone();
            let swap2 = s
                .swap2
                .as_mut()
                .ok_or(RuleViolation::WrongPhase(Swap2Phase::Complete))?;
            let step = swap2.apply(&mut s.board, seat, action)?;

            let placed = step.placed.map(|stone| {
                let move_number = s.history.len() as u32 + 1;
                let entry = HistoryEntry::new(stone.coord, stone.color(), move_number);
                s.history.push(entry);
                entry
            });

            let next_side = if step.phase == Swap2Phase::Complete {
                s.assignment = step.assignment;
                s.side_to_move = Side::White;
                s.begin_turn(rules);
                info!(assignment = ?step.assignment, "Opening complete, White to move");
                Some(Side::White)
            } else {
                None
            };

            Ok(Swap2Outcome {
                phase: step.phase,
                board_delta: Board::diff(&before, &s.board),
                assignment: step.assignment,
                placed,
                next_side,
            })
        })
    }

    /// Uses a skill for `side`.
    ///
    /// After the match, opening, variant and turn checks, eligibility runs
    /// in this order: availability, frozen skills, cooldown, mana, then the
    /// per-turn use limit. The target is checked last. Held skills were paid for when
    /// they were held and cost nothing here.
    ///
    /// # Errors
    ///
    /// Any eligibility violation, or a target violation from the resolver.
    #[instrument(skip(self), fields(skill = %id))]
    pub fn apply_skill(
        &mut self,
        side: Side,
        id: SkillId,
        target: SkillTarget,
    ) -> Result<SkillOutcome, RuleViolation> {
        let rules = self.rules();
        self.transact("apply_skill", |s| {
            MatchLive::check(s)?;
            OpeningComplete::check(s)?;
            if !rules.allows_skills() {
                return Err(RuleViolation::UnsupportedInVariant("skills"));
            }
            if side != s.side_to_move {
                return Err(RuleViolation::OutOfTurn(side));
            }

            let spec = id.spec();
            let base_limit = s.config.use_limit;
            let ledger = &s.ledgers[side.index()];
            if !ledger.is_available(id) {
                return Err(RuleViolation::SkillUnavailable(id));
            }
            if ledger.skills_disabled() {
                return Err(RuleViolation::SkillsDisabled);
            }
            let turns = ledger.cooldown(id);
            if turns > 0 {
                return Err(RuleViolation::OnCooldown { skill: id, turns });
            }
            let cost = if ledger.held().contains(&id) { 0 } else { spec.mana_cost };
            if ledger.mana() < cost {
                return Err(RuleViolation::InsufficientMana {
                    need: cost,
                    have: ledger.mana(),
                });
            }
            let limit = ledger.use_limit(base_limit);
            if ledger.skills_used_this_turn() >= limit {
                return Err(RuleViolation::UseLimitReached(limit));
            }

            let board_before = s.board.clone();
            let ledger_before = ledger.clone();
            let mut ctx = SkillContext {
                board: &mut s.board,
                ledgers: &mut s.ledgers,
                side,
                rng: &mut s.rng,
                mana_cap: s.config.mana_cap,
            };
            let report = resolve(&mut ctx, spec, target)?;

            let ledger = &mut s.ledgers[side.index()];
            ledger.spend(cost)?;
            ledger.set_cooldown(id, spec.cooldown);
            ledger.record_use(id, base_limit);

            let verdict = rules.verdict(s, side, &report.affected).map(|result| {
                s.finish(result);
                Self::verdict_for(s, result)
            });

            info!(
                affected = report.affected.len(),
                mana = s.ledgers[side.index()].mana(),
                "Skill used"
            );
            Ok(SkillOutcome {
                board_delta: Board::diff(&board_before, &s.board),
                ledger_delta: LedgerDelta::between(side, &ledger_before, &s.ledgers[side.index()]),
                report,
                verdict,
            })
        })
    }

    /// Pays for a candidate now so it survives into the next draw.
    ///
    /// # Errors
    ///
    /// `UnsupportedInVariant` outside the skill variant, turn errors, and
    /// ledger errors (not a candidate, held limit, mana).
    #[instrument(skip(self), fields(skill = %id))]
    pub fn hold_skill(&mut self, side: Side, id: SkillId) -> Result<LedgerDelta, RuleViolation> {
        let rules = self.rules();
        self.transact("hold_skill", |s| {
            MatchLive::check(s)?;
            OpeningComplete::check(s)?;
            if !rules.draws_candidates() {
                return Err(RuleViolation::UnsupportedInVariant("hold_skill"));
            }
            if side != s.side_to_move {
                return Err(RuleViolation::OutOfTurn(side));
            }
            let max_held = s.config.max_held;
            let ledger = &mut s.ledgers[side.index()];
            let before = ledger.clone();
            ledger.hold(id, id.spec().mana_cost, max_held)?;
            Ok(LedgerDelta::between(side, &before, ledger))
        })
    }

    /// Ends `side`'s turn in the skill variant.
    ///
    /// # Errors
    ///
    /// `UnsupportedInVariant` elsewhere, `MatchOver`, `WrongPhase`, `OutOfTurn`.
    #[instrument(skip(self))]
    pub fn end_turn(&mut self, side: Side) -> Result<TurnOutcome, RuleViolation> {
        let rules = self.rules();
        self.transact("end_turn", |s| {
            if !rules.requires_end_turn() {
                return Err(RuleViolation::UnsupportedInVariant("end_turn"));
            }
            MatchLive::check(s)?;
            OpeningComplete::check(s)?;
            if side != s.side_to_move {
                return Err(RuleViolation::OutOfTurn(side));
            }
            let turn = s.pass_turn(rules);
            info!(next = %turn.next_side, skills = ?turn.refreshed_skills, "Turn ended");
            Ok(turn)
        })
    }

    fn concede(
        &mut self,
        op: &'static str,
        winner: Side,
        reason: EndReason,
    ) -> Result<Verdict, RuleViolation> {
        self.transact(op, |s| {
            MatchLive::check(s)?;
            let result = GameResult::new(Outcome::Winner(winner), reason);
            s.finish(result);
            Ok(Self::verdict_for(s, result))
        })
    }

    /// `side` resigns; the opponent wins the game.
    ///
    /// # Errors
    ///
    /// `MatchOver` if the game already ended.
    #[instrument(skip(self))]
    pub fn resign(&mut self, side: Side) -> Result<Verdict, RuleViolation> {
        self.concede("resign", side.opponent(), EndReason::Resignation)
    }

    /// `side` ran out of time; treated exactly like a resignation.
    ///
    /// # Errors
    ///
    /// `MatchOver` if the game already ended.
    #[instrument(skip(self))]
    pub fn timeout(&mut self, side: Side) -> Result<Verdict, RuleViolation> {
        self.concede("timeout", side.opponent(), EndReason::Timeout)
    }

    /// Records an externally decided win for `winner`.
    ///
    /// # Errors
    ///
    /// `MatchOver` if the game already ended.
    #[instrument(skip(self))]
    pub fn auto_win(&mut self, winner: Side) -> Result<Verdict, RuleViolation> {
        self.concede("auto_win", winner, EndReason::AutoWin)
    }

    /// Starts the next game of the series.
    ///
    /// # Errors
    ///
    /// `GameInProgress` while the current game is live, `MatchOver` once the
    /// series has a winner.
    #[instrument(skip(self), fields(game = self.state.game_number))]
    pub fn next_game(&mut self) -> Result<u32, RuleViolation> {
        let rules = self.rules();
        self.transact("next_game", |s| {
            if !s.is_over() {
                return Err(RuleViolation::GameInProgress);
            }
            if s.series_winner().is_some() {
                return Err(RuleViolation::MatchOver);
            }
            s.start_game(rules);
            Ok(s.game_number)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Opening;
    use crate::variants::Variant;

    fn engine(variant: Variant) -> MatchEngine {
        MatchEngine::new(MatchConfig::default().with_variant(variant).with_seed(7)).unwrap()
    }

    #[test]
    fn test_rejected_move_leaves_state_untouched() {
        let mut e = engine(Variant::Custom);
        e.apply_move(Side::Black, Coord::new(7, 7)).unwrap();
        let before = e.state().snapshot();
        assert_eq!(
            e.apply_move(Side::White, Coord::new(7, 7)),
            Err(RuleViolation::CellOccupied(Coord::new(7, 7)))
        );
        assert_eq!(
            e.apply_move(Side::Black, Coord::new(1, 1)),
            Err(RuleViolation::OutOfTurn(Side::Black))
        );
        assert_eq!(
            e.apply_move(Side::White, Coord::new(15, 0)),
            Err(RuleViolation::OutOfBounds(Coord::new(15, 0)))
        );
        assert_eq!(e.state().snapshot(), before);
    }

    #[test]
    fn test_moves_after_win_are_rejected() {
        let mut e = engine(Variant::Custom);
        for i in 0..4 {
            e.apply_move(Side::Black, Coord::new(i, 0)).unwrap();
            e.apply_move(Side::White, Coord::new(i, 5)).unwrap();
        }
        let outcome = e.apply_move(Side::Black, Coord::new(4, 0)).unwrap();
        assert!(outcome.is_winning_move());
        assert_eq!(
            e.apply_move(Side::White, Coord::new(9, 9)),
            Err(RuleViolation::MatchOver)
        );
        assert_eq!(e.resign(Side::White), Err(RuleViolation::MatchOver));
    }

    #[test]
    fn test_timeout_matches_resignation() {
        let mut a = engine(Variant::Custom);
        let mut b = engine(Variant::Custom);
        let resigned = a.resign(Side::Black).unwrap();
        let timed_out = b.timeout(Side::Black).unwrap();
        assert_eq!(resigned.result.outcome, timed_out.result.outcome);
        assert_eq!(resigned.scores, timed_out.scores);
        assert_eq!(timed_out.result.reason, EndReason::Timeout);
    }

    #[test]
    fn test_auto_win_recorded() {
        let mut e = engine(Variant::Custom);
        let verdict = e.auto_win(Side::White).unwrap();
        assert_eq!(verdict.result.outcome, Outcome::Winner(Side::White));
        assert_eq!(verdict.result.reason, EndReason::AutoWin);
    }

    #[test]
    fn test_series_runs_to_target() {
        let mut e = engine(Variant::Custom);
        assert_eq!(e.next_game(), Err(RuleViolation::GameInProgress));
        e.resign(Side::White).unwrap();
        assert_eq!(e.next_game(), Ok(2));
        assert_eq!(e.state().board().stone_count(), 0);
        let verdict = e.resign(Side::White).unwrap();
        assert_eq!(verdict.series_winner, Some(Seat::First));
        assert_eq!(e.next_game(), Err(RuleViolation::MatchOver));
    }

    #[test]
    fn test_skill_variant_requires_end_turn() {
        let mut e = engine(Variant::Skill);
        e.apply_move(Side::Black, Coord::new(7, 7)).unwrap();
        assert_eq!(*e.state().side_to_move(), Side::Black);
        assert_eq!(
            e.apply_move(Side::Black, Coord::new(7, 8)),
            Err(RuleViolation::AlreadyPlaced)
        );
        let turn = e.end_turn(Side::Black).unwrap();
        assert_eq!(turn.next_side, Side::White);
        assert_eq!(turn.refreshed_skills.len(), 3);
        assert_eq!(e.state().ledger(Side::Black).mana(), 8);
    }

    #[test]
    fn test_end_turn_unsupported_outside_skill_variant() {
        let mut e = engine(Variant::Custom);
        assert_eq!(
            e.end_turn(Side::Black),
            Err(RuleViolation::UnsupportedInVariant("end_turn"))
        );
    }

    #[test]
    fn test_skills_unsupported_in_custom() {
        let mut e = engine(Variant::Custom);
        assert_eq!(
            e.apply_skill(Side::Black, SkillId::ManaRestore, SkillTarget::None),
            Err(RuleViolation::UnsupportedInVariant("skills"))
        );
    }

    #[test]
    fn test_cooldown_rejection_never_mutates() {
        let config = MatchConfig::default()
            .with_variant(Variant::Skill)
            .with_deck(vec![SkillId::ManaDrain, SkillId::Shield, SkillId::Push])
            .with_use_limit(2);
        let mut e = MatchEngine::new(config).unwrap();
        e.apply_skill(Side::Black, SkillId::ManaDrain, SkillTarget::None).unwrap();
        e.end_turn(Side::Black).unwrap();
        e.end_turn(Side::White).unwrap();
        let before = e.state().snapshot();
        assert!(e.state().ledger(Side::Black).is_available(SkillId::ManaDrain));
        assert_eq!(
            e.apply_skill(Side::Black, SkillId::ManaDrain, SkillTarget::None),
            Err(RuleViolation::OnCooldown {
                skill: SkillId::ManaDrain,
                turns: 3
            })
        );
        assert_eq!(e.state().snapshot(), before);
    }

    #[test]
    fn test_swap2_move_before_opening_rejected() {
        let mut e = MatchEngine::new(MatchConfig::default().with_opening(Opening::Swap2)).unwrap();
        assert_eq!(
            e.apply_move(Side::Black, Coord::new(7, 7)),
            Err(RuleViolation::WrongPhase(Swap2Phase::Placement))
        );
        assert_eq!(
            e.apply_swap2(Seat::Second, Swap2Action::Place(Coord::new(7, 7))),
            Err(RuleViolation::WrongSeat(Seat::Second))
        );
    }

    #[test]
    fn test_swap2_after_opening_rejected() {
        let mut e = engine(Variant::Custom);
        assert_eq!(
            e.apply_swap2(Seat::First, Swap2Action::Defer),
            Err(RuleViolation::WrongPhase(Swap2Phase::Complete))
        );
    }
}

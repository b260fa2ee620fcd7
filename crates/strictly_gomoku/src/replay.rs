//! Rebuilding a match from its persisted move list.
//!
//! Every random draw is seeded from the config, so feeding the same ordered
//! records through the engine reproduces the board, side to move, results
//! and series score exactly. Skill uses are not part of the move list, so
//! the skill variant only replays its placements. Swap2 decisions are not
//! placements either and come from [`OpeningRecord`]s; a game without one
//! stops at the decision that is still pending.

use crate::action::{EndReason, RuleViolation};
use crate::config::{ConfigError, MatchConfig, Opening};
use crate::engine::MatchEngine;
use crate::swap2::{ColorAssignment, Seat, Swap2Action, color_for_order};
use crate::types::{Coord, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// One persisted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct MoveRecord {
    /// Game within the series, starting at 1.
    pub game_number: u32,
    /// 1-based number within the game.
    pub move_number: u32,
    /// Target cell.
    pub coord: Coord,
    /// Colour that moved.
    pub side: Side,
}

/// A game that ended outside the move list (resignation, timeout, auto-win).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct GameEnding {
    /// Game number.
    pub game_number: u32,
    /// Winning side.
    pub winner: Side,
    /// Cause.
    pub reason: EndReason,
}

/// Decisions taken in one game's swap2 opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct OpeningRecord {
    /// Game number.
    pub game_number: u32,
    /// Whether the second seat deferred the choice.
    pub deferred: bool,
    /// Colours, once chosen.
    pub assignment: Option<ColorAssignment>,
}

/// Information the move list alone does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOptions {
    /// Swap2 decisions per game.
    pub openings: Vec<OpeningRecord>,
    /// Games decided without a final move.
    pub endings: Vec<GameEnding>,
}

/// Why a move list could not be replayed.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::From)]
pub enum ReplayError {
    /// The stored config is invalid.
    #[display("{}", _0)]
    #[from]
    Config(ConfigError),
    /// A record was rejected by the engine.
    #[display("Move {} of game {} rejected: {}", move_number, game_number, violation)]
    Rejected {
        /// Game.
        game_number: u32,
        /// Move.
        move_number: u32,
        /// Reason.
        violation: RuleViolation,
    },
    /// Records are out of sequence or carry the wrong colour.
    #[display("Record {} of game {} is inconsistent: {}", move_number, game_number, reason)]
    Inconsistent {
        /// Game.
        game_number: u32,
        /// Move.
        move_number: u32,
        /// Detail.
        reason: String,
    },
    /// A later game exists but this one never finished.
    #[display("Game {} has no result before game {} starts", _0, _1)]
    Unfinished(u32, u32),
}

impl std::error::Error for ReplayError {}

struct Replayer<'a> {
    engine: MatchEngine,
    openings: &'a [OpeningRecord],
    endings: &'a [GameEnding],
}

impl Replayer<'_> {
    fn rejected(record: &MoveRecord, violation: RuleViolation) -> ReplayError {
        ReplayError::Rejected {
            game_number: record.game_number,
            move_number: record.move_number,
            violation,
        }
    }

    fn check_sequence(&self, record: &MoveRecord) -> Result<(), ReplayError> {
        let expected = self.engine.state().move_count() + 1;
        if record.move_number != expected {
            return Err(ReplayError::Inconsistent {
                game_number: record.game_number,
                move_number: record.move_number,
                reason: format!("expected move {expected}"),
            });
        }
        Ok(())
    }

    fn opening_place(
        &mut self,
        seat: Seat,
        record: &MoveRecord,
        order: u8,
    ) -> Result<(), ReplayError> {
        self.check_sequence(record)?;
        if record.side != color_for_order(order) {
            return Err(ReplayError::Inconsistent {
                game_number: record.game_number,
                move_number: record.move_number,
                reason: format!("opening stone {order} must be {}", color_for_order(order)),
            });
        }
        self.engine
            .apply_swap2(seat, Swap2Action::Place(record.coord))
            .map_err(|v| Self::rejected(record, v))?;
        Ok(())
    }

    fn choose(
        &mut self,
        seat: Seat,
        assignment: ColorAssignment,
        record: &MoveRecord,
    ) -> Result<(), ReplayError> {
        self.engine
            .apply_swap2(seat, Swap2Action::Choose(assignment.side_of(seat)))
            .map_err(|v| Self::rejected(record, v))?;
        Ok(())
    }

    /// Replays the swap2 opening from the front of `records`, returning how
    /// many records it consumed. Decisions missing from the game's
    /// [`OpeningRecord`] are left pending.
    fn opening(&mut self, game_number: u32, records: &[MoveRecord]) -> Result<usize, ReplayError> {
        let decided = self.openings.iter().find(|o| o.game_number == game_number).copied();
        let assignment = decided.and_then(|o| o.assignment);

        let mut used = 0;
        for (i, record) in records.iter().take(3).enumerate() {
            self.opening_place(Seat::First, record, i as u8 + 1)?;
            used += 1;
        }
        if used < 3 {
            return Ok(used);
        }

        let deferred = decided.is_some_and(|o| o.deferred)
            || records.get(3).is_some_and(|r| r.side == Side::Black);
        if !deferred {
            if let Some(assignment) = assignment {
                self.choose(Seat::Second, assignment, &records[2])?;
            } else {
                debug!(game_number, "Colour choice pending");
            }
            return Ok(used);
        }

        self.engine
            .apply_swap2(Seat::Second, Swap2Action::Defer)
            .map_err(|v| Self::rejected(&records[2], v))?;
        for (i, record) in records.iter().skip(3).take(2).enumerate() {
            self.opening_place(Seat::Second, record, i as u8 + 4)?;
            used += 1;
        }
        match assignment {
            Some(assignment) if used == 5 => self.choose(Seat::First, assignment, &records[4])?,
            _ => debug!(game_number, stones = used, "Deferred opening still open"),
        }
        Ok(used)
    }

    fn play(&mut self, record: &MoveRecord) -> Result<(), ReplayError> {
        self.check_sequence(record)?;
        let rules = self.engine.state().config().variant.rules();
        let to_move = *self.engine.state().side_to_move();
        if rules.requires_end_turn() && record.side != to_move {
            self.engine
                .end_turn(to_move)
                .map_err(|v| Self::rejected(record, v))?;
        }
        self.engine
            .apply_move(record.side, record.coord)
            .map_err(|v| Self::rejected(record, v))?;
        Ok(())
    }

    fn close(&mut self, game_number: u32) -> Result<(), ReplayError> {
        if self.engine.state().is_over() {
            return Ok(());
        }
        let Some(ending) = self.endings.iter().find(|e| e.game_number == game_number) else {
            return Ok(());
        };
        let result = match ending.reason {
            EndReason::Timeout => self.engine.timeout(ending.winner.opponent()),
            EndReason::AutoWin => self.engine.auto_win(ending.winner),
            _ => self.engine.resign(ending.winner.opponent()),
        };
        result.map_err(|violation| ReplayError::Rejected {
            game_number,
            move_number: self.engine.state().move_count(),
            violation,
        })?;
        Ok(())
    }
}

/// Rebuilds a match from `records` (any order; sorted by game and move).
///
/// # Errors
///
/// Returns [`ReplayError`] when the config is invalid, a record is out of
/// sequence, or the engine rejects a record.
#[instrument(skip(config, records, options), fields(records = records.len()))]
pub fn replay(
    config: MatchConfig,
    records: &[MoveRecord],
    options: &ReplayOptions,
) -> Result<MatchEngine, ReplayError> {
    let opening = config.opening;
    let mut games: BTreeMap<u32, Vec<MoveRecord>> = BTreeMap::new();
    for record in records {
        games.entry(record.game_number).or_default().push(*record);
    }
    let decided = options.openings.iter().map(|o| o.game_number);
    for game_number in options.endings.iter().map(|e| e.game_number).chain(decided) {
        games.entry(game_number).or_default();
    }

    let mut replayer = Replayer {
        engine: MatchEngine::new(config)?,
        openings: &options.openings,
        endings: &options.endings,
    };

    for (game_number, mut moves) in games {
        let current = *replayer.engine.state().game_number();
        if game_number > current {
            if !replayer.engine.state().is_over() {
                return Err(ReplayError::Unfinished(current, game_number));
            }
            replayer
                .engine
                .next_game()
                .map_err(|violation| ReplayError::Rejected {
                    game_number,
                    move_number: 0,
                    violation,
                })?;
        }

        moves.sort_by_key(|r| r.move_number);
        let skip = match opening {
            Opening::Swap2 => replayer.opening(game_number, &moves)?,
            Opening::Standard => 0,
        };
        for record in &moves[skip..] {
            replayer.play(record)?;
        }
        replayer.close(game_number)?;
        debug!(game_number, moves = moves.len(), "Game replayed");
    }

    info!(
        game = *replayer.engine.state().game_number(),
        over = replayer.engine.state().is_over(),
        "Replay complete"
    );
    Ok(replayer.engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Outcome;

    #[test]
    fn test_out_of_sequence_rejected() {
        let records = [
            MoveRecord::new(1, 1, Coord::new(7, 7), Side::Black),
            MoveRecord::new(1, 3, Coord::new(8, 8), Side::White),
        ];
        let err = replay(MatchConfig::default(), &records, &ReplayOptions::default()).unwrap_err();
        assert!(matches!(err, ReplayError::Inconsistent { move_number: 3, .. }));
    }

    #[test]
    fn test_resigned_game_needs_ending() {
        let records = [
            MoveRecord::new(1, 1, Coord::new(7, 7), Side::Black),
            MoveRecord::new(2, 1, Coord::new(7, 7), Side::Black),
        ];
        let err = replay(MatchConfig::default(), &records, &ReplayOptions::default()).unwrap_err();
        assert_eq!(err, ReplayError::Unfinished(1, 2));

        let options = ReplayOptions {
            openings: Vec::new(),
            endings: vec![GameEnding::new(1, Side::Black, EndReason::Resignation)],
        };
        let engine = replay(MatchConfig::default(), &records, &options).unwrap();
        assert_eq!(*engine.state().game_number(), 2);
        assert_eq!(engine.state().scores().black, 1);
        assert_eq!(*engine.state().side_to_move(), Side::White);
    }

    #[test]
    fn test_trailing_timeout_recorded() {
        let records = [MoveRecord::new(1, 1, Coord::new(0, 0), Side::Black)];
        let options = ReplayOptions {
            openings: Vec::new(),
            endings: vec![GameEnding::new(1, Side::Black, EndReason::Timeout)],
        };
        let engine = replay(MatchConfig::default(), &records, &options).unwrap();
        let result = engine.state().result().unwrap();
        assert_eq!(result.outcome, Outcome::Winner(Side::Black));
        assert_eq!(result.reason, EndReason::Timeout);
    }

    #[test]
    fn test_wrong_opening_colour_rejected() {
        let config = MatchConfig::default().with_opening(Opening::Swap2);
        let records = [
            MoveRecord::new(1, 1, Coord::new(7, 7), Side::Black),
            MoveRecord::new(1, 2, Coord::new(7, 8), Side::Black),
        ];
        let err = replay(config, &records, &ReplayOptions::default()).unwrap_err();
        assert!(matches!(err, ReplayError::Inconsistent { move_number: 2, .. }));
    }

    fn swap2_config() -> MatchConfig {
        MatchConfig::default().with_opening(Opening::Swap2)
    }

    fn opening_stones() -> [MoveRecord; 3] {
        [
            MoveRecord::new(1, 1, Coord::new(7, 7), Side::Black),
            MoveRecord::new(1, 2, Coord::new(8, 7), Side::White),
            MoveRecord::new(1, 3, Coord::new(7, 8), Side::Black),
        ]
    }

    #[test]
    fn test_pending_choice_stays_pending() {
        let engine = replay(swap2_config(), &opening_stones(), &ReplayOptions::default()).unwrap();
        assert_eq!(engine.state().phase(), crate::swap2::Swap2Phase::Choice);
        assert!(engine.state().assignment().is_none());
    }

    #[test]
    fn test_choice_missing_before_later_moves_rejected() {
        let mut records = opening_stones().to_vec();
        records.push(MoveRecord::new(1, 4, Coord::new(0, 0), Side::White));
        let err = replay(swap2_config(), &records, &ReplayOptions::default()).unwrap_err();
        assert!(matches!(err, ReplayError::Rejected { move_number: 4, .. }));
    }
}

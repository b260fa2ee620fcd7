//! Match state and the values it reports.

use crate::action::EndReason;
use crate::config::MatchConfig;
use crate::skills::{EffectKind, SkillId, SkillLedger, draw_candidates};
use crate::swap2::{ColorAssignment, Seat, Swap2Phase, Swap2State};
use crate::terrain::{TerrainScore, score};
use crate::types::{Board, Coord, Side, Terrain};
use crate::variants::VariantRules;
use derive_getters::Getters;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Side won the game.
    Winner(Side),
    /// Game ended in a draw.
    Draw,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::Winner(side) => Some(*side),
            Outcome::Draw => None,
        }
    }

    /// Returns true if the game was a draw.
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(side) => write!(f, "{side} wins"),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// How and why the current game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct GameResult {
    /// Winner or draw.
    pub outcome: Outcome,
    /// Cause.
    pub reason: EndReason,
}

/// Series tally across a best-of-N match.
///
/// Wins count per seat: a swap2 opening reruns every game, so one player
/// may hold different colours from game to game. The colour columns are
/// kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeriesScore {
    /// Games won by the first seat.
    pub first: u32,
    /// Games won by the second seat.
    pub second: u32,
    /// Games won playing Black.
    pub black: u32,
    /// Games won playing White.
    pub white: u32,
    /// Drawn games.
    pub draws: u32,
}

impl SeriesScore {
    /// Games won by `seat`.
    pub fn wins(&self, seat: Seat) -> u32 {
        match seat {
            Seat::First => self.first,
            Seat::Second => self.second,
        }
    }

    /// Games won playing `side`.
    pub fn wins_as(&self, side: Side) -> u32 {
        match side {
            Side::Black => self.black,
            Side::White => self.white,
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome, assignment: ColorAssignment) {
        let Some(side) = outcome.winner() else {
            self.draws += 1;
            return;
        };
        match side {
            Side::Black => self.black += 1,
            Side::White => self.white += 1,
        }
        match assignment.seat_of(side) {
            Seat::First => self.first += 1,
            Seat::Second => self.second += 1,
        }
    }

    /// Seat that has reached `target` wins, if any.
    pub fn leader(&self, target: u32) -> Option<Seat> {
        if self.first >= target {
            Some(Seat::First)
        } else if self.second >= target {
            Some(Seat::Second)
        } else {
            None
        }
    }
}

/// One accepted placement (or forfeited placement attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct HistoryEntry {
    /// Target cell.
    pub coord: Coord,
    /// Colour placed.
    pub side: Side,
    /// 1-based number within the game.
    pub move_number: u32,
}

/// Result of handing the turn on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Side whose turn ended.
    pub ended: Side,
    /// Side now to move.
    pub next_side: Side,
    /// Candidates drawn for `next_side`.
    pub refreshed_skills: Vec<SkillId>,
    /// Decoys that vanished as their counters ran out.
    pub expired_decoys: Vec<Coord>,
}

/// Full state of a match. Mutated only by [`crate::MatchEngine`].
#[derive(Debug, Clone, Getters)]
pub struct MatchState {
    /// Rules the match was created with.
    pub(crate) config: MatchConfig,
    /// Current board.
    pub(crate) board: Board,
    /// Side to move.
    pub(crate) side_to_move: Side,
    /// Placements of the current game, including forfeited ones.
    pub(crate) history: Vec<HistoryEntry>,
    /// Set once the current game ended.
    pub(crate) result: Option<GameResult>,
    /// Series score across games.
    pub(crate) scores: SeriesScore,
    /// Opening state while a swap2 opening runs.
    pub(crate) swap2: Option<Swap2State>,
    /// Seat-to-colour mapping once fixed.
    pub(crate) assignment: Option<ColorAssignment>,
    /// Skill ledgers indexed by [`Side::index`].
    pub(crate) ledgers: [SkillLedger; 2],
    /// Permanent terrain points indexed by [`Side::index`].
    pub(crate) tile_bonus: [u32; 2],
    /// Whether the side to move already placed this turn.
    pub(crate) placed_this_turn: bool,
    /// Current game within the series, starting at 1.
    pub(crate) game_number: u32,
    #[getter(skip)]
    pub(crate) rng: StdRng,
}

impl MatchState {
    pub(crate) fn new(config: MatchConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let ledger = SkillLedger::new(config.starting_mana);
        Self {
            board: Board::new(config.board_size),
            side_to_move: Side::Black,
            history: Vec::new(),
            result: None,
            scores: SeriesScore::default(),
            swap2: None,
            assignment: None,
            ledgers: [ledger.clone(), ledger],
            tile_bonus: [0, 0],
            placed_this_turn: false,
            game_number: 0,
            rng,
            config,
        }
    }

    /// Placements (and forfeits) so far in the current game.
    pub fn move_count(&self) -> u32 {
        self.history.len() as u32
    }

    /// Current opening phase; `Complete` when there is no opening to run.
    pub fn phase(&self) -> Swap2Phase {
        self.swap2
            .as_ref()
            .map_or(Swap2Phase::Complete, Swap2State::phase)
    }

    /// Whether the current game has a result.
    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    /// Seat that won the series, once it reaches the target.
    pub fn series_winner(&self) -> Option<Seat> {
        self.scores.leader(self.config.series_target)
    }

    /// Ledger of `side`.
    pub fn ledger(&self, side: Side) -> &SkillLedger {
        &self.ledgers[side.index()]
    }

    /// Seat playing `side`; the standard mapping applies until an opening assigns colours.
    pub fn seat_of(&self, side: Side) -> Seat {
        self.assignment
            .unwrap_or_else(ColorAssignment::standard)
            .seat_of(side)
    }

    /// Terrain score of `side` from the current board.
    pub fn terrain_score(&self, side: Side) -> TerrainScore {
        score(&self.board, side, self.tile_bonus[side.index()])
    }

    /// The board as `side` may see it: concealed stones and unrevealed
    /// tiles are masked, and the opponent's decoys look like real stones.
    pub fn view_for(&self, side: Side) -> Board {
        let mut view = self.board.clone();
        let coords: Vec<Coord> = view.coords().collect();
        for c in coords {
            let Some(cell) = view.cell_mut(c) else {
                continue;
            };
            if !cell.terrain_revealed {
                cell.terrain = Terrain::Normal;
            }
            if cell.stone.is_some_and(|s| s.concealed) {
                cell.stone = None;
            } else if let Some(stone) = cell.stone.as_mut().filter(|s| s.side != side) {
                stone.decoy = false;
            }
        }
        view
    }

    /// Serializable summary for observers.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            board: self.board.display(),
            side_to_move: self.side_to_move,
            move_count: self.move_count(),
            phase: self.phase(),
            result: self.result,
            scores: self.scores,
            series_winner: self.series_winner(),
            game_number: self.game_number,
            mana: [self.ledgers[0].mana(), self.ledgers[1].mana()],
            assignment: self.assignment,
        }
    }

    /// Resets per-game state and runs the variant's setup.
    pub(crate) fn start_game(&mut self, rules: &dyn VariantRules) {
        self.game_number += 1;
        self.board = Board::new(self.config.board_size);
        self.history.clear();
        self.result = None;
        self.placed_this_turn = false;
        self.tile_bonus = [0, 0];
        let ledger = SkillLedger::new(self.config.starting_mana);
        self.ledgers = [ledger.clone(), ledger];
        self.side_to_move = Side::Black;
        rules.prepare_game(self);

        match self.config.opening {
            crate::config::Opening::Standard => {
                self.swap2 = None;
                self.assignment = Some(ColorAssignment::standard());
                self.begin_turn(rules);
            }
            crate::config::Opening::Swap2 => {
                let mut swap2 = Swap2State::new();
                swap2.start();
                self.swap2 = Some(swap2);
                self.assignment = None;
            }
        }
        info!(game = self.game_number, opening = %self.config.opening, "Game started");
    }

    pub(crate) fn finish(&mut self, result: GameResult) {
        self.result = Some(result);
        let assignment = self.assignment.unwrap_or_else(ColorAssignment::standard);
        self.scores.record(result.outcome, assignment);
        info!(
            game = self.game_number,
            outcome = %result.outcome,
            reason = %result.reason,
            first = self.scores.first,
            second = self.scores.second,
            "Game finished"
        );
    }

    /// Draws candidates for the side to move, if the variant uses them.
    pub(crate) fn begin_turn(&mut self, rules: &dyn VariantRules) -> Vec<SkillId> {
        if !rules.allows_skills() {
            return Vec::new();
        }
        let side = self.side_to_move;
        let candidates = if rules.draws_candidates() {
            let pool = self.config.skill_pool();
            draw_candidates(
                &mut self.rng,
                &pool,
                self.ledgers[side.index()].held(),
                self.config.draw_size,
            )
        } else {
            Vec::new()
        };
        self.ledgers[side.index()].begin_turn(candidates.clone());
        debug!(%side, ?candidates, "Turn begins");
        candidates
    }

    /// Ends the current side's turn and picks who moves next.
    pub(crate) fn pass_turn(&mut self, rules: &dyn VariantRules) -> TurnOutcome {
        let ended = self.side_to_move;
        let extra = self.ledgers[ended.index()].take_effect(EffectKind::ExtraTurn);
        if rules.allows_skills() {
            self.ledgers[ended.index()].end_turn(self.config.mana_regen, self.config.mana_cap);
        }
        let expired_decoys = self.board.decay_frozen();

        let opponent = ended.opponent();
        let next_side = if extra {
            debug!(side = %ended, "Extra turn taken");
            ended
        } else if self.ledgers[opponent.index()].take_effect(EffectKind::SkipTurn) {
            debug!(side = %opponent, "Turn skipped");
            ended
        } else {
            opponent
        };

        self.side_to_move = next_side;
        self.placed_this_turn = false;
        let refreshed_skills = self.begin_turn(rules);
        TurnOutcome {
            ended,
            next_side,
            refreshed_skills,
            expired_decoys,
        }
    }
}

/// Serializable match summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Rendered board.
    pub board: String,
    /// Side to move.
    pub side_to_move: Side,
    /// Moves in the current game.
    pub move_count: u32,
    /// Opening phase.
    pub phase: Swap2Phase,
    /// Current game result.
    pub result: Option<GameResult>,
    /// Series score.
    pub scores: SeriesScore,
    /// Seat that won the series.
    pub series_winner: Option<Seat>,
    /// Current game number, starting at 1.
    pub game_number: u32,
    /// Mana per side (Black, White).
    pub mana: [u32; 2],
    /// Colour assignment, once known.
    pub assignment: Option<ColorAssignment>,
}

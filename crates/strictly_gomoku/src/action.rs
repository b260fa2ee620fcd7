//! First-class action types and the rule-violation taxonomy.
//!
//! Actions are domain events, not side effects. They represent a side's
//! intent and are validated against the match state before anything is
//! mutated.

use crate::skills::SkillId;
use crate::swap2::{Seat, Swap2Phase};
use crate::types::{Coord, Side};
use serde::{Deserialize, Serialize};

/// A stone placement by one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct PlaceStone {
    /// The side placing the stone.
    pub side: Side,
    /// Target cell.
    pub coord: Coord,
}

impl std::fmt::Display for PlaceStone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.side, self.coord)
    }
}

/// Why an action was refused.
///
/// Every variant is local and non-fatal: the engine leaves the match state
/// untouched when it returns one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum RuleViolation {
    /// The acting side does not have the move.
    #[display("It is not {}'s turn", _0)]
    OutOfTurn(Side),

    /// The target cell already holds a stone.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(Coord),

    /// The target cell carries revealed block terrain.
    #[display("Cell {} is blocked", _0)]
    CellBlocked(Coord),

    /// The target cell is off the board.
    #[display("Cell {} is out of bounds", _0)]
    OutOfBounds(Coord),

    /// The current game already has a result.
    #[display("Match is already over")]
    MatchOver,

    /// The next game cannot start before the current one ends.
    #[display("The current game is still in progress")]
    GameInProgress,

    /// The action is not valid in the current opening phase.
    #[display("Action not allowed during {:?}", _0)]
    WrongPhase(Swap2Phase),

    /// The acting seat is not the one the opening phase designates.
    #[display("Seat {:?} may not act now", _0)]
    WrongSeat(Seat),

    /// Not enough mana for the skill.
    #[display("Insufficient mana: need {need}, have {have}")]
    InsufficientMana {
        /// Skill cost.
        need: u32,
        /// Current mana.
        have: u32,
    },

    /// The skill is still cooling down.
    #[display("Skill {skill} is on cooldown for {turns} more turn(s)")]
    OnCooldown {
        /// Skill id.
        skill: SkillId,
        /// Turns remaining.
        turns: u32,
    },

    /// The per-turn skill limit has been reached.
    #[display("Skill use limit of {} reached this turn", _0)]
    UseLimitReached(u32),

    /// The side's skills are frozen by an opponent effect.
    #[display("Skills are frozen this turn")]
    SkillsDisabled,

    /// The skill is neither among this turn's candidates nor held.
    #[display("Skill {} is not available", _0)]
    SkillUnavailable(SkillId),

    /// The skill target is malformed or illegal.
    #[display("Invalid target: {}", _0)]
    InvalidTarget(String),

    /// The side already holds the maximum number of skills.
    #[display("Cannot hold more than {} skills", _0)]
    HeldLimitReached(usize),

    /// The side already placed its stone this turn.
    #[display("A stone was already placed this turn")]
    AlreadyPlaced,

    /// The operation does not exist in this variant.
    #[display("{} is not supported in this variant", _0)]
    UnsupportedInVariant(&'static str),

    /// An invariant was violated (postcondition failure).
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for RuleViolation {}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum EndReason {
    /// A line of the configured length was completed.
    #[display("line")]
    Line,
    /// Board filled; decided by terrain score.
    #[display("score")]
    Score,
    /// Board filled with no winning line.
    #[display("board_full")]
    BoardFull,
    /// A side resigned.
    #[display("resignation")]
    Resignation,
    /// A side ran out of time.
    #[display("timeout")]
    Timeout,
    /// External auto-win (e.g. opponent disconnected past the grace window).
    #[display("auto_win")]
    AutoWin,
}

impl EndReason {
    /// Parses the persisted representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "line" => Some(Self::Line),
            "score" => Some(Self::Score),
            "board_full" => Some(Self::BoardFull),
            "resignation" => Some(Self::Resignation),
            "timeout" => Some(Self::Timeout),
            "auto_win" => Some(Self::AutoWin),
            _ => None,
        }
    }
}

//! Contract-based validation for placements.
//!
//! Contracts formalize Hoare-style reasoning: {P} action {Q}. Preconditions
//! are checked on every placement; postconditions run in debug builds
//! before a transition is committed.

use crate::action::{PlaceStone, RuleViolation};
use crate::invariants::{InvariantSet, MatchInvariants};
use crate::state::MatchState;
use crate::swap2::Swap2Phase;
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// Preconditions and postconditions for a state transition.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), RuleViolation>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), RuleViolation>;
}

// ─────────────────────────────────────────────────────────────
//  Placement Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the current game has no result yet.
pub struct MatchLive;

impl MatchLive {
    /// Rejects with [`RuleViolation::MatchOver`] once the game has ended.
    pub fn check(state: &MatchState) -> Result<(), RuleViolation> {
        if state.is_over() {
            Err(RuleViolation::MatchOver)
        } else {
            Ok(())
        }
    }
}

/// Precondition: the opening has finished assigning colours.
pub struct OpeningComplete;

impl OpeningComplete {
    /// Rejects with [`RuleViolation::WrongPhase`] during the opening.
    pub fn check(state: &MatchState) -> Result<(), RuleViolation> {
        match state.phase() {
            Swap2Phase::Complete => Ok(()),
            phase => Err(RuleViolation::WrongPhase(phase)),
        }
    }
}

/// Precondition: it must be the side's turn.
pub struct PlayersTurn;

impl PlayersTurn {
    /// Rejects with [`RuleViolation::OutOfTurn`] when `mv.side` is not to move.
    #[instrument(skip(state))]
    pub fn check(mv: &PlaceStone, state: &MatchState) -> Result<(), RuleViolation> {
        if mv.side != *state.side_to_move() {
            Err(RuleViolation::OutOfTurn(mv.side))
        } else {
            Ok(())
        }
    }
}

/// Precondition: the cell lies on the board.
pub struct InBounds;

impl InBounds {
    /// Rejects with [`RuleViolation::OutOfBounds`] for a coordinate off the board.
    pub fn check(mv: &PlaceStone, state: &MatchState) -> Result<(), RuleViolation> {
        if state.board().contains(mv.coord) {
            Ok(())
        } else {
            Err(RuleViolation::OutOfBounds(mv.coord))
        }
    }
}

/// Precondition: the cell is empty and not a revealed block.
pub struct CellIsEmpty;

impl CellIsEmpty {
    /// Rejects with [`RuleViolation::CellOccupied`] or [`RuleViolation::CellBlocked`].
    ///
    /// A coordinate off the board yields [`RuleViolation::OutOfBounds`].
    pub fn check(mv: &PlaceStone, state: &MatchState) -> Result<(), RuleViolation> {
        match state.board().cell(mv.coord) {
            None => Err(RuleViolation::OutOfBounds(mv.coord)),
            Some(cell) if cell.stone.is_some() => Err(RuleViolation::CellOccupied(mv.coord)),
            Some(cell) if cell.is_blocked() => Err(RuleViolation::CellBlocked(mv.coord)),
            Some(_) => Ok(()),
        }
    }
}

/// Composite precondition for a placement, in the order callers see errors.
pub struct LegalMove;

impl LegalMove {
    /// Validates all preconditions for a placement.
    #[instrument(skip(state))]
    pub fn check(mv: &PlaceStone, state: &MatchState) -> Result<(), RuleViolation> {
        MatchLive::check(state)?;
        OpeningComplete::check(state)?;
        PlayersTurn::check(mv, state)?;
        InBounds::check(mv, state)?;
        CellIsEmpty::check(mv, state)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Placement Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for placements.
///
/// Preconditions: game live, opening complete, side to move, cell on the
/// board and empty.
///
/// Postconditions: every [`MatchInvariants`] member holds.
pub struct MoveContract;

impl Contract<MatchState, PlaceStone> for MoveContract {
    fn pre(state: &MatchState, action: &PlaceStone) -> Result<(), RuleViolation> {
        LegalMove::check(action, state)
    }

    fn post(_before: &MatchState, after: &MatchState) -> Result<(), RuleViolation> {
        check_invariants(after)
    }
}

/// Runs the full invariant set, folding violations into one error.
pub fn check_invariants(state: &MatchState) -> Result<(), RuleViolation> {
    MatchInvariants::check_all(state).map_err(|violations| {
        let descriptions = violations
            .iter()
            .map(|v| v.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        warn!(%descriptions, "Postcondition failed");
        RuleViolation::InvariantViolation(format!("Postcondition failed: {descriptions}"))
    })
}

//! Swap2 opening protocol.
//!
//! The first seat builds a partial position, the second seat decides how
//! colors are assigned (optionally after adding two more stones, in which
//! case the first seat makes the final choice).
//!
//! | Phase            | Actor  | Stones | Accepts                 |
//! |------------------|--------|--------|-------------------------|
//! | `Placement`      | First  | 0..=2  | `Place`                 |
//! | `Choice`         | Second | 3      | `Choose`, `Defer`       |
//! | `ExtraPlacement` | Second | 3..=4  | `Place`                 |
//! | `FinalChoice`    | First  | 5      | `Choose`                |
//! | `Complete`       | -      | 3 or 5 | nothing                 |

use crate::action::RuleViolation;
use crate::types::{Board, Coord, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Seat of a participant, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Seat {
    /// The side that entered the match first and builds the opening.
    First,
    /// The side that entered second and picks colors.
    Second,
}

impl Seat {
    /// The other seat.
    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Persisted representation.
    pub fn to_db_str(self) -> &'static str {
        match self {
            Seat::First => "first",
            Seat::Second => "second",
        }
    }

    /// Parses the persisted representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "first" => Some(Seat::First),
            "second" => Some(Seat::Second),
            _ => None,
        }
    }
}

/// Opening phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Swap2Phase {
    /// Protocol not yet begun.
    NotStarted,
    /// First seat places three stones.
    Placement,
    /// Second seat picks a color or defers.
    Choice,
    /// Second seat places two more stones.
    ExtraPlacement,
    /// First seat picks a color.
    FinalChoice,
    /// Colors are fixed.
    Complete,
}

/// A single opening action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Swap2Action {
    /// Place the next tentative stone.
    Place(Coord),
    /// Take the given color.
    Choose(Side),
    /// Place two more stones and let the opponent choose.
    Defer,
}

/// A stone placed during the opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TentativeStone {
    /// Cell.
    pub coord: Coord,
    /// 1-based order of placement.
    pub placement_order: u8,
}

impl TentativeStone {
    /// Color of the stone; fixed by its order: 1, 3, 4 Black and 2, 5 White.
    pub fn color(&self) -> Side {
        color_for_order(self.placement_order)
    }
}

/// Color of the `order`-th opening stone.
pub fn color_for_order(order: u8) -> Side {
    match order {
        2 | 5 => Side::White,
        _ => Side::Black,
    }
}

/// Which seat plays which color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorAssignment {
    /// Seat playing Black.
    pub black: Seat,
    /// Seat playing White.
    pub white: Seat,
}

impl ColorAssignment {
    /// Assignment where `seat` plays `side`.
    pub fn with(seat: Seat, side: Side) -> Self {
        match side {
            Side::Black => Self {
                black: seat,
                white: seat.other(),
            },
            Side::White => Self {
                black: seat.other(),
                white: seat,
            },
        }
    }

    /// Standard opening: first seat plays Black.
    pub fn standard() -> Self {
        Self::with(Seat::First, Side::Black)
    }

    /// Color played by `seat`.
    pub fn side_of(&self, seat: Seat) -> Side {
        if self.black == seat { Side::Black } else { Side::White }
    }

    /// Seat playing `side`.
    pub fn seat_of(&self, side: Side) -> Seat {
        match side {
            Side::Black => self.black,
            Side::White => self.white,
        }
    }
}

/// Result of one accepted opening action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap2Step {
    /// Phase after the action.
    pub phase: Swap2Phase,
    /// Stone placed by the action, if any.
    pub placed: Option<TentativeStone>,
    /// Final assignment, once complete.
    pub assignment: Option<ColorAssignment>,
}

/// Opening state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap2State {
    phase: Swap2Phase,
    stones: Vec<TentativeStone>,
    active: Seat,
    assignment: Option<ColorAssignment>,
}

impl Swap2State {
    /// Creates the protocol in `NotStarted`.
    pub fn new() -> Self {
        Self {
            phase: Swap2Phase::NotStarted,
            stones: Vec::new(),
            active: Seat::First,
            assignment: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Swap2Phase {
        self.phase
    }

    /// Stones placed so far.
    pub fn stones(&self) -> &[TentativeStone] {
        &self.stones
    }

    /// Seat allowed to act (meaningless once complete).
    pub fn active(&self) -> Seat {
        self.active
    }

    /// Final assignment, once complete.
    pub fn assignment(&self) -> Option<ColorAssignment> {
        self.assignment
    }

    /// Whether colors are fixed.
    pub fn is_complete(&self) -> bool {
        self.phase == Swap2Phase::Complete
    }

    /// Begins the protocol with the first seat placing.
    #[instrument(skip(self))]
    pub fn start(&mut self) {
        if self.phase == Swap2Phase::NotStarted {
            self.phase = Swap2Phase::Placement;
            self.active = Seat::First;
            info!("Swap2 opening started");
        }
    }

    /// Applies an opening action from `seat`, placing stones on `board`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleViolation::WrongPhase`] for actions the phase does not
    /// accept, [`RuleViolation::WrongSeat`] when the seat is not active, and
    /// placement errors from the board. Nothing is mutated on error.
    #[instrument(skip(self, board), fields(phase = ?self.phase))]
    pub fn apply(
        &mut self,
        board: &mut Board,
        seat: Seat,
        action: Swap2Action,
    ) -> Result<Swap2Step, RuleViolation> {
        if matches!(self.phase, Swap2Phase::NotStarted | Swap2Phase::Complete) {
            warn!("Swap2 action outside the opening");
            return Err(RuleViolation::WrongPhase(self.phase));
        }
        if seat != self.active {
            warn!(?seat, active = ?self.active, "Swap2 action from inactive seat");
            return Err(RuleViolation::WrongSeat(seat));
        }

        let placed = match (self.phase, action) {
            (Swap2Phase::Placement | Swap2Phase::ExtraPlacement, Swap2Action::Place(coord)) => {
                Some(self.place(board, coord)?)
            }
            (Swap2Phase::Choice | Swap2Phase::FinalChoice, Swap2Action::Choose(side)) => {
                let assignment = ColorAssignment::with(seat, side);
                info!(?assignment, stones = self.stones.len(), "Swap2 colors chosen");
                self.assignment = Some(assignment);
                self.phase = Swap2Phase::Complete;
                None
            }
            (Swap2Phase::Choice, Swap2Action::Defer) => {
                debug!("Second seat defers the choice");
                self.phase = Swap2Phase::ExtraPlacement;
                None
            }
            (phase, _) => {
                warn!(?action, "Action not accepted in phase");
                return Err(RuleViolation::WrongPhase(phase));
            }
        };

        Ok(Swap2Step {
            phase: self.phase,
            placed,
            assignment: self.assignment,
        })
    }

    fn place(&mut self, board: &mut Board, coord: Coord) -> Result<TentativeStone, RuleViolation> {
        let order = self.stones.len() as u8 + 1;
        let stone = TentativeStone {
            coord,
            placement_order: order,
        };
        board.place(coord, stone.color())?;
        self.stones.push(stone);
        debug!(%coord, order, color = %stone.color(), "Opening stone placed");

        match (self.phase, self.stones.len()) {
            (Swap2Phase::Placement, 3) => {
                self.phase = Swap2Phase::Choice;
                self.active = Seat::Second;
            }
            (Swap2Phase::ExtraPlacement, 5) => {
                self.phase = Swap2Phase::FinalChoice;
                self.active = Seat::First;
            }
            _ => {}
        }
        Ok(stone)
    }

    /// Whether stone count and phase agree with the protocol table.
    pub fn is_consistent(&self) -> bool {
        let n = self.stones.len();
        let ordered = self
            .stones
            .iter()
            .enumerate()
            .all(|(i, s)| s.placement_order as usize == i + 1);
        let shape = match self.phase {
            Swap2Phase::NotStarted => n == 0,
            Swap2Phase::Placement => n <= 2,
            Swap2Phase::Choice => n == 3,
            Swap2Phase::ExtraPlacement => (3..=4).contains(&n),
            Swap2Phase::FinalChoice => n == 5,
            Swap2Phase::Complete => (n == 3 || n == 5) && self.assignment.is_some(),
        };
        ordered && shape
    }
}

impl Default for Swap2State {
    fn default() -> Self {
        Self::new()
    }
}

//! Core domain types for the five-in-a-row board.

use crate::action::RuleViolation;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// One of the two competing sides.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    strum::EnumIter,
)]
pub enum Side {
    /// Black (moves first in a standard opening).
    Black,
    /// White.
    White,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
        }
    }

    /// Stable index for per-side arrays (`Black = 0`, `White = 1`).
    pub fn index(self) -> usize {
        match self {
            Side::Black => 0,
            Side::White => 1,
        }
    }

    /// Parses the persisted representation (`"black"` / `"white"`).
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "black" => Some(Side::Black),
            "white" => Some(Side::White),
            _ => None,
        }
    }

    /// Persisted representation.
    pub fn to_db_str(self) -> &'static str {
        match self {
            Side::Black => "black",
            Side::White => "white",
        }
    }
}

/// Hidden tile type assigned to a cell at board initialization.
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
    Display,
    strum::EnumIter,
)]
pub enum Terrain {
    /// No effect.
    #[default]
    Normal,
    /// Grants a random skill.
    Skill,
    /// Grants an extra turn.
    Double,
    /// Impassable; forfeits the placing side's turn.
    Block,
    /// Clears enemy stones around the cell.
    Bomb,
    /// Skips the opponent's next turn.
    Freeze,
    /// Relocates the placed stone.
    Teleport,
    /// Shields the placed stone.
    Shield,
    /// Resolves a random sub-effect.
    Mystery,
    /// Adds a permanent point to the placing side.
    Score,
}

/// Board coordinate: `x` is the column, `y` is the row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    derive_new::new,
)]
#[display("({x}, {y})")]
pub struct Coord {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// One of the four line axes a chain can run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, strum::EnumIter)]
pub enum Axis {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    Vertical,
    /// Top-left to bottom-right.
    Diagonal,
    /// Bottom-left to top-right.
    AntiDiagonal,
}

impl Axis {
    /// All four axes.
    pub const ALL: [Axis; 4] = [
        Axis::Horizontal,
        Axis::Vertical,
        Axis::Diagonal,
        Axis::AntiDiagonal,
    ];

    /// Unit step along the axis in the positive direction.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Axis::Horizontal => (1, 0),
            Axis::Vertical => (0, 1),
            Axis::Diagonal => (1, 1),
            Axis::AntiDiagonal => (1, -1),
        }
    }
}

/// A stone and its transient flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stone {
    /// Owning side.
    pub side: Side,
    /// Order in which the stone entered the board (starts at 1).
    pub placement_index: u32,
    /// Immune to destroy, bomb and push.
    pub shielded: bool,
    /// Turns until the frozen state decays.
    pub frozen_turns: u32,
    /// Decoy stones vanish once their frozen counter reaches zero.
    pub decoy: bool,
    /// Hidden from both players (hidden variant); still counts for lines.
    pub concealed: bool,
}

impl Stone {
    /// Creates a plain stone.
    pub fn new(side: Side, placement_index: u32) -> Self {
        Self {
            side,
            placement_index,
            shielded: false,
            frozen_turns: 0,
            decoy: false,
            concealed: false,
        }
    }

    /// Whether enemy targeting skills bounce off this stone.
    pub fn is_protected(&self) -> bool {
        self.shielded || (self.frozen_turns > 0 && !self.decoy)
    }
}

/// A single board cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Stone on the cell, if any.
    pub stone: Option<Stone>,
    /// Terrain tag.
    pub terrain: Terrain,
    /// Whether the terrain has been revealed.
    pub terrain_revealed: bool,
}

impl Cell {
    /// Side occupying the cell.
    pub fn occupant(&self) -> Option<Side> {
        self.stone.map(|s| s.side)
    }

    /// Side occupying the cell with a stone that counts for lines and scoring.
    pub fn solid_occupant(&self) -> Option<Side> {
        self.stone.filter(|s| !s.decoy).map(|s| s.side)
    }

    /// Revealed block terrain: nothing may enter.
    pub fn is_blocked(&self) -> bool {
        self.terrain == Terrain::Block && self.terrain_revealed
    }

    /// Empty and enterable.
    pub fn is_open(&self) -> bool {
        self.stone.is_none() && !self.is_blocked()
    }
}

/// A single cell change between two board states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    /// Changed cell.
    pub coord: Coord,
    /// Occupant before.
    pub before: Option<Side>,
    /// Occupant after.
    pub after: Option<Side>,
}

/// Fixed-size square grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    /// Cells in row-major order.
    cells: Vec<Cell>,
    next_placement: u32,
}

impl Board {
    /// Creates an empty `size` x `size` board.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size * size],
            next_placement: 1,
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Placement index the next stone will receive.
    pub fn next_placement(&self) -> u32 {
        self.next_placement
    }

    /// Whether the coordinate lies on the board.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.size && coord.y < self.size
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        self.contains(coord).then(|| coord.y * self.size + coord.x)
    }

    /// Bounds-checked cell access.
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    /// Bounds-checked mutable cell access.
    pub fn cell_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        self.index(coord).map(move |i| &mut self.cells[i])
    }

    /// Side at the coordinate (`None` when empty or off-board).
    pub fn occupant(&self, coord: Coord) -> Option<Side> {
        self.cell(coord).and_then(Cell::occupant)
    }

    /// Stone at the coordinate.
    pub fn stone(&self, coord: Coord) -> Option<&Stone> {
        self.cell(coord).and_then(|c| c.stone.as_ref())
    }

    /// Mutable stone at the coordinate.
    pub fn stone_mut(&mut self, coord: Coord) -> Option<&mut Stone> {
        self.cell_mut(coord).and_then(|c| c.stone.as_mut())
    }

    /// Whether a stone may be placed at the coordinate.
    pub fn is_open(&self, coord: Coord) -> bool {
        self.cell(coord).is_some_and(Cell::is_open)
    }

    /// Steps `(dx, dy)` from `coord`, returning `None` off the board.
    pub fn offset(&self, coord: Coord, dx: isize, dy: isize) -> Option<Coord> {
        let x = coord.x.checked_add_signed(dx)?;
        let y = coord.y.checked_add_signed(dy)?;
        let next = Coord::new(x, y);
        self.contains(next).then_some(next)
    }

    /// Places a new stone, assigning the next placement index.
    ///
    /// # Errors
    ///
    /// Rejects off-board, occupied and blocked cells.
    pub fn place(&mut self, coord: Coord, side: Side) -> Result<u32, RuleViolation> {
        let index = self.next_placement;
        let cell = self.cell_mut(coord).ok_or(RuleViolation::OutOfBounds(coord))?;
        if cell.stone.is_some() {
            return Err(RuleViolation::CellOccupied(coord));
        }
        if cell.is_blocked() {
            return Err(RuleViolation::CellBlocked(coord));
        }
        cell.stone = Some(Stone::new(side, index));
        self.next_placement += 1;
        Ok(index)
    }

    /// Places a stone carrying the given flags, assigning a fresh placement index.
    pub(crate) fn place_stone(
        &mut self,
        coord: Coord,
        mut stone: Stone,
    ) -> Result<u32, RuleViolation> {
        let index = self.place(coord, stone.side)?;
        stone.placement_index = index;
        if let Some(cell) = self.cell_mut(coord) {
            cell.stone = Some(stone);
        }
        Ok(index)
    }

    /// Removes and returns the stone at the coordinate.
    pub fn remove(&mut self, coord: Coord) -> Option<Stone> {
        self.cell_mut(coord).and_then(|c| c.stone.take())
    }

    /// Moves a stone (with its flags and placement index) to an open cell.
    pub(crate) fn relocate(&mut self, from: Coord, to: Coord) -> Result<(), RuleViolation> {
        if !self.is_open(to) {
            return Err(RuleViolation::InvalidTarget(format!("{to} is not open")));
        }
        let stone = self
            .remove(from)
            .ok_or_else(|| RuleViolation::InvalidTarget(format!("no stone at {from}")))?;
        if let Some(cell) = self.cell_mut(to) {
            cell.stone = Some(stone);
        }
        Ok(())
    }

    /// Exchanges the stones (or emptiness) of two cells.
    pub(crate) fn swap_stones(&mut self, a: Coord, b: Coord) {
        let (Some(ia), Some(ib)) = (self.index(a), self.index(b)) else {
            return;
        };
        let stone_a = self.cells[ia].stone.take();
        let stone_b = self.cells[ib].stone.take();
        self.cells[ia].stone = stone_b;
        self.cells[ib].stone = stone_a;
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.size).flat_map(move |y| (0..self.size).map(move |x| Coord::new(x, y)))
    }

    /// Coordinates of every stone owned by `side`.
    pub fn stones_of(&self, side: Side) -> impl Iterator<Item = Coord> + '_ {
        self.coords().filter(move |c| self.occupant(*c) == Some(side))
    }

    /// Open cells in row-major order.
    pub fn open_cells(&self) -> Vec<Coord> {
        self.coords().filter(|c| self.is_open(*c)).collect()
    }

    /// Number of stones on the board.
    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| c.stone.is_some()).count()
    }

    /// Cells within Chebyshev distance `radius` of `center`, clipped to the board.
    pub fn area(&self, center: Coord, radius: usize) -> Vec<Coord> {
        let r = radius as isize;
        let mut out = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if let Some(c) = self.offset(center, dx, dy) {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Decrements every frozen counter, removing decoys whose counter expires.
    pub(crate) fn decay_frozen(&mut self) -> Vec<Coord> {
        let mut expired = Vec::new();
        let size = self.size;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let Some(stone) = cell.stone.as_mut() else {
                continue;
            };
            if stone.frozen_turns == 0 {
                continue;
            }
            stone.frozen_turns -= 1;
            if stone.frozen_turns == 0 && stone.decoy {
                cell.stone = None;
                expired.push(Coord::new(i % size, i / size));
            }
        }
        expired
    }

    /// Cells whose occupant differs between two boards of equal size.
    pub fn diff(before: &Board, after: &Board) -> Vec<CellChange> {
        before
            .coords()
            .filter_map(|coord| {
                let b = before.occupant(coord);
                let a = after.occupant(coord);
                (a != b).then_some(CellChange {
                    coord,
                    before: b,
                    after: a,
                })
            })
            .collect()
    }

    /// Formats the board as a human-readable grid.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for y in 0..self.size {
            for x in 0..self.size {
                let cell = &self.cells[y * self.size + x];
                let symbol = match (cell.occupant(), cell.is_blocked()) {
                    (Some(Side::Black), _) => 'X',
                    (Some(Side::White), _) => 'O',
                    (None, true) => '#',
                    (None, false) => '.',
                };
                out.push(symbol);
                if x + 1 < self.size {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out
    }
}

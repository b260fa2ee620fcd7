//! Chain and intersection scoring for the terrain variant.
//!
//! Scores are always recomputed from the board. Only the tile bonus is
//! carried separately, since it comes from one-shot tile triggers.

use crate::types::{Axis, Board, Coord, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::instrument;

/// A maximal straight run of one side's stones, length two or more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Cells from the run's start along `axis`.
    pub cells: Vec<Coord>,
    /// Number of cells.
    pub length: usize,
    /// Axis the run follows.
    pub axis: Axis,
}

/// A cell shared by two or more chains that had not yet earned a bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intersection {
    /// Shared cell.
    pub cell: Coord,
    /// Chains meeting here.
    pub chain_count: usize,
    /// Sum of the meeting chains' lengths.
    pub bonus: u32,
}

/// Breakdown of one side's score.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerrainScore {
    /// Counted chains.
    pub chains: Vec<Chain>,
    /// Bonused intersections.
    pub intersections: Vec<Intersection>,
    /// Stones that belong to no chain.
    pub single_piece_count: u32,
    /// Points from score tiles.
    pub tile_bonus: u32,
    /// Final total.
    pub total: u32,
}

impl TerrainScore {
    /// Length of the longest chain, or 1 for a lone stone, or 0 for none.
    pub fn longest_chain(&self) -> usize {
        self.chains
            .iter()
            .map(|c| c.length)
            .max()
            .unwrap_or(usize::from(self.single_piece_count > 0))
    }
}

/// Scores `side` on `board`.
#[instrument(skip(board), fields(size = board.size()))]
pub fn score(board: &Board, side: Side, tile_bonus: u32) -> TerrainScore {
    let owns = |c: Coord| board.cell(c).and_then(|cell| cell.solid_occupant()) == Some(side);

    let mut chains = Vec::new();
    let mut chained: BTreeSet<Coord> = BTreeSet::new();
    let mut singles = 0u32;

    for start in board.coords().filter(|c| owns(*c)) {
        for axis in Axis::ALL {
            let (dx, dy) = axis.delta();
            let has_predecessor = board.offset(start, -dx, -dy).is_some_and(owns);
            if has_predecessor {
                continue;
            }
            let mut cells = vec![start];
            let mut cursor = start;
            while let Some(next) = board.offset(cursor, dx, dy).filter(|c| owns(*c)) {
                cells.push(next);
                cursor = next;
            }
            if cells.len() >= 2 {
                chained.extend(cells.iter().copied());
                chains.push(Chain {
                    length: cells.len(),
                    cells,
                    axis,
                });
            }
        }
    }

    for c in board.coords().filter(|c| owns(*c)) {
        if !chained.contains(&c) {
            singles += 1;
        }
    }

    let mut bonused = vec![false; chains.len()];
    let mut intersections = Vec::new();
    for cell in board.coords().filter(|c| chained.contains(c)) {
        let meeting: Vec<usize> = chains
            .iter()
            .enumerate()
            .filter(|(i, chain)| !bonused[*i] && chain.cells.contains(&cell))
            .map(|(i, _)| i)
            .collect();
        if meeting.len() < 2 {
            continue;
        }
        let bonus: usize = meeting.iter().map(|i| chains[*i].length).sum();
        for i in &meeting {
            bonused[*i] = true;
        }
        intersections.push(Intersection {
            cell,
            chain_count: meeting.len(),
            bonus: bonus as u32,
        });
    }

    let chain_points: usize = chains.iter().map(|c| c.length).sum();
    let bonus_points: u32 = intersections.iter().map(|i| i.bonus).sum();
    let total = chain_points as u32 + singles + bonus_points + tile_bonus;

    TerrainScore {
        chains,
        intersections,
        single_piece_count: singles,
        tile_bonus,
        total,
    }
}

/// Decides a full board: higher total wins, then longer chain, else draw.
pub fn compare(black: &TerrainScore, white: &TerrainScore) -> Option<Side> {
    use std::cmp::Ordering;
    match black
        .total
        .cmp(&white.total)
        .then(black.longest_chain().cmp(&white.longest_chain()))
    {
        Ordering::Greater => Some(Side::Black),
        Ordering::Less => Some(Side::White),
        Ordering::Equal => None,
    }
}

//! Board-full detection.

use crate::types::{Board, Cell};
use tracing::instrument;

/// Checks whether every enterable cell holds a stone.
///
/// Revealed block cells never fill, so they are ignored. A full board with
/// no winning line ends the game.
#[instrument(skip(board))]
pub fn is_full(board: &Board) -> bool {
    board
        .coords()
        .filter_map(|c| board.cell(c))
        .all(|cell: &Cell| cell.stone.is_some() || cell.is_blocked())
}

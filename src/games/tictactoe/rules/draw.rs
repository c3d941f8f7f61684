//! Tie detection.

use super::super::{Board, Cell};
use super::win::find_run;
use tracing::instrument;

/// Checks if the board is full (all cells occupied).
#[instrument(skip(board), fields(size = board.size()))]
pub fn is_full(board: &Board) -> bool {
    board.cells().iter().all(|c| *c != Cell::Empty)
}

/// A full board with no run is a tie.
pub fn is_tie(board: &Board) -> bool {
    is_full(board) && find_run(board).is_none()
}

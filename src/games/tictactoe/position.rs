//! Board coordinates.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A (row, column) coordinate on the board, zero-based from the top-left.
///
/// Positions are not bound to a board size; the board decides whether a
/// position is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    row: usize,
    col: usize,
}

impl Position {
    /// Creates a position.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row index.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Column index.
    pub fn col(&self) -> usize {
        self.col
    }

    /// Converts a flat row-major cell index into a position on a `size`-wide board.
    ///
    /// Returns `None` when `size` is zero. The result may still be out of
    /// range for the board if `index >= size * size`.
    #[instrument]
    pub fn from_index(index: usize, size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        Some(Self::new(index / size, index % size))
    }

    /// Converts the position to a flat row-major index on a `size`-wide board.
    pub fn to_index(self, size: usize) -> usize {
        self.row * size + self.col
    }

    /// Steps `distance` cells along `(d_row, d_col)`, or `None` if that leaves
    /// the non-negative quadrant.
    pub(crate) fn offset(self, d_row: isize, d_col: isize, distance: usize) -> Option<Self> {
        let distance = isize::try_from(distance).ok()?;
        let row = isize::try_from(self.row).ok()? + d_row * distance;
        let col = isize::try_from(self.col).ok()? + d_col * distance;
        Some(Self::new(usize::try_from(row).ok()?, usize::try_from(col).ok()?))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

//! Core domain types for the board: marks, cells and the N×N grid.

use super::position::Position;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Mark placed on the board.
///
/// Player A always plays `X` and moves first; player B plays `O`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Mark {
    /// Player A's mark.
    X,
    /// Player B's mark.
    O,
}

impl Mark {
    /// Returns the opponent's mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Single-character symbol used in text renderings.
    pub fn symbol(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

/// A single cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cell {
    /// Empty cell.
    #[default]
    Empty,
    /// Cell occupied by a mark.
    Occupied(Mark),
}

impl Cell {
    /// Returns the mark in this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(mark) => Some(mark),
        }
    }

    fn symbol(self) -> char {
        self.mark().map_or('.', Mark::symbol)
    }
}

/// Result of scanning the board for a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardOutcome {
    /// No run and at least one empty cell.
    None,
    /// A run of the required length exists for this mark.
    Win(Mark),
    /// Board is full and no run exists.
    Tie,
}

/// Square N×N board with a fixed run length K needed to win.
///
/// Both dimensions are fixed for the board's lifetime. Cells only ever
/// transition from `Empty` to `Occupied`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    run_length: usize,
    /// Cells in row-major order.
    cells: Vec<Cell>,
}

impl Board {
    /// Creates an empty `size`×`size` board requiring `run_length` marks in a row to win.
    #[instrument]
    pub fn new(size: usize, run_length: usize) -> Self {
        Self {
            size,
            run_length,
            cells: vec![Cell::Empty; size * size],
        }
    }

    /// Side length of the board.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of consecutive marks needed to win.
    pub fn run_length(&self) -> usize {
        self.run_length
    }

    /// Returns true if the position lies on the board.
    pub fn contains(&self, pos: Position) -> bool {
        pos.row() < self.size && pos.col() < self.size
    }

    /// Gets the cell at the given position, or `None` when out of bounds.
    pub fn get(&self, pos: Position) -> Option<Cell> {
        if self.contains(pos) {
            self.cells.get(pos.row() * self.size + pos.col()).copied()
        } else {
            None
        }
    }

    /// Checks if the cell at `pos` is on the board and empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        matches!(self.get(pos), Some(Cell::Empty))
    }

    /// Places `mark` at (`row`, `col`).
    ///
    /// Succeeds only when the cell exists and is empty. Returns `false`
    /// and leaves the board untouched otherwise.
    #[instrument(skip(self), fields(size = self.size))]
    pub fn place(&mut self, row: usize, col: usize, mark: Mark) -> bool {
        let pos = Position::new(row, col);
        if !self.is_empty(pos) {
            return false;
        }
        self.cells[row * self.size + col] = Cell::Occupied(mark);
        true
    }

    /// Returns all cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Counts the cells holding `mark`.
    pub fn count(&self, mark: Mark) -> usize {
        self.cells
            .iter()
            .filter(|c| **c == Cell::Occupied(mark))
            .count()
    }

    /// Checks if every cell is occupied.
    pub fn is_full(&self) -> bool {
        super::rules::is_full(self)
    }

    /// Scans the board for a winning run or a tie.
    pub fn check_outcome(&self) -> BoardOutcome {
        if let Some(mark) = super::rules::find_run(self) {
            BoardOutcome::Win(mark)
        } else if self.is_full() {
            BoardOutcome::Tie
        } else {
            BoardOutcome::None
        }
    }

    /// Encodes the board as rows joined by `,` (`X`, `O`, `.` per cell).
    pub fn encode_rows(&self) -> String {
        self.cells
            .chunks(self.size.max(1))
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Formats the board as a human-readable grid.
    pub fn display(&self) -> String {
        self.encode_rows().replace(',', "\n")
    }
}

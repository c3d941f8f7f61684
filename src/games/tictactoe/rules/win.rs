//! Run detection.

use super::super::{Board, Mark, Position};
use tracing::instrument;

/// Axis along which a run is measured.
///
/// Variants are declared in scan order; the first run found wins, so the
/// order is part of the observable behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum Direction {
    /// Left to right along a row.
    Horizontal,
    /// Top to bottom along a column.
    Vertical,
    /// Top-left to bottom-right.
    DiagonalDown,
    /// The rising diagonal, walked from its top-right end toward the
    /// bottom-left, so a run is anchored at its upper cell.
    AntiDiagonal,
}

impl Direction {
    /// Row and column step for one cell along this axis.
    pub fn step(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::DiagonalDown => (1, 1),
            Direction::AntiDiagonal => (1, -1),
        }
    }
}

/// Returns the mark of a run of `run_length` identical marks starting at
/// `start` along `direction`, if the whole run is in bounds.
pub fn run_at(board: &Board, start: Position, direction: Direction) -> Option<Mark> {
    let k = board.run_length();
    if k == 0 {
        return None;
    }
    let (d_row, d_col) = direction.step();
    let end = start.offset(d_row, d_col, k - 1)?;
    if !board.contains(end) {
        return None;
    }

    let mark = board.get(start)?.mark()?;
    let complete = (1..k).all(|i| {
        start
            .offset(d_row, d_col, i)
            .and_then(|p| board.get(p))
            .and_then(|c| c.mark())
            == Some(mark)
    });
    complete.then_some(mark)
}

/// Scans the board in row-major order, trying each direction in declaration
/// order, and returns the mark of the first complete run found.
#[instrument(skip(board), fields(size = board.size(), run_length = board.run_length()))]
pub fn find_run(board: &Board) -> Option<Mark> {
    let size = board.size();
    for row in 0..size {
        for col in 0..size {
            let start = Position::new(row, col);
            for direction in <Direction as strum::IntoEnumIterator>::iter() {
                if let Some(mark) = run_at(board, start, direction) {
                    return Some(mark);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(rows: &[&str], run_length: usize) -> Board {
        let mut board = Board::new(rows.len(), run_length);
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                match ch {
                    'X' => assert!(board.place(r, c, Mark::X)),
                    'O' => assert!(board.place(r, c, Mark::O)),
                    _ => {}
                }
            }
        }
        board
    }

    #[test]
    fn test_no_run_empty_board() {
        assert_eq!(find_run(&Board::new(3, 3)), None);
    }

    #[test]
    fn test_run_top_row() {
        let board = board_from(&["XXX", "OO.", "..."], 3);
        assert_eq!(find_run(&board), Some(Mark::X));
    }

    #[test]
    fn test_run_column() {
        let board = board_from(&["XO.", "XO.", ".O."], 3);
        assert_eq!(find_run(&board), Some(Mark::O));
    }

    #[test]
    fn test_run_diagonal_down() {
        let board = board_from(&["O..", ".O.", "..O"], 3);
        assert_eq!(find_run(&board), Some(Mark::O));
    }

    #[test]
    fn test_run_anti_diagonal() {
        let board = board_from(&["..X", ".X.", "X.."], 3);
        assert_eq!(find_run(&board), Some(Mark::X));
        assert_eq!(
            run_at(&board, Position::new(0, 2), Direction::AntiDiagonal),
            Some(Mark::X)
        );
        assert_eq!(run_at(&board, Position::new(2, 0), Direction::AntiDiagonal), None);
    }

    #[test]
    fn test_anti_diagonal_anchored_at_top_cell() {
        // O's anti-diagonal starts on row 0; X's row starts on row 1.
        let board = board_from(&["....O", "XXXO.", "..O..", ".....", "....."], 3);
        assert_eq!(find_run(&board), Some(Mark::O));
    }

    #[test]
    fn test_run_must_fit_in_bounds() {
        // Four in a row on a 5-wide board with K=5 is not a win.
        let board = board_from(&[".XXXX", ".....", ".....", ".....", "....."], 5);
        assert_eq!(find_run(&board), None);
    }

    #[test]
    fn test_longer_board_run_in_middle() {
        let board = board_from(
            &["......", "......", ".OOOO.", "......", "......", "......"],
            4,
        );
        assert_eq!(find_run(&board), Some(Mark::O));
    }

    #[test]
    fn test_first_run_in_scan_order_wins() {
        // O's column starts at (0,0); X's row starts at (1,1). Row-major scan
        // reaches (0,0) first.
        let board = board_from(&["O...", "OXXX", "O...", "...."], 3);
        assert_eq!(find_run(&board), Some(Mark::O));
    }

    #[test]
    fn test_run_longer_than_board_never_wins() {
        let board = board_from(&["XX", "XX"], 3);
        assert_eq!(find_run(&board), None);
    }
}

//! Tests for board geometry and outcome detection.

use strictly_sessions::rules::{Direction, find_run, is_full, is_tie, run_at};
use strictly_sessions::{Board, BoardOutcome, Cell, Mark, Position};

/// Builds a board from rows of `X`, `O` and `.`.
fn board_from(rows: &[&str], run_length: usize) -> Board {
    let mut board = Board::new(rows.len(), run_length);
    for (row, line) in rows.iter().enumerate() {
        for (col, symbol) in line.chars().enumerate() {
            let mark = match symbol {
                'X' => Mark::X,
                'O' => Mark::O,
                _ => continue,
            };
            assert!(board.place(row, col, mark), "cell ({row}, {col}) placed twice");
        }
    }
    board
}

#[test]
fn test_new_board_is_empty() {
    let board = Board::new(20, 5);
    assert_eq!(board.cells().len(), 400);
    assert!(board.cells().iter().all(|c| *c == Cell::Empty));
    assert_eq!(board.check_outcome(), BoardOutcome::None);
}

#[test]
fn test_place_rejects_occupied_cell() {
    let mut board = Board::new(3, 3);
    assert!(board.place(1, 1, Mark::X));
    assert!(!board.place(1, 1, Mark::O));
    assert_eq!(board.get(Position::new(1, 1)), Some(Cell::Occupied(Mark::X)));
}

#[test]
fn test_place_rejects_out_of_bounds() {
    let mut board = Board::new(3, 3);
    assert!(!board.place(3, 0, Mark::X));
    assert!(!board.place(0, 3, Mark::X));
    assert_eq!(board.get(Position::new(3, 0)), None);
}

#[test]
fn test_horizontal_run() {
    let board = board_from(&["XXX", "OO.", "..."], 3);
    assert_eq!(board.check_outcome(), BoardOutcome::Win(Mark::X));
    assert_eq!(
        run_at(&board, Position::new(0, 0), Direction::Horizontal),
        Some(Mark::X)
    );
}

#[test]
fn test_vertical_run() {
    let board = board_from(&["XO.", "XO.", ".OX"], 3);
    assert_eq!(board.check_outcome(), BoardOutcome::Win(Mark::O));
}

#[test]
fn test_diagonal_down_run() {
    let board = board_from(&["XO.", "OX.", "..X"], 3);
    assert_eq!(find_run(&board), Some(Mark::X));
}

#[test]
fn test_anti_diagonal_run() {
    let board = board_from(&["X.O", "XO.", "O.X"], 3);
    assert_eq!(
        run_at(&board, Position::new(0, 2), Direction::AntiDiagonal),
        Some(Mark::O)
    );
    assert_eq!(board.check_outcome(), BoardOutcome::Win(Mark::O));
}

#[test]
fn test_five_in_a_row_on_large_board() {
    let mut board = Board::new(20, 5);
    for col in 7..11 {
        assert!(board.place(12, col, Mark::O));
    }
    assert_eq!(board.check_outcome(), BoardOutcome::None, "four is not enough");
    assert!(board.place(12, 11, Mark::O));
    assert_eq!(board.check_outcome(), BoardOutcome::Win(Mark::O));
}

#[test]
fn test_run_at_board_edge() {
    let mut board = Board::new(20, 5);
    for i in 0..5 {
        assert!(board.place(15 + i, 19 - i, Mark::X));
    }
    assert_eq!(
        run_at(&board, Position::new(15, 19), Direction::AntiDiagonal),
        Some(Mark::X)
    );
    assert_eq!(board.check_outcome(), BoardOutcome::Win(Mark::X));
}

#[test]
fn test_broken_run_does_not_win() {
    let board = board_from(&["XOX", "...", "..."], 3);
    assert_eq!(board.check_outcome(), BoardOutcome::None);
}

#[test]
fn test_full_board_without_run_is_tie() {
    let board = board_from(&["XOX", "XOO", "OXX"], 3);
    assert!(is_full(&board));
    assert!(is_tie(&board));
    assert_eq!(board.check_outcome(), BoardOutcome::Tie);
}

#[test]
fn test_full_board_with_run_is_win() {
    let board = board_from(&["XXX", "OOX", "XOO"], 3);
    assert!(is_full(&board));
    assert!(!is_tie(&board));
    assert_eq!(board.check_outcome(), BoardOutcome::Win(Mark::X));
}

#[test]
fn test_encode_rows() {
    let board = board_from(&["X.O", "...", ".X."], 3);
    assert_eq!(board.encode_rows(), "X.O,...,.X.");
    assert_eq!(board.count(Mark::X), 2);
    assert_eq!(board.count(Mark::O), 1);
}

#[test]
fn test_position_index_conversion() {
    let pos = Position::from_index(7, 3).expect("in range");
    assert_eq!(pos, Position::new(2, 1));
    assert_eq!(pos.to_index(3), 7);
    let past_end = Position::from_index(9, 3).expect("nonzero size");
    assert!(!Board::new(3, 3).contains(past_end));
    assert_eq!(Position::from_index(9, 0), None);
}

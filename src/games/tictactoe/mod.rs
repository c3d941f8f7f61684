//! Board model: marks, coordinates, and win/tie rules.

mod position;
pub mod rules;
mod types;

pub use position::Position;
pub use types::{Board, BoardOutcome, Cell, Mark};

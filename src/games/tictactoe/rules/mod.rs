//! Outcome rules for an N×N board with run length K.
//!
//! Rules are pure functions over [`Board`](super::Board), kept apart from
//! board storage so the session state machine can compose them.

pub mod draw;
pub mod win;

pub use draw::{is_full, is_tie};
pub use win::{Direction, find_run, run_at};

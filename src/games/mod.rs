//! Board games hosted by the session engine.

pub mod tictactoe;

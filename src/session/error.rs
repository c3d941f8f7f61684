//! Session error types.

use super::{PlayerId, SessionId};
use crate::games::tictactoe::Position;
use serde::{Deserialize, Serialize};

/// Rejected command. Every variant is recoverable and reported back to the
/// requester; none of them leave the session changed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// No session with this id is registered.
    #[display("Session {} not found", _0)]
    NotFound(SessionId),

    /// Both seats are taken.
    #[display("Session is already full")]
    Full,

    /// The player is already waiting for, or seated in, a session.
    #[display("Player {} has already joined a session", _0)]
    AlreadyJoining(PlayerId),

    /// The player does not hold the turn.
    #[display("It's not {}'s turn", _0)]
    NotYourTurn(PlayerId),

    /// Target cell already holds a mark.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(Position),

    /// Target cell is off the board.
    #[display("Position {} is outside the board", _0)]
    InvalidPosition(Position),

    /// The session has already ended.
    #[display("Game is already over")]
    GameOver,

    /// Player B has not joined yet.
    #[display("Game is waiting for another player to join")]
    WaitingForOpponent,

    /// The player is not seated in the session.
    #[display("Player {} is not part of this game", _0)]
    UnknownPlayer(PlayerId),
}

impl std::error::Error for SessionError {}

impl SessionError {
    /// Wire-level classification of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound(_) => ErrorKind::NotFound,
            SessionError::Full => ErrorKind::Full,
            SessionError::AlreadyJoining(_) => ErrorKind::AlreadyJoining,
            SessionError::NotYourTurn(_) => ErrorKind::NotYourTurn,
            SessionError::CellOccupied(_) => ErrorKind::CellOccupied,
            SessionError::InvalidPosition(_) => ErrorKind::InvalidPosition,
            SessionError::GameOver => ErrorKind::GameOver,
            SessionError::WaitingForOpponent => ErrorKind::WaitingForOpponent,
            SessionError::UnknownPlayer(_) => ErrorKind::UnknownPlayer,
        }
    }
}

/// Classification of a [`SessionError`] carried by `error` events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ErrorKind {
    /// Unknown session.
    NotFound,
    /// Session already has two players.
    Full,
    /// Duplicate join.
    AlreadyJoining,
    /// Move out of turn.
    NotYourTurn,
    /// Cell taken.
    CellOccupied,
    /// Off-board position.
    InvalidPosition,
    /// Session ended.
    GameOver,
    /// Opponent missing.
    WaitingForOpponent,
    /// Player not seated.
    UnknownPlayer,
}

/// Broken internal invariant.
///
/// Not a user error: the registry logs it and aborts, since continuing
/// would serve a corrupted game.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("Invariant violation in session {}: {}", session_id, description)]
pub struct InvariantViolation {
    /// Session in which the violation was found.
    pub session_id: SessionId,
    /// Which invariant failed.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(session_id: impl Into<SessionId>, description: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            description: description.into(),
        }
    }
}

impl std::error::Error for InvariantViolation {}

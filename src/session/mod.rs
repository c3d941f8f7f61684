//! Game sessions: the per-game state machine and its snapshots.

mod error;
mod game;
mod state;
mod view;

pub use error::{ErrorKind, InvariantViolation, SessionError};
pub use game::{LeaveReport, MoveReport, Session};
pub use state::{Outcome, Phase};
pub use view::SessionView;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Identity of a transport connection.
pub type ConnectionId = String;

/// Generates a fresh session id.
pub fn new_session_id() -> SessionId {
    uuid::Uuid::new_v4().to_string()
}

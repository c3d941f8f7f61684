//! Read-only session snapshots for broadcast and archiving.

use super::state::{Outcome, Phase};
use super::{PlayerId, SessionId};
use crate::games::tictactoe::Board;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Immutable projection of a session taken under the session lock.
///
/// Owns copies of everything it shows; holding a view never blocks or
/// aliases the live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub(super) session_id: SessionId,
    pub(super) board: Board,
    pub(super) player_a: PlayerId,
    pub(super) player_b: Option<PlayerId>,
    /// Player holding the turn while the game is in play.
    pub(super) turn: Option<PlayerId>,
    pub(super) phase: Phase,
    pub(super) outcome: Option<Outcome>,
    /// Player credited with the win, resolved from the outcome.
    pub(super) winner: Option<PlayerId>,
    /// Players still connected to the session.
    pub(super) remaining_players: usize,
    pub(super) move_count: u32,
    pub(super) started_at: DateTime<Utc>,
    pub(super) last_move_at: Option<DateTime<Utc>>,
    pub(super) move_deadline: Option<DateTime<Utc>>,
    pub(super) session_deadline: DateTime<Utc>,
}

//! Archived game rows.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::archive::{ArchiveError, schema};
use crate::session::SessionView;

/// A finished game as stored.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::finished_games)]
pub struct FinishedGame {
    id: i32,
    session_id: String,
    board: String,
    board_size: i32,
    player_a: String,
    player_b: Option<String>,
    winner: Option<String>,
    outcome: String,
    move_count: i32,
    started_at: NaiveDateTime,
    last_move_at: Option<NaiveDateTime>,
    archived_at: NaiveDateTime,
}

/// Insertable row built from a terminal session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Insertable, new, Getters)]
#[diesel(table_name = schema::finished_games)]
pub struct NewFinishedGame {
    session_id: String,
    board: String,
    board_size: i32,
    player_a: String,
    player_b: Option<String>,
    winner: Option<String>,
    outcome: String,
    move_count: i32,
    started_at: NaiveDateTime,
    last_move_at: Option<NaiveDateTime>,
}

impl NewFinishedGame {
    /// Builds the row for a finished session.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the snapshot has no outcome or its sizes
    /// do not fit the column types.
    #[instrument(skip(view), fields(session_id = %view.session_id()))]
    pub fn from_view(view: &SessionView) -> Result<Self, ArchiveError> {
        let outcome = (*view.outcome())
            .ok_or_else(|| ArchiveError::unfinished(view.session_id().clone()))?;
        let board_size = i32::try_from(view.board().size())
            .map_err(|_| {
                ArchiveError::new("Board size does not fit in a column").in_session(view.session_id().clone())
            })?;
        let move_count = i32::try_from(*view.move_count())
            .map_err(|_| {
                ArchiveError::new("Move count does not fit in a column").in_session(view.session_id().clone())
            })?;

        Ok(Self::new(
            view.session_id().clone(),
            view.board().encode_rows(),
            board_size,
            view.player_a().clone(),
            view.player_b().clone(),
            view.winner().clone(),
            outcome.label().to_string(),
            move_count,
            view.started_at().naive_utc(),
            (*view.last_move_at()).map(|t| t.naive_utc()),
        ))
    }
}

//! Archive error types.

use crate::session::SessionId;
use derive_more::{Display, Error};
use std::fmt;
use tracing::instrument;

/// What went wrong while archiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ArchiveErrorKind {
    /// The snapshot has no outcome yet.
    #[display("unfinished")]
    Unfinished,
    /// The session already has an archive record.
    #[display("already archived")]
    AlreadyArchived,
    /// The backing store failed.
    #[display("storage")]
    Storage,
}

/// Archive failure with location tracking and the session it concerns.
#[derive(Debug, Clone, Error)]
pub struct ArchiveError {
    /// Failure category.
    pub kind: ArchiveErrorKind,
    /// Session being archived, when known.
    pub session_id: Option<SessionId>,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ArchiveError {
    /// Creates a storage error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ArchiveErrorKind::Storage, message)
    }

    /// Creates an error of the given kind with caller location tracking.
    #[track_caller]
    pub fn with_kind(kind: ArchiveErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            session_id: None,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Snapshot without an outcome.
    #[track_caller]
    pub fn unfinished(session_id: impl Into<SessionId>) -> Self {
        Self::with_kind(
            ArchiveErrorKind::Unfinished,
            "Cannot archive a session without an outcome",
        )
        .in_session(session_id)
    }

    /// Second archive attempt for one session.
    #[track_caller]
    pub fn already_archived(session_id: impl Into<SessionId>) -> Self {
        Self::with_kind(ArchiveErrorKind::AlreadyArchived, "Session already archived")
            .in_session(session_id)
    }

    /// Attaches the session id, keeping one set earlier.
    pub fn in_session(mut self, session_id: impl Into<SessionId>) -> Self {
        if self.session_id.is_none() {
            self.session_id = Some(session_id.into());
        }
        self
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Archive error ({})", self.kind)?;
        if let Some(session_id) = &self.session_id {
            write!(f, " for session {}", session_id)?;
        }
        write!(f, ": {} at {}:{}", self.message, self.file, self.line)
    }
}

impl From<diesel::result::Error> for ArchiveError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        let kind = match &err {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ArchiveErrorKind::AlreadyArchived
            }
            _ => ArchiveErrorKind::Storage,
        };
        Self::with_kind(kind, format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for ArchiveError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

//! In-process archive.

use crate::archive::{ArchiveError, GameArchive};
use crate::session::SessionView;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

/// Keeps archived snapshots in memory, in archive order.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    games: Arc<Mutex<Vec<SessionView>>>,
}

impl MemoryArchive {
    /// Creates an empty archive.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Archived snapshots, oldest first.
    pub fn games(&self) -> Vec<SessionView> {
        self.games
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of archived games.
    pub fn len(&self) -> usize {
        self.games.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when nothing has been archived.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GameArchive for MemoryArchive {
    fn archive(&self, view: &SessionView) -> Result<(), ArchiveError> {
        if view.outcome().is_none() {
            return Err(ArchiveError::unfinished(view.session_id().clone()));
        }
        let mut games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        if games.iter().any(|g| g.session_id() == view.session_id()) {
            return Err(ArchiveError::already_archived(view.session_id().clone()));
        }
        debug!(session_id = %view.session_id(), "Archiving in memory");
        games.push(view.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveErrorKind;
    use crate::{GameConfig, Session};
    use chrono::{DateTime, Utc};

    fn session() -> Session {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let mut session = Session::new("s1".into(), "alice".into(), &GameConfig::classic(), now);
        session.join("bob".into(), now).expect("join");
        session
    }

    #[test]
    fn test_unfinished_rejection_names_session() {
        let archive = MemoryArchive::new();
        let err = archive.archive(&session().snapshot()).expect_err("unfinished");
        assert_eq!(err.kind, ArchiveErrorKind::Unfinished);
        assert_eq!(err.session_id.as_deref(), Some("s1"));
        assert!(archive.is_empty());
    }

    #[test]
    fn test_second_archive_rejected() {
        let archive = MemoryArchive::new();
        let mut session = session();
        session.leave("bob", DateTime::<Utc>::UNIX_EPOCH).expect("seated");
        let view = session.snapshot();
        archive.archive(&view).expect("first archive");

        let err = archive.archive(&view).expect_err("duplicate");
        assert_eq!(err.kind, ArchiveErrorKind::AlreadyArchived);
        assert_eq!(err.session_id.as_deref(), Some("s1"));
        assert_eq!(archive.len(), 1);
    }
}

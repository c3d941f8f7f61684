//! Persistence for finished games.
//!
//! The engine calls [`GameArchive::archive`] exactly once for each session
//! that reaches a terminal phase, after the session lock is released.

mod error;
mod memory;
mod models;
mod schema; // Diesel generated schema - internal use only
mod sqlite;

pub use error::{ArchiveError, ArchiveErrorKind};
pub use memory::MemoryArchive;
pub use models::{FinishedGame, NewFinishedGame};
pub use sqlite::{MIGRATIONS, SqliteArchive};

use crate::session::SessionView;

/// Durable storage for finished sessions.
pub trait GameArchive: Send + Sync {
    /// Stores a terminal session snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the snapshot cannot be stored.
    fn archive(&self, view: &SessionView) -> Result<(), ArchiveError>;
}

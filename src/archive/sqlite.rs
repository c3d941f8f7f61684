//! SQLite archive for finished games.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::archive::{ArchiveError, FinishedGame, GameArchive, NewFinishedGame, schema};
use crate::session::SessionView;

/// Schema migrations bundled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Diesel-backed archive storing one row per finished session.
#[derive(Debug, Clone)]
pub struct SqliteArchive {
    db_path: String,
}

impl SqliteArchive {
    /// Creates an archive backed by the database at `db_path`.
    ///
    /// Does not touch the database; call [`SqliteArchive::migrate`] before
    /// first use.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Self {
        info!(path = %db_path, "Creating SqliteArchive");
        Self { db_path }
    }

    /// Opens the database at `db_path` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, ArchiveError> {
        let archive = Self::new(db_path);
        archive.migrate()?;
        Ok(archive)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, ArchiveError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path).map_err(|e| {
            ArchiveError::new(format!("Failed to connect to '{}': {}", self.db_path, e))
        })
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn migrate(&self) -> Result<(), ArchiveError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| ArchiveError::new(format!("Migrations failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Inserts a finished game row.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the session was already archived or a
    /// database error occurs.
    #[instrument(skip(self, row), fields(session_id = %row.session_id(), outcome = %row.outcome()))]
    pub fn record(&self, row: NewFinishedGame) -> Result<FinishedGame, ArchiveError> {
        debug!("Recording finished game");
        let mut conn = self.connection()?;

        let game = diesel::insert_into(schema::finished_games::table)
            .values(&row)
            .returning(FinishedGame::as_returning())
            .get_result(&mut conn)?;

        info!(
            row_id = game.id(),
            session_id = %game.session_id(),
            outcome = %game.outcome(),
            "Finished game recorded"
        );
        Ok(game)
    }

    /// Lists archived games, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_games(&self) -> Result<Vec<FinishedGame>, ArchiveError> {
        let mut conn = self.connection()?;
        let games = schema::finished_games::table
            .order(schema::finished_games::id.desc())
            .select(FinishedGame::as_select())
            .load(&mut conn)?;
        debug!(count = games.len(), "Finished games loaded");
        Ok(games)
    }

    /// Finds the archived row for a session. Returns `None` if not archived.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn find_by_session(&self, session_id: &str) -> Result<Option<FinishedGame>, ArchiveError> {
        let mut conn = self.connection()?;
        let game = schema::finished_games::table
            .filter(schema::finished_games::session_id.eq(session_id))
            .select(FinishedGame::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(game)
    }

    /// Lists games in which `player` held either seat, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn games_for_player(&self, player: &str) -> Result<Vec<FinishedGame>, ArchiveError> {
        use schema::finished_games::dsl;

        let mut conn = self.connection()?;
        let games = dsl::finished_games
            .filter(dsl::player_a.eq(player).or(dsl::player_b.eq(player)))
            .order(dsl::id.desc())
            .select(FinishedGame::as_select())
            .load(&mut conn)?;
        debug!(player, count = games.len(), "Player games loaded");
        Ok(games)
    }
}

impl GameArchive for SqliteArchive {
    fn archive(&self, view: &SessionView) -> Result<(), ArchiveError> {
        self.record(NewFinishedGame::from_view(view)?)
            .map(|_| ())
            .map_err(|e| e.in_session(view.session_id().clone()))
    }
}

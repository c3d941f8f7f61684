//! Boundary between the transport and the session engine.
//!
//! Commands mutate state under the session lock; events, archiving and
//! registry cleanup happen afterwards from the returned snapshot.

use crate::archive::GameArchive;
use crate::disconnect::DisconnectCoordinator;
use crate::games::tictactoe::Position;
use crate::notifier::{EventKind, GameEvent, Notifier};
use crate::registry::{Departure, JoinTicket, SessionRegistry};
use crate::session::{ConnectionId, PlayerId, SessionError, SessionId, SessionView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Command delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Find or open a game.
    Join {
        /// Connection issuing the command.
        connection: ConnectionId,
        /// Player joining.
        player: PlayerId,
    },
    /// Place a mark.
    Move {
        /// Connection issuing the command.
        connection: ConnectionId,
        /// Player moving.
        player: PlayerId,
        /// Target session.
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        /// Target cell.
        position: Position,
    },
    /// Leave the current game.
    Leave {
        /// Connection issuing the command.
        connection: ConnectionId,
        /// Player leaving.
        player: PlayerId,
    },
    /// The transport lost a connection.
    Disconnect {
        /// Connection that dropped.
        connection: ConnectionId,
    },
}

impl Command {
    /// Connection the command came from.
    pub fn connection(&self) -> &ConnectionId {
        match self {
            Command::Join { connection, .. }
            | Command::Move { connection, .. }
            | Command::Leave { connection, .. }
            | Command::Disconnect { connection } => connection,
        }
    }
}

/// Dispatches transport commands to the registry and reports the results.
#[derive(Clone)]
pub struct GameService {
    registry: SessionRegistry,
    connections: DisconnectCoordinator,
    notifier: Arc<dyn Notifier>,
    archive: Arc<dyn GameArchive>,
}

impl GameService {
    /// Creates a service owning `registry`.
    #[instrument(skip_all)]
    pub fn new(
        registry: SessionRegistry,
        notifier: Arc<dyn Notifier>,
        archive: Arc<dyn GameArchive>,
    ) -> Self {
        info!("Creating game service");
        let connections = DisconnectCoordinator::new(registry.clone());
        Self {
            registry,
            connections,
            notifier,
            archive,
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The connection binding table.
    pub fn connections(&self) -> &DisconnectCoordinator {
        &self.connections
    }

    /// Processes one command, turning a rejection into an `error` event for
    /// the requesting connection.
    #[instrument(skip(self))]
    pub fn handle(&self, command: Command) {
        let connection = command.connection().clone();
        let (session_id, result) = match command {
            Command::Join { connection, player } => (None, self.join(connection, player).map(|_| ())),
            Command::Move {
                connection,
                player,
                session_id,
                position,
            } => {
                let result = self
                    .make_move(&connection, &player, &session_id, position)
                    .map(|_| ());
                (Some(session_id), result)
            }
            Command::Leave { connection, player } => {
                let session_id = self.registry.session_for_player(&player);
                (session_id, self.leave(&connection, &player).map(|_| ()))
            }
            Command::Disconnect { connection } => {
                self.disconnect(&connection);
                (None, Ok(()))
            }
        };

        if let Err(e) = result {
            warn!(connection = %connection, error = %e, "Command rejected");
            self.notifier
                .publish(GameEvent::error(connection, session_id, &e));
        }
    }

    /// Matches `player` into a session and binds `connection` to the seat.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyJoining`] for a duplicate join.
    #[instrument(skip(self))]
    pub fn join(&self, connection: ConnectionId, player: PlayerId) -> Result<JoinTicket, SessionError> {
        let ticket = self.registry.request_join(player.clone())?;
        self.connections
            .bind(connection, ticket.session_id.clone(), player);
        self.notifier
            .publish(GameEvent::broadcast(EventKind::Joined, ticket.view.clone()));
        Ok(ticket)
    }

    /// Applies a move and finalizes the session if it ended.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session, or any
    /// rejection from [`Session::make_move`](crate::session::Session::make_move).
    /// Rejected moves publish nothing.
    #[instrument(skip(self))]
    pub fn make_move(
        &self,
        connection: &str,
        player: &str,
        session_id: &str,
        position: Position,
    ) -> Result<SessionView, SessionError> {
        let now = self.registry.clock().now();
        let view = self.registry.with_session(session_id, |session| {
            session
                .make_move(player, position, now)
                .map(|_| session.snapshot())
        })??;

        self.notifier
            .publish(GameEvent::broadcast(EventKind::Moved, view.clone()));
        if view.phase().is_terminal() {
            self.finish(&view);
        }
        Ok(view)
    }

    /// Removes `player` from their session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownPlayer`] if the player is not seated.
    #[instrument(skip(self))]
    pub fn leave(&self, connection: &str, player: &str) -> Result<Departure, SessionError> {
        let departure = self.registry.leave(player)?;
        self.connections.unbind(connection);
        self.connections.unbind_player(player);
        self.after_departure(&departure);
        Ok(departure)
    }

    /// Resolves a dropped connection. A connection without a binding is ignored.
    #[instrument(skip(self))]
    pub fn disconnect(&self, connection: &str) -> Option<Departure> {
        let departure = self.connections.on_disconnect(connection)?;
        self.after_departure(&departure);
        Some(departure)
    }

    /// Times out every session whose deadline has passed.
    #[instrument(skip(self))]
    pub fn sweep(&self) -> usize {
        let expired = self.registry.sweep_expired();
        for view in &expired {
            self.finish(view);
        }
        expired.len()
    }

    fn after_departure(&self, departure: &Departure) {
        self.notifier
            .publish(GameEvent::broadcast(EventKind::Left, departure.view.clone()));
        if departure.report.finished_now {
            self.finish(&departure.view);
        } else if departure.removed {
            self.connections.unbind_session(&departure.session_id);
            debug!(session_id = %departure.session_id, "Empty session dropped without archiving");
        }
    }

    /// Archives a session that just reached a terminal phase, announces it
    /// and drops it from the registry.
    fn finish(&self, view: &SessionView) {
        let session_id = view.session_id();
        info!(
            session_id = %session_id,
            outcome = ?view.outcome(),
            winner = ?view.winner(),
            "Session finished"
        );
        if let Err(e) = self.archive.archive(view) {
            error!(session_id = %session_id, kind = %e.kind, error = %e, "Failed to archive finished game");
        }
        self.notifier
            .publish(GameEvent::broadcast(EventKind::GameOver, view.clone()));
        self.registry.remove(session_id);
        self.connections.unbind_session(session_id);
    }
}

//! Maps transport connections to seats so abrupt disconnects can be resolved.

use crate::registry::{Departure, SessionRegistry};
use crate::session::{ConnectionId, PlayerId, SessionId};
use derive_new::new;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// The seat a connection speaks for.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ConnectionBinding {
    /// Session the connection joined.
    pub session_id: SessionId,
    /// Player the connection acts as.
    pub player_id: PlayerId,
}

/// Connection → seat lookup table.
///
/// Not authoritative game state: a missing binding only means there is
/// nothing to resolve when the connection drops.
#[derive(Debug, Clone)]
pub struct DisconnectCoordinator {
    registry: SessionRegistry,
    bindings: Arc<Mutex<HashMap<ConnectionId, ConnectionBinding>>>,
}

impl DisconnectCoordinator {
    /// Creates a coordinator resolving disconnects against `registry`.
    #[instrument(skip(registry))]
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            bindings: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn bindings(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionBinding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `connection` to a seat, replacing any previous binding.
    #[instrument(skip(self))]
    pub fn bind(&self, connection: ConnectionId, session_id: SessionId, player_id: PlayerId) {
        debug!("Binding connection");
        if let Some(previous) = self
            .bindings()
            .insert(connection, ConnectionBinding::new(session_id, player_id))
        {
            warn!(?previous, "Connection was already bound");
        }
    }

    /// Drops the binding of `connection`. Unknown connections are ignored.
    #[instrument(skip(self))]
    pub fn unbind(&self, connection: &str) -> Option<ConnectionBinding> {
        self.bindings().remove(connection)
    }

    /// Drops every binding to `session_id`.
    #[instrument(skip(self))]
    pub fn unbind_session(&self, session_id: &str) -> usize {
        let mut bindings = self.bindings();
        let before = bindings.len();
        bindings.retain(|_, binding| binding.session_id != session_id);
        before - bindings.len()
    }

    /// Drops every binding for `player_id`.
    #[instrument(skip(self))]
    pub fn unbind_player(&self, player_id: &str) -> usize {
        let mut bindings = self.bindings();
        let before = bindings.len();
        bindings.retain(|_, binding| binding.player_id != player_id);
        before - bindings.len()
    }

    /// Current binding of `connection`.
    pub fn binding(&self, connection: &str) -> Option<ConnectionBinding> {
        self.bindings().get(connection).cloned()
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.bindings().len()
    }

    /// Returns true when no connection is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a dropped connection.
    ///
    /// Leaves the bound seat; the registry removes the session once no player
    /// remains. Returns `None` when the connection had no binding or its
    /// session is already gone, which happens when the disconnect follows a
    /// normal leave or game end.
    #[instrument(skip(self))]
    pub fn on_disconnect(&self, connection: &str) -> Option<Departure> {
        let Some(binding) = self.unbind(connection) else {
            debug!("Disconnect without binding");
            return None;
        };

        match self
            .registry
            .leave_session(&binding.session_id, &binding.player_id)
        {
            Ok(departure) => {
                info!(
                    session_id = %departure.session_id,
                    player = %departure.player_id,
                    remaining = departure.report.remaining_players,
                    removed = departure.removed,
                    "Disconnect resolved"
                );
                if departure.removed {
                    self.unbind_session(&departure.session_id);
                }
                Some(departure)
            }
            Err(e) => {
                debug!(error = %e, "Disconnect for a session that is already gone");
                None
            }
        }
    }
}

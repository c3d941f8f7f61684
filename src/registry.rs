//! Concurrent directory of live sessions with single-slot FIFO matchmaking.

use crate::clock::{Clock, SystemClock};
use crate::config::GameConfig;
use crate::games::tictactoe::Mark;
use crate::session::{
    LeaveReport, PlayerId, Session, SessionError, SessionId, SessionView, new_session_id,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a successful join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTicket {
    /// Session the player was placed in.
    pub session_id: SessionId,
    /// Mark the player plays.
    pub mark: Mark,
    /// Snapshot right after the join.
    pub view: SessionView,
}

/// A player's departure from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Session the player left.
    pub session_id: SessionId,
    /// Player who left.
    pub player_id: PlayerId,
    /// What the session reported.
    pub report: LeaveReport,
    /// Snapshot right after the departure.
    pub view: SessionView,
    /// True when the session was removed because nobody remains.
    pub removed: bool,
}

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, Arc<Mutex<Session>>>,
    /// Session with only player A seated, at most one.
    waiting: Option<SessionId>,
    /// Seat index used to resolve commands that carry only a player id.
    seats: HashMap<PlayerId, SessionId>,
}

/// Manages all live game sessions.
///
/// Cloning yields another handle to the same registry. The waiting slot,
/// session map and seat index change together under one lock. Each session
/// has its own lock, always taken after the registry lock when both are held,
/// so mutations of different sessions run in parallel while mutations of one
/// session are serialized.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    config: GameConfig,
    clock: Arc<dyn Clock>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Panics on a broken session invariant. [`run_stdio`](crate::run_stdio)
/// re-raises the panic instead of serving the poisoned session again.
fn enforce_invariants(session: &Session) {
    if let Err(violation) = session.check_invariants() {
        error!(%violation, "Session invariant violated");
        panic!("{}", violation);
    }
}

impl SessionRegistry {
    /// Creates an empty registry using wall-clock time.
    #[instrument(skip(config))]
    pub fn new(config: GameConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty registry reading time from `clock`.
    #[instrument(skip(config, clock))]
    pub fn with_clock(config: GameConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            board_size = config.board_size(),
            run_length = config.run_length(),
            "Creating session registry"
        );
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::default())),
            config,
            clock,
        }
    }

    /// Configuration applied to new sessions.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The registry's time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Matches `player` with the waiting session or opens a new one.
    ///
    /// If a waiting session exists, `player` becomes its player B, the slot is
    /// cleared and the game starts. Otherwise a new session is created with
    /// `player` as player A and parked in the waiting slot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyJoining`] if `player` holds any seat in a
    /// live session: player A parked in the waiting slot, or either seat of a
    /// game in progress. A player id maps to at most one seat, which is what
    /// [`leave`](Self::leave) resolves.
    #[instrument(skip(self))]
    pub fn request_join(&self, player: PlayerId) -> Result<JoinTicket, SessionError> {
        let now = self.clock.now();
        let mut inner = lock(&self.inner);

        if let Some(existing) = inner.seats.get(&player) {
            warn!(player = %player, session_id = %existing, "Duplicate join");
            return Err(SessionError::AlreadyJoining(player));
        }

        if let Some(waiting_id) = inner.waiting.take() {
            if let Some(handle) = inner.sessions.get(&waiting_id).cloned() {
                let mut session = lock(&handle);
                match session.join(player.clone(), now) {
                    Ok(mark) => {
                        enforce_invariants(&session);
                        let view = session.snapshot();
                        drop(session);
                        inner.seats.insert(player.clone(), waiting_id.clone());
                        info!(player = %player, session_id = %waiting_id, "Matched into waiting session");
                        return Ok(JoinTicket {
                            session_id: waiting_id,
                            mark,
                            view,
                        });
                    }
                    Err(e) => {
                        warn!(session_id = %waiting_id, error = %e, "Discarding unjoinable waiting session");
                    }
                }
            } else {
                warn!(session_id = %waiting_id, "Waiting slot pointed at a removed session");
            }
        }

        let id = new_session_id();
        let session = Session::new(id.clone(), player.clone(), &self.config, now);
        let view = session.snapshot();
        inner.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        inner.waiting = Some(id.clone());
        inner.seats.insert(player.clone(), id.clone());
        info!(player = %player, session_id = %id, "Opened waiting session");

        Ok(JoinTicket {
            session_id: id,
            mark: Mark::X,
            view,
        })
    }

    fn handle(&self, id: &str) -> Result<Arc<Mutex<Session>>, SessionError> {
        lock(&self.inner).sessions.get(id).cloned().ok_or_else(|| {
            debug!(session_id = id, "Session not found");
            SessionError::NotFound(id.to_string())
        })
    }

    /// Returns a snapshot of the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<SessionView, SessionError> {
        let handle = self.handle(id)?;
        let session = lock(&handle);
        Ok(session.snapshot())
    }

    /// Runs `f` with exclusive access to the session, then re-checks its
    /// invariants.
    ///
    /// The registry lock is released before the session lock is taken, so a
    /// long `f` only blocks this one session. `f` must not call back into
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown id.
    #[instrument(skip(self, f))]
    pub fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, SessionError> {
        let handle = self.handle(id)?;
        let mut session = lock(&handle);
        let result = f(&mut session);
        enforce_invariants(&session);
        Ok(result)
    }

    /// Removes the session, clearing the waiting slot and seat index entries
    /// that point at it. Returns false if it was not registered.
    ///
    /// A session still open is closed first, so a mutation that obtained it
    /// before removal is rejected instead of applied.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = lock(&self.inner);
        let Some(handle) = inner.sessions.remove(id) else {
            debug!(session_id = id, "Remove of unknown session");
            return false;
        };
        if inner.waiting.as_deref() == Some(id) {
            inner.waiting = None;
        }
        inner.seats.retain(|_, session_id| session_id != id);
        lock(&handle).close();
        info!(session_id = id, remaining = inner.sessions.len(), "Session removed");
        true
    }

    /// Session in which `player` is seated.
    pub fn session_for_player(&self, player: &str) -> Option<SessionId> {
        lock(&self.inner).seats.get(player).cloned()
    }

    /// Applies [`Session::leave`] for `player` in `session_id`, removing the
    /// session once nobody remains.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for an unknown session,
    /// [`SessionError::UnknownPlayer`] if `player` is not seated there.
    #[instrument(skip(self))]
    pub fn leave_session(&self, session_id: &str, player: &str) -> Result<Departure, SessionError> {
        let now = self.clock.now();
        let (report, view) = self.with_session(session_id, |session| {
            session
                .leave(player, now)
                .map(|report| (report, session.snapshot()))
        })??;

        {
            let mut inner = lock(&self.inner);
            if inner.seats.get(player).map(String::as_str) == Some(session_id) {
                inner.seats.remove(player);
            }
        }

        let removed = report.remaining_players == 0 && self.remove(session_id);
        Ok(Departure {
            session_id: session_id.to_string(),
            player_id: player.to_string(),
            report,
            view,
            removed,
        })
    }

    /// Resolves `player`'s session and leaves it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownPlayer`] if `player` is not seated anywhere.
    #[instrument(skip(self))]
    pub fn leave(&self, player: &str) -> Result<Departure, SessionError> {
        let session_id = self
            .session_for_player(player)
            .ok_or_else(|| SessionError::UnknownPlayer(player.to_string()))?;
        self.leave_session(&session_id, player)
    }

    /// Checks deadlines of every session and returns snapshots of those that
    /// timed out during this sweep.
    #[instrument(skip(self))]
    pub fn sweep_expired(&self) -> Vec<SessionView> {
        let now = self.clock.now();
        let handles: Vec<_> = lock(&self.inner).sessions.values().cloned().collect();
        let expired: Vec<_> = handles
            .iter()
            .filter_map(|handle| {
                let mut session = lock(handle);
                let outcome = session.check_deadlines(now)?;
                enforce_invariants(&session);
                debug!(session_id = %session.id(), %outcome, "Sweep finished session");
                Some(session.snapshot())
            })
            .collect();
        if !expired.is_empty() {
            info!(count = expired.len(), "Sweep found expired sessions");
        }
        expired
    }

    /// Id of the session waiting for a second player.
    pub fn waiting_session(&self) -> Option<SessionId> {
        lock(&self.inner).waiting.clone()
    }

    /// Lists all registered session ids.
    #[instrument(skip(self))]
    pub fn session_ids(&self) -> Vec<SessionId> {
        let ids: Vec<_> = lock(&self.inner).sessions.keys().cloned().collect();
        debug!(count = ids.len(), "Listed sessions");
        ids
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        lock(&self.inner).sessions.len()
    }

    /// Returns true when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

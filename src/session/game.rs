//! One game's state machine: board, seats, turn, clocks and outcome.

use super::error::{InvariantViolation, SessionError};
use super::state::{Outcome, Phase};
use super::view::SessionView;
use super::{PlayerId, SessionId};
use crate::config::GameConfig;
use crate::games::tictactoe::{Board, BoardOutcome, Mark, Position};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, instrument, warn};

/// `now + limit`, saturating at the latest representable instant.
fn deadline_after(now: DateTime<Utc>, limit: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(limit).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A player's seat in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Seat {
    id: PlayerId,
    present: bool,
}

impl Seat {
    fn new(id: PlayerId) -> Self {
        Self { id, present: true }
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// Mark that was placed.
    pub mark: Mark,
    /// Where it was placed.
    pub position: Position,
    /// Phase after the move. A `Finished` phase here means this move ended the game.
    pub phase: Phase,
}

/// Result of a player leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveReport {
    /// Phase after the departure.
    pub phase: Phase,
    /// Players still present.
    pub remaining_players: usize,
    /// True when this call moved the session into `Finished`.
    pub finished_now: bool,
}

/// A two-player game session.
///
/// All mutation goes through [`join`](Self::join), [`make_move`](Self::make_move),
/// [`leave`](Self::leave), [`check_deadlines`](Self::check_deadlines) and
/// [`close`](Self::close). Each takes the current time explicitly; deadlines
/// are only evaluated when one of these runs.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    board: Board,
    player_a: Seat,
    player_b: Option<Seat>,
    phase: Phase,
    move_count: u32,
    started_at: DateTime<Utc>,
    last_move_at: Option<DateTime<Utc>>,
    move_deadline: Option<DateTime<Utc>>,
    session_deadline: DateTime<Utc>,
    move_time_limit: TimeDelta,
}

impl Session {
    /// Creates a session with only player A seated.
    ///
    /// The session clock starts now; the move clock starts when player B joins.
    #[instrument(skip(config), fields(board_size = config.board_size()))]
    pub fn new(id: SessionId, player_a: PlayerId, config: &GameConfig, now: DateTime<Utc>) -> Self {
        info!(session_id = %id, player = %player_a, "Creating new game session");
        Self {
            id,
            board: Board::new(*config.board_size(), *config.run_length()),
            player_a: Seat::new(player_a),
            player_b: None,
            phase: Phase::WaitingForPlayer,
            move_count: 0,
            started_at: now,
            last_move_at: None,
            move_deadline: None,
            session_deadline: deadline_after(now, config.game_time_limit()),
            move_time_limit: config.move_time_limit(),
        }
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Player A's identity.
    pub fn player_a(&self) -> &PlayerId {
        &self.player_a.id
    }

    /// Player B's identity, once joined.
    pub fn player_b(&self) -> Option<&PlayerId> {
        self.player_b.as_ref().map(|s| &s.id)
    }

    /// Mark played by `player`, if seated.
    pub fn mark_of(&self, player: &str) -> Option<Mark> {
        if self.player_a.id == player {
            Some(Mark::X)
        } else if self.player_b.as_ref().is_some_and(|s| s.id == player) {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// Identity of the player using `mark`.
    pub fn player_for(&self, mark: Mark) -> Option<&PlayerId> {
        match mark {
            Mark::X => Some(&self.player_a.id),
            Mark::O => self.player_b(),
        }
    }

    /// Identity of the player holding the turn.
    pub fn turn_holder(&self) -> Option<&PlayerId> {
        self.phase.turn().and_then(|mark| self.player_for(mark))
    }

    /// Number of seated players who have not left.
    pub fn remaining_players(&self) -> usize {
        let b = self.player_b.as_ref().is_some_and(|s| s.present);
        usize::from(self.player_a.present) + usize::from(b)
    }

    /// Seats `player` as player B and starts the game with X to move.
    ///
    /// # Errors
    ///
    /// - [`SessionError::GameOver`] if the session has ended
    /// - [`SessionError::AlreadyJoining`] if `player` is player A
    /// - [`SessionError::Full`] if player B is already seated
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn join(&mut self, player: PlayerId, now: DateTime<Utc>) -> Result<Mark, SessionError> {
        if self.phase.is_closed() {
            warn!(player = %player, phase = %self.phase, "Join on closed session");
            return Err(SessionError::GameOver);
        }
        if self.player_a.id == player {
            warn!(player = %player, "Player A tried to join own session");
            return Err(SessionError::AlreadyJoining(player));
        }
        if self.player_b.is_some() {
            warn!(player = %player, "Session already has 2 players");
            return Err(SessionError::Full);
        }

        info!(player = %player, mark = "O", "Registering player as O");
        self.player_b = Some(Seat::new(player));
        self.phase = Phase::Turn { mark: Mark::X };
        self.move_deadline = Some(deadline_after(now, self.move_time_limit));
        Ok(Mark::O)
    }

    /// Places the mover's mark at `position` and advances the game.
    ///
    /// After placing, the board is scanned for a run or a tie and the
    /// deadlines are checked with the turn already passed to the opponent.
    /// An elapsed deadline therefore ends the game as a timeout lost by the
    /// side that did not make this move, overriding any board result.
    ///
    /// # Errors
    ///
    /// Checked in order: [`SessionError::GameOver`],
    /// [`SessionError::WaitingForOpponent`], [`SessionError::UnknownPlayer`],
    /// [`SessionError::NotYourTurn`], [`SessionError::InvalidPosition`],
    /// [`SessionError::CellOccupied`]. A rejected move changes nothing.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn make_move(
        &mut self,
        player: &str,
        position: Position,
        now: DateTime<Utc>,
    ) -> Result<MoveReport, SessionError> {
        let turn = match self.phase {
            Phase::Finished { .. } | Phase::Abandoned => return Err(SessionError::GameOver),
            Phase::WaitingForPlayer => return Err(SessionError::WaitingForOpponent),
            Phase::Turn { mark } => mark,
        };

        let mark = self.mark_of(player).ok_or_else(|| {
            warn!(player, "Unknown player attempted move");
            SessionError::UnknownPlayer(player.to_string())
        })?;

        if mark != turn {
            warn!(player, expected_mark = %turn, player_mark = %mark, "Player tried to move out of turn");
            return Err(SessionError::NotYourTurn(player.to_string()));
        }

        if !self.board.contains(position) {
            warn!(player, %position, "Move outside the board");
            return Err(SessionError::InvalidPosition(position));
        }

        if !self.board.place(position.row(), position.col(), mark) {
            warn!(player, %position, "Cell already occupied");
            return Err(SessionError::CellOccupied(position));
        }

        self.move_count += 1;
        self.last_move_at = Some(now);

        self.phase = match self.board.check_outcome() {
            BoardOutcome::Win(winner) => Phase::Finished {
                outcome: Outcome::Win { mark: winner },
            },
            BoardOutcome::Tie => Phase::Finished {
                outcome: Outcome::Tie,
            },
            BoardOutcome::None => Phase::Turn {
                mark: mark.opponent(),
            },
        };

        if self.deadline_elapsed(now) {
            info!(loser = %mark.opponent(), "Deadline elapsed during move");
            self.phase = Phase::Finished {
                outcome: Outcome::Timeout {
                    loser: mark.opponent(),
                },
            };
        }

        if matches!(self.phase, Phase::Turn { .. }) {
            self.move_deadline = Some(deadline_after(now, self.move_time_limit));
        } else {
            info!(phase = %self.phase, moves = self.move_count, "Game finished");
        }

        debug!(player, %position, phase = %self.phase, "Move completed successfully");
        Ok(MoveReport {
            mark,
            position,
            phase: self.phase,
        })
    }

    /// Marks `player` as gone.
    ///
    /// Deadlines are checked first. If the game is still in play and the
    /// opponent remains, the opponent wins. A waiting session left by its only
    /// player becomes `Abandoned`. Leaving twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownPlayer`] if `player` holds no seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn leave(&mut self, player: &str, now: DateTime<Utc>) -> Result<LeaveReport, SessionError> {
        let mark = self
            .mark_of(player)
            .ok_or_else(|| SessionError::UnknownPlayer(player.to_string()))?;

        let mut finished_now = self.check_deadlines(now).is_some();

        let seat = match mark {
            Mark::X => Some(&mut self.player_a),
            Mark::O => self.player_b.as_mut(),
        };
        if let Some(seat) = seat {
            if !seat.present {
                debug!(player, "Player already left");
            }
            seat.present = false;
        }

        match self.phase {
            Phase::Turn { .. } => {
                let winner = mark.opponent();
                info!(player, winner = %winner, "Player left, opponent wins");
                self.phase = Phase::Finished {
                    outcome: Outcome::Win { mark: winner },
                };
                finished_now = true;
            }
            Phase::WaitingForPlayer => {
                info!(player, "Waiting player left");
                self.phase = Phase::Abandoned;
            }
            Phase::Finished { .. } | Phase::Abandoned => {}
        }

        Ok(LeaveReport {
            phase: self.phase,
            remaining_players: self.remaining_players(),
            finished_now,
        })
    }

    /// Ends an in-play game as a timeout if either deadline has passed.
    ///
    /// The side holding the turn loses. Returns the outcome when this call
    /// finished the game.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn check_deadlines(&mut self, now: DateTime<Utc>) -> Option<Outcome> {
        let turn = self.phase.turn()?;
        if !self.deadline_elapsed(now) {
            return None;
        }
        let outcome = Outcome::Timeout { loser: turn };
        info!(loser = %turn, "Deadline elapsed");
        self.phase = Phase::Finished { outcome };
        Some(outcome)
    }

    /// Moves an open session to `Abandoned`. Returns false if already closed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn close(&mut self) -> bool {
        if self.phase.is_closed() {
            return false;
        }
        debug!(phase = %self.phase, "Closing session");
        self.phase = Phase::Abandoned;
        true
    }

    fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        let move_expired = self.move_deadline.is_some_and(|deadline| now > deadline);
        move_expired || now > self.session_deadline
    }

    /// Identity of the winning player, if the outcome names one.
    pub fn winner(&self) -> Option<&PlayerId> {
        self.phase
            .outcome()
            .and_then(|o| o.winner())
            .and_then(|mark| self.player_for(mark))
    }

    /// Copies the current state into an immutable view.
    pub fn snapshot(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            board: self.board.clone(),
            player_a: self.player_a.id.clone(),
            player_b: self.player_b().cloned(),
            turn: self.turn_holder().cloned(),
            phase: self.phase,
            outcome: self.phase.outcome(),
            winner: self.winner().cloned(),
            remaining_players: self.remaining_players(),
            move_count: self.move_count,
            started_at: self.started_at,
            last_move_at: self.last_move_at,
            move_deadline: self.move_deadline,
            session_deadline: self.session_deadline,
        }
    }

    /// Verifies the structural invariants of the session.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |description: &str| -> Result<(), InvariantViolation> {
            Err(InvariantViolation::new(self.id.clone(), description))
        };

        let x = self.board.count(Mark::X);
        let o = self.board.count(Mark::O);
        if x + o != self.move_count as usize {
            return violation("marks on board differ from accepted moves");
        }
        if x != o && x != o + 1 {
            return violation("marks are not alternating");
        }

        match self.phase {
            Phase::WaitingForPlayer => {
                if self.player_b.is_some() || self.move_count != 0 {
                    return violation("waiting session has an opponent or moves");
                }
            }
            Phase::Turn { mark } => {
                if self.remaining_players() != 2 {
                    return violation("game in play without two present players");
                }
                let expected = if x == o { Mark::X } else { Mark::O };
                if mark != expected {
                    return violation("turn does not follow move count");
                }
            }
            Phase::Finished { .. } | Phase::Abandoned => {}
        }

        if !self.phase.is_closed() && self.remaining_players() == 0 {
            return violation("open session has no players");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn active_session() -> Session {
        let mut session = Session::new("s1".into(), "alice".into(), &GameConfig::classic(), start());
        session.join("bob".into(), start()).expect("join");
        session
    }

    #[test]
    fn test_new_session_waits_for_player() {
        let session = Session::new("s1".into(), "alice".into(), &GameConfig::classic(), start());
        assert_eq!(session.phase(), Phase::WaitingForPlayer);
        assert_eq!(session.remaining_players(), 1);
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn test_unbounded_limits_saturate_deadlines() {
        let config = GameConfig::classic()
            .with_move_time_limit_secs(u64::MAX)
            .with_game_time_limit_secs(10_000_000_000_000);
        let mut session = Session::new("s1".into(), "alice".into(), &config, start());
        assert_eq!(session.session_deadline, DateTime::<Utc>::MAX_UTC);
        session.join("bob".into(), start()).expect("join");
        assert_eq!(session.move_deadline, Some(DateTime::<Utc>::MAX_UTC));

        let later = start() + TimeDelta::days(10_000);
        session
            .make_move("alice", Position::new(0, 0), later)
            .expect("legal move");
        assert_eq!(session.phase(), Phase::Turn { mark: Mark::O });
    }

    #[test]
    fn test_join_starts_game() {
        let session = active_session();
        assert_eq!(session.phase(), Phase::Turn { mark: Mark::X });
        assert_eq!(session.turn_holder().map(String::as_str), Some("alice"));
        assert_eq!(session.mark_of("bob"), Some(Mark::O));
    }

    #[test]
    fn test_third_player_rejected() {
        let mut session = active_session();
        assert_eq!(session.join("carol".into(), start()), Err(SessionError::Full));
    }

    #[test]
    fn test_rejected_move_changes_nothing() {
        let mut session = active_session();
        let before = session.snapshot();
        assert_eq!(
            session.make_move("bob", Position::new(0, 0), start()),
            Err(SessionError::NotYourTurn("bob".into()))
        );
        assert_eq!(
            session.make_move("alice", Position::new(3, 0), start()),
            Err(SessionError::InvalidPosition(Position::new(3, 0)))
        );
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_move_rearms_deadline() {
        let mut session = active_session();
        let later = start() + TimeDelta::seconds(10);
        session
            .make_move("alice", Position::new(1, 1), later)
            .expect("move");
        assert_eq!(
            *session.snapshot().move_deadline(),
            Some(later + TimeDelta::seconds(30))
        );
    }

    #[test]
    fn test_close_is_absorbing() {
        let mut session = active_session();
        assert!(session.close());
        assert!(!session.close());
        assert_eq!(
            session.make_move("alice", Position::new(0, 0), start()),
            Err(SessionError::GameOver)
        );
    }
}

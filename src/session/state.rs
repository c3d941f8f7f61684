//! Session phases and outcomes.

use crate::games::tictactoe::Mark;
use serde::{Deserialize, Serialize};

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outcome {
    /// The mark completed a run or the opponent left.
    Win {
        /// Winning mark.
        mark: Mark,
    },
    /// Board filled with no run.
    Tie,
    /// A deadline elapsed while `loser` held the turn.
    Timeout {
        /// Side that ran out of time.
        loser: Mark,
    },
}

impl Outcome {
    /// Returns the winning mark, if the outcome has one.
    pub fn winner(&self) -> Option<Mark> {
        match self {
            Outcome::Win { mark } => Some(*mark),
            Outcome::Tie => None,
            Outcome::Timeout { loser } => Some(loser.opponent()),
        }
    }

    /// Short label stored alongside archived games.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Win { mark: Mark::X } => "x_wins",
            Outcome::Win { mark: Mark::O } => "o_wins",
            Outcome::Tie => "tie",
            Outcome::Timeout { .. } => "timeout",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win { mark } => write!(f, "{} wins", mark),
            Outcome::Tie => write!(f, "Tie"),
            Outcome::Timeout { loser } => write!(f, "{} ran out of time", loser),
        }
    }
}

/// Lifecycle of a session.
///
/// ```text
/// WaitingForPlayer ──join──> Turn(X) <──move──> Turn(O)
///        │                      │                  │
///        │ leave                └──── move/leave ──┴──> Finished(outcome)
///        v
///    Abandoned
/// ```
///
/// `Finished` and `Abandoned` are absorbing. Only `Finished` carries an
/// outcome, so a session with an outcome is always terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum Phase {
    /// Only player A is seated.
    WaitingForPlayer,
    /// Both players seated; `mark` is to move.
    Turn {
        /// Mark whose turn it is.
        mark: Mark,
    },
    /// Game over.
    Finished {
        /// How the game ended.
        outcome: Outcome,
    },
    /// Every player left before an outcome existed.
    Abandoned,
}

impl Phase {
    /// Returns true once no further mutation is accepted.
    pub fn is_closed(&self) -> bool {
        matches!(self, Phase::Finished { .. } | Phase::Abandoned)
    }

    /// Returns true for a finished game with an outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finished { .. })
    }

    /// Returns the outcome of a finished game.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Phase::Finished { outcome } => Some(*outcome),
            _ => None,
        }
    }

    /// Returns the mark on move during play.
    pub fn turn(&self) -> Option<Mark> {
        match self {
            Phase::Turn { mark } => Some(*mark),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::WaitingForPlayer => write!(f, "waiting for player"),
            Phase::Turn { mark } => write!(f, "{} to move", mark),
            Phase::Finished { outcome } => write!(f, "finished: {}", outcome),
            Phase::Abandoned => write!(f, "abandoned"),
        }
    }
}

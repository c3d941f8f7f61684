//! Strictly Sessions - concurrent session engine for two-player board games
//!
//! Matches waiting players into games, validates moves, detects wins, ties
//! and timeouts, and drives each game to a terminal state exactly once while
//! many clients issue commands concurrently.
//!
//! # Architecture
//!
//! - **Board**: N×N grid with K-in-a-row win and tie detection
//! - **Session**: one game's state machine (seats, turn, clocks, outcome)
//! - **Registry**: concurrent session directory with FIFO matchmaking
//! - **Disconnect**: connection → seat table resolving dropped connections
//! - **Service**: transport-facing dispatcher that publishes events and
//!   archives finished games
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strictly_sessions::{
//!     BroadcastNotifier, GameConfig, GameService, MemoryArchive, Position, SessionRegistry,
//! };
//!
//! # fn example() -> Result<(), strictly_sessions::SessionError> {
//! let registry = SessionRegistry::new(GameConfig::classic());
//! let service = GameService::new(
//!     registry,
//!     Arc::new(BroadcastNotifier::new(16)),
//!     Arc::new(MemoryArchive::new()),
//! );
//!
//! let ticket = service.join("conn-a".into(), "alice".into())?;
//! service.join("conn-b".into(), "bob".into())?;
//! service.make_move("conn-a", "alice", &ticket.session_id, Position::new(1, 1))?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod archive;
mod clock;
mod config;
mod disconnect;
mod games;
mod notifier;
mod registry;
mod service;
mod session;
mod transport;

// Crate-level exports - Board
pub use games::tictactoe::{Board, BoardOutcome, Cell, Mark, Position, rules};

// Crate-level exports - Sessions
pub use session::{
    ConnectionId, ErrorKind, InvariantViolation, LeaveReport, MoveReport, Outcome, Phase, PlayerId,
    Session, SessionError, SessionId, SessionView, new_session_id,
};

// Crate-level exports - Registry and disconnects
pub use disconnect::{ConnectionBinding, DisconnectCoordinator};
pub use registry::{Departure, JoinTicket, SessionRegistry};

// Crate-level exports - Boundary
pub use notifier::{BroadcastNotifier, EventKind, GameEvent, Notifier, Recipient};
pub use service::{Command, GameService};
pub use transport::{parse_command, render_event, run_stdio};

// Crate-level exports - Persistence
pub use archive::{
    ArchiveError, ArchiveErrorKind, FinishedGame, GameArchive, MIGRATIONS, MemoryArchive, NewFinishedGame,
    SqliteArchive,
};

// Crate-level exports - Configuration and time
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GameConfig, MAX_BOARD_SIZE, MAX_TIME_LIMIT_SECS};

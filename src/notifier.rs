//! Outbound events handed to the transport.

use crate::session::{ConnectionId, ErrorKind, SessionError, SessionId, SessionView};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    /// A player joined a session.
    Joined,
    /// A move was accepted.
    Moved,
    /// A player left or disconnected.
    Left,
    /// The session reached a terminal phase.
    GameOver,
    /// A command was rejected.
    Error {
        /// Error classification.
        kind: ErrorKind,
        /// Human-readable reason.
        reason: String,
    },
}

/// Who should receive an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "id", rename_all = "camelCase")]
pub enum Recipient {
    /// Only the requesting connection.
    Connection(ConnectionId),
    /// Everyone subscribed to the session.
    Session(SessionId),
}

/// Event published after a command is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    /// What happened.
    pub kind: EventKind,
    /// Who it is for.
    pub recipient: Recipient,
    /// Session the event concerns, when known.
    pub session_id: Option<SessionId>,
    /// Snapshot after the change.
    pub view: Option<SessionView>,
}

impl GameEvent {
    /// Broadcast of a session snapshot to the session's subscribers.
    pub fn broadcast(kind: EventKind, view: SessionView) -> Self {
        let session_id = view.session_id().clone();
        Self {
            kind,
            recipient: Recipient::Session(session_id.clone()),
            session_id: Some(session_id),
            view: Some(view),
        }
    }

    /// Rejection addressed to the requesting connection.
    pub fn error(
        connection: ConnectionId,
        session_id: Option<SessionId>,
        error: &SessionError,
    ) -> Self {
        Self {
            kind: EventKind::Error {
                kind: error.kind(),
                reason: error.to_string(),
            },
            recipient: Recipient::Connection(connection),
            session_id,
            view: None,
        }
    }

    /// Returns true for events addressed to a whole session.
    pub fn is_broadcast(&self) -> bool {
        matches!(self.recipient, Recipient::Session(_))
    }
}

/// Sink for outbound events, implemented by the transport.
///
/// Called after session locks are released; implementations must not block
/// on the registry.
pub trait Notifier: Send + Sync {
    /// Publishes one event.
    fn publish(&self, event: GameEvent);
}

/// Fan-out notifier over a `tokio` broadcast channel.
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// publishers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<GameEvent>,
}

impl BroadcastNotifier {
    /// Creates a channel buffering `capacity` events per subscriber.
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: GameEvent) {
        trace!(kind = ?event.kind, "Publishing event");
        if self.sender.send(event).is_err() {
            debug!("No subscribers for event");
        }
    }
}

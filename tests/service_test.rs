//! Tests for command dispatch, events and archiving.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::TimeDelta;
use strictly_sessions::{
    BroadcastNotifier, Command, ErrorKind, EventKind, GameConfig, GameEvent, GameService,
    ManualClock, Mark, MemoryArchive, Outcome, Position, Recipient, SessionError,
    SessionRegistry,
};
use tokio::sync::broadcast::Receiver;

struct Harness {
    service: GameService,
    events: Receiver<GameEvent>,
    archive: MemoryArchive,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::default());
    let notifier = BroadcastNotifier::new(64);
    let events = notifier.subscribe();
    let archive = MemoryArchive::new();
    let service = GameService::new(
        SessionRegistry::with_clock(GameConfig::classic(), clock.clone()),
        Arc::new(notifier),
        Arc::new(archive.clone()),
    );
    Harness {
        service,
        events,
        archive,
        clock,
    }
}

fn drain(events: &mut Receiver<GameEvent>) -> Vec<GameEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

fn join_pair(h: &Harness) -> String {
    let ticket = h
        .service
        .join("conn-a".into(), "alice".into())
        .expect("join");
    h.service.join("conn-b".into(), "bob".into()).expect("join");
    ticket.session_id
}

#[test]
fn test_full_game_archives_once() {
    let mut h = harness();
    let session_id = join_pair(&h);

    for (conn, player, row, col) in [
        ("conn-a", "alice", 0, 0),
        ("conn-b", "bob", 1, 1),
        ("conn-a", "alice", 0, 1),
        ("conn-b", "bob", 1, 0),
        ("conn-a", "alice", 0, 2),
    ] {
        h.service
            .make_move(conn, player, &session_id, Position::new(row, col))
            .expect("legal move");
    }

    let archived = h.archive.games();
    assert_eq!(archived.len(), 1);
    assert_eq!(*archived[0].outcome(), Some(Outcome::Win { mark: Mark::X }));
    assert_eq!(archived[0].winner().as_deref(), Some("alice"));

    let kinds: Vec<_> = drain(&mut h.events).into_iter().map(|e| e.kind).collect();
    let expected = [
        vec![EventKind::Joined; 2],
        vec![EventKind::Moved; 5],
        vec![EventKind::GameOver],
    ]
    .concat();
    assert_eq!(kinds, expected);

    assert!(h.service.registry().is_empty());
    assert!(h.service.connections().is_empty());
    assert_eq!(
        h.service
            .make_move("conn-b", "bob", &session_id, Position::new(2, 2))
            .map(|_| ()),
        Err(SessionError::NotFound(session_id))
    );
    assert_eq!(h.archive.len(), 1);
}

/// Races alice's winning move against bob dropping out, either by leaving or
/// by losing his connection.
fn race_winning_move_against_departure(by_disconnect: bool) {
    let h = harness();
    let session_id = join_pair(&h);
    for (conn, player, row, col) in [
        ("conn-a", "alice", 0, 0),
        ("conn-b", "bob", 1, 0),
        ("conn-a", "alice", 0, 1),
        ("conn-b", "bob", 1, 1),
    ] {
        h.service
            .make_move(conn, player, &session_id, Position::new(row, col))
            .expect("legal move");
    }

    let barrier = Barrier::new(2);
    thread::scope(|scope| {
        let mover = {
            let service = h.service.clone();
            let (barrier, session_id) = (&barrier, &session_id);
            scope.spawn(move || {
                barrier.wait();
                let _ = service.make_move("conn-a", "alice", session_id, Position::new(0, 2));
            })
        };
        let leaver = {
            let service = h.service.clone();
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                if by_disconnect {
                    service.disconnect("conn-b");
                } else {
                    let _ = service.leave("conn-b", "bob");
                }
            })
        };
        mover.join().expect("move thread panicked");
        leaver.join().expect("leave thread panicked");
    });

    let archived = h.archive.games();
    assert_eq!(archived.len(), 1, "a finished session is archived exactly once");
    assert_eq!(archived[0].session_id(), &session_id);
    assert_eq!(archived[0].winner().as_deref(), Some("alice"));

    let late = h
        .service
        .make_move("conn-a", "alice", &session_id, Position::new(2, 2));
    assert!(matches!(
        late,
        Err(SessionError::GameOver | SessionError::NotFound(_))
    ));
    assert!(h.service.registry().is_empty());
    assert_eq!(h.archive.len(), 1);
}

#[test]
fn test_leave_racing_winning_move_archives_once() {
    for _ in 0..50 {
        race_winning_move_against_departure(false);
    }
}

#[test]
fn test_disconnect_racing_winning_move_archives_once() {
    for _ in 0..50 {
        race_winning_move_against_departure(true);
    }
}

#[test]
fn test_move_on_unknown_session_reports_to_requester_only() {
    let mut h = harness();
    h.service.handle(Command::Move {
        connection: "conn-x".into(),
        player: "alice".into(),
        session_id: "nope".into(),
        position: Position::new(0, 0),
    });

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.recipient, Recipient::Connection("conn-x".into()));
    assert!(!event.is_broadcast());
    assert!(matches!(
        &event.kind,
        EventKind::Error { kind: ErrorKind::NotFound, .. }
    ));
    assert!(h.archive.is_empty());
}

#[test]
fn test_rejected_move_publishes_error_without_broadcast() {
    let mut h = harness();
    let session_id = join_pair(&h);
    drain(&mut h.events);

    h.service.handle(Command::Move {
        connection: "conn-b".into(),
        player: "bob".into(),
        session_id: session_id.clone(),
        position: Position::new(0, 0),
    });

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].session_id.as_deref(), Some(session_id.as_str()));
    assert!(matches!(
        &events[0].kind,
        EventKind::Error { kind: ErrorKind::NotYourTurn, .. }
    ));
    let view = h.service.registry().get(&session_id).expect("still live");
    assert_eq!(*view.move_count(), 0);
}

#[test]
fn test_duplicate_join_command_is_rejected() {
    let mut h = harness();
    h.service.handle(Command::Join {
        connection: "conn-a".into(),
        player: "alice".into(),
    });
    h.service.handle(Command::Join {
        connection: "conn-a2".into(),
        player: "alice".into(),
    });

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::Joined);
    assert_eq!(events[1].recipient, Recipient::Connection("conn-a2".into()));
    assert!(matches!(
        &events[1].kind,
        EventKind::Error { kind: ErrorKind::AlreadyJoining, .. }
    ));
    assert_eq!(h.service.registry().len(), 1);
}

#[test]
fn test_timed_out_move_archives_timeout() {
    let mut h = harness();
    let session_id = join_pair(&h);
    h.service
        .make_move("conn-a", "alice", &session_id, Position::new(0, 0))
        .expect("legal move");

    h.clock.advance(TimeDelta::seconds(31));
    let view = h
        .service
        .make_move("conn-b", "bob", &session_id, Position::new(1, 1))
        .expect("applied");
    assert_eq!(*view.outcome(), Some(Outcome::Timeout { loser: Mark::X }));
    assert_eq!(view.winner().as_deref(), Some("bob"));

    assert_eq!(h.archive.len(), 1);
    let last = drain(&mut h.events).pop().expect("events published");
    assert_eq!(last.kind, EventKind::GameOver);
}

#[test]
fn test_sweep_finalizes_idle_game() {
    let h = harness();
    let session_id = join_pair(&h);

    assert_eq!(h.service.sweep(), 0);
    h.clock.advance(TimeDelta::seconds(31));
    assert_eq!(h.service.sweep(), 1);
    assert_eq!(h.service.sweep(), 0);

    let archived = h.archive.games();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].session_id(), &session_id);
    assert_eq!(archived[0].winner().as_deref(), Some("bob"));
    assert!(h.service.registry().is_empty());
}

#[test]
fn test_leave_command_forfeits() {
    let mut h = harness();
    let session_id = join_pair(&h);
    drain(&mut h.events);

    h.service.handle(Command::Leave {
        connection: "conn-a".into(),
        player: "alice".into(),
    });

    let kinds: Vec<_> = drain(&mut h.events).into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Left, EventKind::GameOver]);
    let archived = h.archive.games();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].session_id(), &session_id);
    assert_eq!(archived[0].winner().as_deref(), Some("bob"));
}

#[test]
fn test_leave_without_seat_reports_error() {
    let mut h = harness();
    h.service.handle(Command::Leave {
        connection: "conn-z".into(),
        player: "zed".into(),
    });
    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0].kind,
        EventKind::Error { kind: ErrorKind::UnknownPlayer, .. }
    ));
}

#[test]
fn test_event_wire_format() {
    let mut h = harness();
    h.service.handle(Command::Move {
        connection: "conn-x".into(),
        player: "alice".into(),
        session_id: "nope".into(),
        position: Position::new(0, 0),
    });
    let event = drain(&mut h.events).pop().expect("error event");
    let json = serde_json::to_value(&event).expect("serializable");
    assert_eq!(json["kind"]["type"], "error");
    assert_eq!(json["kind"]["kind"], "notFound");
    assert_eq!(json["recipient"]["to"], "connection");
    assert_eq!(json["recipient"]["id"], "conn-x");
    assert_eq!(json["sessionId"], "nope");
}

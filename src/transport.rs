//! JSON-lines transport over stdin/stdout.
//!
//! Each stdin line is one [`Command`]; each published [`GameEvent`] is
//! written to stdout as one line.

use crate::notifier::{BroadcastNotifier, GameEvent};
use crate::service::{Command, GameService};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinError;
use tracing::{debug, error, info, instrument, warn};

/// Parses one command line.
///
/// # Errors
///
/// Returns the JSON error for malformed input.
pub fn parse_command(line: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(line.trim())
}

/// Renders an event as one JSON line (without the newline).
///
/// # Errors
///
/// Returns the JSON error if serialization fails.
pub fn render_event(event: &GameEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Unwraps a finished task, re-raising its panic on the current thread.
///
/// A panic in the engine means a session invariant broke; serving further
/// commands from the same state is not allowed.
fn join_result<T>(joined: Result<T, JoinError>) -> std::io::Result<T> {
    match joined {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => {
            error!("Engine task panicked, stopping");
            std::panic::resume_unwind(e.into_panic())
        }
        Err(e) => Err(std::io::Error::other(e)),
    }
}

/// Runs `f` on the blocking pool.
async fn run_blocking<T, F>(f: F) -> std::io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    join_result(tokio::task::spawn_blocking(f).await)
}

async fn sweep_loop(service: GameService, period: Duration) -> std::io::Result<()> {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let service = service.clone();
        let count = run_blocking(move || service.sweep()).await?;
        if count > 0 {
            debug!(count, "Sweep finalized sessions");
        }
    }
}

async fn write_event(
    stdout: &mut tokio::io::Stdout,
    event: &GameEvent,
) -> std::io::Result<()> {
    match render_event(event) {
        Ok(line) => {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        }
        Err(e) => {
            warn!(error = %e, "Failed to render event");
            Ok(())
        }
    }
}

async fn pump_events(
    mut events: broadcast::Receiver<GameEvent>,
    mut shutdown: oneshot::Receiver<()>,
) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => write_event(&mut stdout, &event).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event writer lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
            _ = &mut shutdown => break,
        }
    }
    // Flush what was published before shutdown.
    while let Ok(event) = events.try_recv() {
        write_event(&mut stdout, &event).await?;
    }
    Ok(())
}

/// Serves commands from stdin until EOF.
///
/// Commands are applied one at a time on the blocking pool, since archiving
/// may touch the database. When `sweep_every` is set, expired sessions are
/// timed out on that period in addition to the lazy checks.
///
/// # Errors
///
/// Returns an I/O error if stdin or stdout fails.
///
/// # Panics
///
/// Re-raises a panic from a command or sweep, such as a broken session
/// invariant.
#[instrument(skip(service, notifier))]
pub async fn run_stdio(
    service: GameService,
    notifier: &BroadcastNotifier,
    sweep_every: Option<Duration>,
) -> std::io::Result<()> {
    let (stop_writer, shutdown) = oneshot::channel();
    let writer = tokio::spawn(pump_events(notifier.subscribe(), shutdown));

    let mut sweeper = sweep_every.map(|period| tokio::spawn(sweep_loop(service.clone(), period)));

    info!("Reading commands from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            Some(joined) = async {
                match sweeper.as_mut() {
                    Some(handle) => Some(handle.await),
                    None => None,
                }
            } => {
                // The sweep loop only ends on failure.
                join_result(joined)??;
                return Err(std::io::Error::other("sweep loop stopped"));
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, line = %line, "Skipping malformed command");
                continue;
            }
        };
        let service = service.clone();
        run_blocking(move || service.handle(command)).await?;
    }
    info!("Stdin closed, shutting down");

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    // The writer may already have stopped; nothing to signal then.
    let _ = stop_writer.send(());
    join_result(writer.await)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn test_parse_move_command() {
        let command = parse_command(
            r#"{"type":"move","connection":"c1","player":"alice","sessionId":"s1","position":{"row":0,"col":2}}"#,
        )
        .expect("valid command");
        assert_eq!(
            command,
            Command::Move {
                connection: "c1".into(),
                player: "alice".into(),
                session_id: "s1".into(),
                position: Position::new(0, 2),
            }
        );
    }

    #[test]
    fn test_parse_disconnect_command() {
        let command = parse_command(r#" {"type":"disconnect","connection":"c9"} "#).expect("valid");
        assert_eq!(command.connection(), "c9");
    }

    #[test]
    fn test_malformed_command_rejected() {
        assert!(parse_command(r#"{"type":"teleport"}"#).is_err());
    }

    #[tokio::test]
    async fn test_blocking_result_returned() {
        let value = run_blocking(|| 7).await.expect("task completes");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    #[should_panic(expected = "Session invariant violated")]
    async fn test_blocking_panic_is_reraised() {
        let _ = run_blocking(|| -> u32 { panic!("Session invariant violated: marks out of balance") })
            .await;
    }
}

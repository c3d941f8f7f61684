//! Strictly Sessions - Unified CLI
//!
//! Runs the session engine behind a JSON-lines stdio transport.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strictly_sessions::{
    BroadcastNotifier, GameArchive, GameConfig, GameService, MemoryArchive, SessionRegistry,
    SqliteArchive, run_stdio,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Stdio {
            config,
            db_path,
            sweep_secs,
        } => run_stdio_server(config.as_deref(), db_path, sweep_secs).await,
        Command::ShowConfig { config } => show_config(config.as_deref()),
    }
}

/// Stdout carries events, so logs go to stderr.
#[instrument]
fn initialize_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_sessions=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Tracing initialized");
}

#[instrument]
fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let config = match path {
        Some(path) => GameConfig::from_file(path)?,
        None => {
            info!("No config file given, using defaults");
            GameConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Run the engine over stdin/stdout
#[instrument]
async fn run_stdio_server(
    config_path: Option<&Path>,
    db_path: Option<String>,
    sweep_secs: Option<u64>,
) -> Result<()> {
    initialize_tracing();

    info!("Starting Strictly Sessions");
    let config = load_config(config_path)?;
    info!(
        board_size = config.board_size(),
        run_length = config.run_length(),
        move_time_limit_secs = config.move_time_limit_secs(),
        game_time_limit_secs = config.game_time_limit_secs(),
        "Game config loaded"
    );

    let archive: Arc<dyn GameArchive> = match db_path {
        Some(db_path) => Arc::new(SqliteArchive::open(db_path)?),
        None => {
            info!("No database given, finished games are kept in memory");
            Arc::new(MemoryArchive::new())
        }
    };

    let notifier = BroadcastNotifier::new(*config.event_capacity());
    let registry = SessionRegistry::new(config);
    let service = GameService::new(registry, Arc::new(notifier.clone()), archive);

    run_stdio(
        service,
        &notifier,
        sweep_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
    )
    .await?;

    info!("Shutdown complete");
    Ok(())
}

/// Print the effective config
fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

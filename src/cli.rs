//! Command-line interface for strictly_sessions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Sessions - concurrent two-player game session engine
#[derive(Parser, Debug)]
#[command(name = "strictly_sessions")]
#[command(about = "Session engine for N×N K-in-a-row games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve JSON-lines commands on stdin, writing events to stdout
    Stdio {
        /// Path to a TOML game config. Defaults are used when absent.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQLite database for finished games (created if it doesn't exist).
        /// Finished games are kept in memory when not provided.
        #[arg(long)]
        db_path: Option<String>,

        /// Seconds between deadline sweeps. Deadlines are still enforced
        /// lazily on every command when not provided.
        #[arg(long)]
        sweep_secs: Option<u64>,
    },

    /// Print the effective game config as TOML
    ShowConfig {
        /// Path to a TOML game config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

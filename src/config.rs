//! Game configuration: board geometry, clocks and event buffering.

use chrono::TimeDelta;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration shared by every session created by one registry.
///
/// Values are fixed for a session's lifetime; changing the registry's
/// configuration only affects sessions created afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct GameConfig {
    /// Side length of the square board.
    #[serde(default = "default_board_size")]
    board_size: usize,

    /// Consecutive marks required to win.
    #[serde(default = "default_run_length")]
    run_length: usize,

    /// Seconds a player has to make each move.
    #[serde(default = "default_move_time_limit_secs")]
    move_time_limit_secs: u64,

    /// Seconds the whole session may last.
    #[serde(default = "default_game_time_limit_secs")]
    game_time_limit_secs: u64,

    /// Buffered events per broadcast subscriber.
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
}

/// Largest accepted board side.
pub const MAX_BOARD_SIZE: usize = 1024;

/// Longest accepted move or session limit: one year.
pub const MAX_TIME_LIMIT_SECS: u64 = 365 * 24 * 60 * 60;

fn default_board_size() -> usize {
    20
}

fn default_run_length() -> usize {
    5
}

fn default_move_time_limit_secs() -> u64 {
    30
}

fn default_game_time_limit_secs() -> u64 {
    15 * 60
}

fn default_event_capacity() -> usize {
    256
}

fn secs_to_delta(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: default_board_size(),
            run_length: default_run_length(),
            move_time_limit_secs: default_move_time_limit_secs(),
            game_time_limit_secs: default_game_time_limit_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl GameConfig {
    /// Classic 3×3 board, three in a row.
    #[instrument]
    pub fn classic() -> Self {
        Self::default().with_board_size(3).with_run_length(3)
    }

    /// Loads configuration from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse, or
    /// fails [`GameConfig::validate`].
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(
            board_size = config.board_size,
            run_length = config.run_length,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a parse failure or an invalid value.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a session unplayable.
    ///
    /// A run length longer than the board is allowed; such a game can only tie.
    /// The board side is capped at [`MAX_BOARD_SIZE`] and both time limits at
    /// [`MAX_TIME_LIMIT_SECS`].
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size == 0 {
            return Err(ConfigError::new("board_size must be at least 1".to_string()));
        }
        if self.board_size > MAX_BOARD_SIZE {
            return Err(ConfigError::new(format!(
                "board_size must be at most {}",
                MAX_BOARD_SIZE
            )));
        }
        if self.run_length == 0 {
            return Err(ConfigError::new("run_length must be at least 1".to_string()));
        }
        if self.move_time_limit_secs == 0 || self.game_time_limit_secs == 0 {
            return Err(ConfigError::new("time limits must be positive".to_string()));
        }
        if self.move_time_limit_secs > MAX_TIME_LIMIT_SECS {
            return Err(ConfigError::new(format!(
                "move_time_limit_secs must be at most {}",
                MAX_TIME_LIMIT_SECS
            )));
        }
        if self.game_time_limit_secs > MAX_TIME_LIMIT_SECS {
            return Err(ConfigError::new(format!(
                "game_time_limit_secs must be at most {}",
                MAX_TIME_LIMIT_SECS
            )));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::new("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Per-move time limit.
    pub fn move_time_limit(&self) -> TimeDelta {
        secs_to_delta(self.move_time_limit_secs)
    }

    /// Whole-session time limit.
    pub fn game_time_limit(&self) -> TimeDelta {
        secs_to_delta(self.game_time_limit_secs)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render config: {}", e)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

//! Host configuration loaded from TOML.

use crate::actor::ActorSettings;
use crate::selfplay::SeriesLimits;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strictly_gomoku::{ConfigError, MatchConfig};
use tracing::{debug, info, instrument};

/// Environment variable that overrides the database path.
pub const DB_PATH_ENV: &str = "STRICTLY_ARENA_DB";

/// Players and limits for the `selfplay` command.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlaySettings {
    /// Player id of the first seat.
    first: String,
    /// Player id of the second seat.
    second: String,
    /// Seed for both agents' random streams.
    agent_seed: u64,
    /// Placements after which the side to move is timed out.
    max_moves_per_game: u32,
    /// Consecutive rejections before the side to move is timed out.
    max_rejections: u32,
}

impl Default for SelfPlaySettings {
    fn default() -> Self {
        let limits = SeriesLimits::default();
        Self {
            first: "random-a".to_string(),
            second: "random-b".to_string(),
            agent_seed: 1,
            max_moves_per_game: limits.max_moves_per_game,
            max_rejections: limits.max_rejections,
        }
    }
}

impl SelfPlaySettings {
    /// Limits for [`crate::play_series`].
    pub fn limits(&self) -> SeriesLimits {
        SeriesLimits::new(self.max_moves_per_game, self.max_rejections)
    }
}

/// Everything the `strictly_arena` binary needs.
#[derive(Debug, Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_", into)]
pub struct ArenaConfig {
    /// SQLite database file.
    database_path: String,
    /// Rules for new matches.
    #[serde(rename = "match")]
    match_config: MatchConfig,
    /// Actor channel sizes.
    actor: ActorSettings,
    /// Self-play players.
    selfplay: SelfPlaySettings,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            database_path: "strictly_arena.db".to_string(),
            match_config: MatchConfig::default(),
            actor: ActorSettings::default(),
            selfplay: SelfPlaySettings::default(),
        }
    }
}

impl ArenaConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or the
    /// result does not validate.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(
            variant = %config.match_config.variant,
            db = %config.database_path,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a parse or validation failure.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the match rules and host settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid setting.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.match_config.validate()?;
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::new("database_path must not be empty"));
        }
        if self.actor.channel_capacity == 0 || self.actor.event_capacity == 0 {
            return Err(ConfigError::new("actor channel capacities must be positive"));
        }
        if self.selfplay.first == self.selfplay.second {
            return Err(ConfigError::new(format!(
                "selfplay players must differ, both are '{}'",
                self.selfplay.first
            )));
        }
        Ok(())
    }

    /// Applies [`DB_PATH_ENV`] when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            debug!(path = %path, "Database path from environment");
            self.database_path = path;
        }
        self
    }

    /// Pretty TOML rendering.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render config: {}", e)))
    }
}

//! Match configuration.

use crate::skills::SkillId;
use crate::terrain::{MysteryEffect, StealFallback, TileWeights};
use crate::variants::Variant;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

/// How colours are assigned before normal play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Opening {
    /// First seat plays Black and moves first.
    #[default]
    #[display("standard")]
    Standard,
    /// Pie-rule opening.
    #[display("swap2")]
    Swap2,
}

/// Re-hiding cadence for the hidden variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiddenPolicy {
    /// Most recent stones that stay visible.
    pub visible_recent: u32,
    /// Re-hide after every this many placements.
    pub rehide_every: u32,
}

impl Default for HiddenPolicy {
    fn default() -> Self {
        Self {
            visible_recent: 4,
            rehide_every: 4,
        }
    }
}

/// Tile odds and mystery behaviour for the terrain variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainPolicy {
    /// Tile probabilities.
    pub weights: TileWeights,
    /// Sub-effects a mystery tile picks from.
    pub mystery: Vec<MysteryEffect>,
    /// Steal behaviour when the opponent holds nothing.
    pub steal_fallback: StealFallback,
}

impl Default for TerrainPolicy {
    fn default() -> Self {
        Self {
            weights: TileWeights::default(),
            mystery: MysteryEffect::iter().collect(),
            steal_fallback: StealFallback::default(),
        }
    }
}

/// Rules for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct MatchConfig {
    /// Side length of the square board.
    pub board_size: usize,
    /// Stones in a row needed to win.
    pub win_length: usize,
    /// Rule set.
    pub variant: Variant,
    /// Opening protocol.
    pub opening: Opening,
    /// Game wins needed to take the series.
    pub series_target: u32,
    /// Mana each side starts with.
    pub starting_mana: u32,
    /// Mana ceiling.
    pub mana_cap: u32,
    /// Mana regained at the end of an own turn.
    pub mana_regen: u32,
    /// Candidates drawn at the start of a turn.
    pub draw_size: usize,
    /// Base skills per turn.
    pub use_limit: u32,
    /// Maximum held skills.
    pub max_held: usize,
    /// Optional personal deck; the full catalog when absent.
    #[setters(strip_option)]
    pub deck: Option<Vec<SkillId>>,
    /// Seed for every random draw in the match.
    pub seed: u64,
    /// Hidden variant cadence.
    pub hidden: HiddenPolicy,
    /// Terrain variant tiles.
    pub terrain: TerrainPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            board_size: 15,
            win_length: 5,
            variant: Variant::Custom,
            opening: Opening::Standard,
            series_target: 2,
            starting_mana: 5,
            mana_cap: 15,
            mana_regen: 3,
            draw_size: 3,
            use_limit: 1,
            max_held: 3,
            deck: None,
            seed: 0,
            hidden: HiddenPolicy::default(),
            terrain: TerrainPolicy::default(),
        }
    }
}

impl MatchConfig {
    /// Largest personal deck.
    pub const MAX_DECK: usize = 15;

    /// Skills candidates and grants are drawn from.
    pub fn skill_pool(&self) -> Vec<SkillId> {
        match &self.deck {
            Some(deck) => deck.clone(),
            None => SkillId::iter().collect(),
        }
    }

    /// Checks the configuration for impossible combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first problem found.
    #[instrument(skip(self), fields(size = self.board_size, variant = %self.variant))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=25).contains(&self.board_size) {
            return Err(ConfigError::new(format!(
                "board_size must be between 5 and 25, got {}",
                self.board_size
            )));
        }
        if self.win_length < 2 || self.win_length > self.board_size {
            return Err(ConfigError::new(format!(
                "win_length {} does not fit a {} board",
                self.win_length, self.board_size
            )));
        }
        if self.series_target == 0 {
            return Err(ConfigError::new("series_target must be at least 1"));
        }
        if self.starting_mana > self.mana_cap {
            return Err(ConfigError::new("starting_mana exceeds mana_cap"));
        }
        if self.use_limit == 0 {
            return Err(ConfigError::new("use_limit must be at least 1"));
        }
        if let Some(deck) = &self.deck {
            if deck.is_empty() || deck.len() > Self::MAX_DECK {
                return Err(ConfigError::new(format!(
                    "deck must hold 1 to {} skills, got {}",
                    Self::MAX_DECK,
                    deck.len()
                )));
            }
            let unique: BTreeSet<_> = deck.iter().collect();
            if unique.len() != deck.len() {
                return Err(ConfigError::new("deck contains duplicate skills"));
            }
        }
        if self.hidden.rehide_every == 0 {
            return Err(ConfigError::new("hidden.rehide_every must be at least 1"));
        }
        if self.terrain.weights.special_total() > 100 {
            return Err(ConfigError::new("terrain weights exceed 100 percent"));
        }
        debug!("Match config valid");
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
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
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_win_length_longer_than_board_rejected() {
        let config = MatchConfig::default().with_board_size(5).with_win_length(6);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deck_rules() {
        let duplicate = MatchConfig::default().with_deck(vec![SkillId::Destroy, SkillId::Destroy]);
        assert!(duplicate.validate().is_err());

        let oversized = MatchConfig::default().with_deck(SkillId::iter().collect::<Vec<_>>());
        assert!(oversized.validate().is_err());

        let ok = MatchConfig::default().with_deck(vec![SkillId::Shield, SkillId::Push]);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.skill_pool(), vec![SkillId::Shield, SkillId::Push]);
    }

    #[test]
    fn test_partial_toml_style_json_uses_defaults() {
        let config: MatchConfig =
            serde_json::from_str(r#"{"board_size": 9, "variant": "terrain"}"#).unwrap();
        assert_eq!(config.board_size, 9);
        assert_eq!(config.variant, Variant::Terrain);
        assert_eq!(config.win_length, 5);
        assert_eq!(config.terrain.mystery.len(), 7);
    }

    #[test]
    fn test_config_error_tracks_location() {
        let err = ConfigError::new("boom");
        assert!(err.file.ends_with("config.rs"));
        assert!(err.to_string().contains("boom"));
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use engine::HitSelection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::items::ItemCategory;

pub(crate) const CONFIG_ENV_VAR: &str = "KNIGHT_CONFIG";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config json at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid config at {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub(crate) enum ItemSpawnMode {
    #[default]
    Always,
    Weighted { seed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ItemSpawnRates {
    pub(crate) health_potion: u8,
    pub(crate) mana_potion: u8,
    pub(crate) weapon: u8,
    pub(crate) collectible: u8,
}

impl Default for ItemSpawnRates {
    fn default() -> Self {
        Self {
            health_potion: 15,
            mana_potion: 10,
            weapon: 5,
            collectible: 20,
        }
    }
}

impl ItemSpawnRates {
    pub(crate) fn rate_for(&self, category: ItemCategory) -> u8 {
        match category {
            ItemCategory::HealthPotion => self.health_potion,
            ItemCategory::ManaPotion => self.mana_potion,
            ItemCategory::Weapon => self.weapon,
            ItemCategory::Collectible => self.collectible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RiddleConfig {
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option: usize,
}

impl Default for RiddleConfig {
    fn default() -> Self {
        Self {
            question: "I speak without a mouth and hear without ears. I have no body, but I come alive with wind. What am I?".to_string(),
            options: vec![
                "a. A ghost".to_string(),
                "b. An echo".to_string(),
                "c. A whistle".to_string(),
                "d. A shadow".to_string(),
            ],
            correct_option: 1,
        }
    }
}

pub(crate) const RIDDLE_OPTION_COUNT: usize = 4;

/// Gameplay tuning. Every field has a default, so a config file only needs
/// the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) tile_size: f32,
    pub(crate) screen_width: u32,
    pub(crate) screen_height: u32,
    pub(crate) player_speed: f32,
    pub(crate) enemy_speed: f32,
    pub(crate) enemy_detection_range: f32,
    pub(crate) max_hp: u32,
    pub(crate) max_mana: u32,
    pub(crate) attack_mana_cost: u32,
    pub(crate) damage_cooldown_ticks: u32,
    pub(crate) inventory_slots: usize,
    pub(crate) chest_interaction_range: f32,
    pub(crate) health_potion_heal: u32,
    pub(crate) mana_potion_restore: u32,
    pub(crate) weapon_attack_bonus: u32,
    pub(crate) coin_points: u32,
    pub(crate) hit_selection: HitSelection,
    pub(crate) item_spawn: ItemSpawnMode,
    pub(crate) item_spawn_rates: ItemSpawnRates,
    pub(crate) riddle: RiddleConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            screen_width: 1024,
            screen_height: 768,
            player_speed: 5.0,
            enemy_speed: 2.0,
            enemy_detection_range: 80.0,
            max_hp: 6,
            max_mana: 180,
            attack_mana_cost: 10,
            damage_cooldown_ticks: 120,
            inventory_slots: 20,
            chest_interaction_range: 50.0,
            health_potion_heal: 2,
            mana_potion_restore: 30,
            weapon_attack_bonus: 2,
            coin_points: 10,
            hit_selection: HitSelection::default(),
            item_spawn: ItemSpawnMode::default(),
            item_spawn_rates: ItemSpawnRates::default(),
            riddle: RiddleConfig::default(),
        }
    }
}

impl GameConfig {
    pub(crate) fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub(crate) fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: GameConfig = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                ConfigError::Parse {
                    path,
                    message: error.into_inner().to_string(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        positive("tile_size", self.tile_size)?;
        positive("player_speed", self.player_speed)?;
        positive("enemy_speed", self.enemy_speed)?;
        positive("enemy_detection_range", self.enemy_detection_range)?;
        positive("chest_interaction_range", self.chest_interaction_range)?;
        non_zero("screen_width", self.screen_width)?;
        non_zero("screen_height", self.screen_height)?;
        non_zero("max_hp", self.max_hp)?;
        if self.inventory_slots == 0 {
            return Err(invalid("inventory_slots", "must be at least 1"));
        }
        if self.player_speed >= self.tile_size {
            return Err(invalid(
                "player_speed",
                format!(
                    "must be below tile_size ({}), got {}",
                    self.tile_size, self.player_speed
                ),
            ));
        }
        if self.enemy_speed >= self.tile_size {
            return Err(invalid(
                "enemy_speed",
                format!(
                    "must be below tile_size ({}), got {}",
                    self.tile_size, self.enemy_speed
                ),
            ));
        }

        let rates = &self.item_spawn_rates;
        for (field, rate) in [
            ("item_spawn_rates.health_potion", rates.health_potion),
            ("item_spawn_rates.mana_potion", rates.mana_potion),
            ("item_spawn_rates.weapon", rates.weapon),
            ("item_spawn_rates.collectible", rates.collectible),
        ] {
            if rate > 100 {
                return Err(invalid(field, format!("must be within 0..=100, got {rate}")));
            }
        }

        if self.riddle.options.len() != RIDDLE_OPTION_COUNT {
            return Err(invalid(
                "riddle.options",
                format!(
                    "expected {RIDDLE_OPTION_COUNT} options, got {}",
                    self.riddle.options.len()
                ),
            ));
        }
        if self.riddle.correct_option >= RIDDLE_OPTION_COUNT {
            return Err(invalid(
                "riddle.correct_option",
                format!(
                    "must be below {RIDDLE_OPTION_COUNT}, got {}",
                    self.riddle.correct_option
                ),
            ));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_zero(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        Err(invalid(field, "must be non-zero"))
    } else {
        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

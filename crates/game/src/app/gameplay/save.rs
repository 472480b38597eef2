use std::fs;
use std::path::{Path, PathBuf};

use engine::{sha256_hex, write_text_atomic, Rect, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::GameConfig;
use super::items::Item;

pub(crate) const SAVE_VERSION: u32 = 1;
pub(crate) const SAVE_FILE_NAME: &str = "knight.save.json";

#[derive(Debug, Error)]
pub(crate) enum SaveError {
    #[error("read save '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write save '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("parse save json{}: {message}", at_path(.path))]
    Parse { path: String, message: String },
    #[error("unsupported save_version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },
    #[error("checksum mismatch: file says {stored}, state hashes to {computed}")]
    ChecksumMismatch { stored: String, computed: String },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
    #[error("no live player")]
    NoPlayer,
    #[error("no save path configured")]
    NoSavePath,
}

fn at_path(path: &str) -> String {
    if path.is_empty() || path == "." {
        String::new()
    } else {
        format!(" at {path}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SavedVec2 {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl From<Vec2> for SavedVec2 {
    fn from(value: Vec2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

impl From<SavedVec2> for Vec2 {
    fn from(value: SavedVec2) -> Self {
        Vec2::new(value.x, value.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SaveState {
    pub(crate) hp: u32,
    pub(crate) mana: u32,
    pub(crate) position: SavedVec2,
    pub(crate) inventory: Vec<Item>,
    pub(crate) music_paused: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SaveFile {
    save_version: u32,
    checksum: String,
    state: SaveState,
}

fn state_checksum(state: &SaveState) -> Result<String, SaveError> {
    let bytes = serde_json::to_vec(state).map_err(SaveError::Encode)?;
    Ok(sha256_hex(&bytes))
}

pub(crate) fn encode_save(state: &SaveState) -> Result<String, SaveError> {
    let file = SaveFile {
        save_version: SAVE_VERSION,
        checksum: state_checksum(state)?,
        state: state.clone(),
    };
    serde_json::to_string_pretty(&file).map_err(SaveError::Encode)
}

pub(crate) fn decode_save(raw: &str) -> Result<SaveState, SaveError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let file: SaveFile =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            SaveError::Parse {
                path,
                message: error.into_inner().to_string(),
            }
        })?;

    if file.save_version != SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion {
            expected: SAVE_VERSION,
            actual: file.save_version,
        });
    }
    let computed = state_checksum(&file.state)?;
    if computed != file.checksum {
        return Err(SaveError::ChecksumMismatch {
            stored: file.checksum,
            computed,
        });
    }
    Ok(file.state)
}

fn invalid(path: impl Into<String>, message: impl Into<String>) -> SaveError {
    SaveError::Invalid {
        path: path.into(),
        message: message.into(),
    }
}

pub(crate) fn validate_save_state(
    state: &SaveState,
    config: &GameConfig,
    world_size: Vec2,
    blocks: &[Rect],
) -> Result<(), SaveError> {
    if state.hp == 0 || state.hp > config.max_hp {
        return Err(invalid(
            "hp",
            format!("expected 1..={}, got {}", config.max_hp, state.hp),
        ));
    }
    if state.mana > config.max_mana {
        return Err(invalid(
            "mana",
            format!("expected 0..={}, got {}", config.max_mana, state.mana),
        ));
    }

    let max_x = world_size.x - config.tile_size;
    let max_y = world_size.y - config.tile_size;
    for (path, value, max) in [
        ("position.x", state.position.x, max_x),
        ("position.y", state.position.y, max_y),
    ] {
        if !value.is_finite() || value < 0.0 || value > max {
            return Err(invalid(path, format!("expected 0..={max}, got {value}")));
        }
    }
    let player_rect = Rect::from_position_size(
        state.position.into(),
        Vec2::new(config.tile_size, config.tile_size),
    );
    if let Some(block) = blocks.iter().find(|block| block.overlaps(&player_rect)) {
        return Err(invalid(
            "position",
            format!(
                "player at ({}, {}) overlaps solid block at ({}, {})",
                player_rect.x, player_rect.y, block.x, block.y
            ),
        ));
    }

    if state.inventory.len() > config.inventory_slots {
        return Err(invalid(
            "inventory",
            format!(
                "expected at most {} items, got {}",
                config.inventory_slots,
                state.inventory.len()
            ),
        ));
    }
    for (index, item) in state.inventory.iter().enumerate() {
        if item.quantity == 0 {
            return Err(invalid(
                format!("inventory[{index}].quantity"),
                "expected at least 1, got 0",
            ));
        }
        if item.name.trim().is_empty() {
            return Err(invalid(format!("inventory[{index}].name"), "must not be empty"));
        }
    }
    Ok(())
}

pub(crate) fn write_save_file(path: &Path, state: &SaveState) -> Result<(), SaveError> {
    let json = encode_save(state)?;
    write_text_atomic(path, &json).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_save_file(path: &Path) -> Result<SaveState, SaveError> {
    let raw = fs::read_to_string(path).map_err(|source| SaveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_save(&raw)
}

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app::Facing;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key is empty")]
    Empty,
    #[error("sprite key segment {index} ('{segment}') must be non-empty [a-z0-9_-]")]
    BadSegment { index: usize, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpriteKey(String);

impl SpriteKey {
    pub fn parse(raw: &str) -> Result<Self, SpriteKeyError> {
        if raw.is_empty() {
            return Err(SpriteKeyError::Empty);
        }
        for (index, segment) in raw.split('/').enumerate() {
            let valid = !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-');
            if !valid {
                return Err(SpriteKeyError::BadSegment {
                    index,
                    segment: segment.to_string(),
                });
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn directional(sheet: &str, facing: Facing, frame: u32) -> Result<Self, SpriteKeyError> {
        Self::parse(&format!("{sheet}/{}_{frame}", facing.as_token()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn image_path(&self, assets_dir: &Path) -> PathBuf {
        let mut path = assets_dir.join("sprites");
        path.extend(self.0.split('/'));
        path.set_extension("png");
        path
    }
}

impl fmt::Display for SpriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use std::path::PathBuf;

use engine::{AnimationClip, Scene};

mod ai;
mod combat;
mod config;
mod interact;
mod items;
mod player;
mod save;
mod scene_impl;
mod session;
mod world_loader;

pub(crate) use config::{ConfigError, GameConfig, CONFIG_ENV_VAR};
pub(crate) use save::SAVE_FILE_NAME;
pub(crate) use world_loader::WorldLoadError;

use scene_impl::GameplayScene;
use world_loader::DEFAULT_MAP;

pub(crate) const WALK_CLIP: AnimationClip = AnimationClip::looping(1, 2, 10);

pub(crate) fn build_scene(
    config: GameConfig,
    save_path: Option<PathBuf>,
) -> Result<Box<dyn Scene>, WorldLoadError> {
    let scene = GameplayScene::new(config, DEFAULT_MAP, save_path)?;
    Ok(Box::new(scene))
}

#[cfg(test)]
mod tests;

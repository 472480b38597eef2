use std::path::PathBuf;

use engine::{resolve_app_paths, LoopConfig, Scene};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, ConfigError, GameConfig, WorldLoadError, CONFIG_ENV_VAR, SAVE_FILE_NAME};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to load world: {0}")]
    World(#[from] WorldLoadError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Knight Startup ===");

    let game_config = load_game_config()?;
    let save_path = match resolve_app_paths() {
        Ok(paths) => Some(paths.saves_dir.join(SAVE_FILE_NAME)),
        Err(error) => {
            warn!(error = %error, "save_dir_unavailable");
            None
        }
    };
    let config = LoopConfig {
        window_width: game_config.screen_width,
        window_height: game_config.screen_height,
        ..LoopConfig::default()
    };
    let scene = gameplay::build_scene(game_config, save_path)?;

    Ok(AppWiring { config, scene })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_game_config() -> Result<GameConfig, ConfigError> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let config = GameConfig::load_from_path(&path)?;
            info!(path = %path.display(), "game_config_loaded");
            Ok(config)
        }
        None => {
            info!(env_var = CONFIG_ENV_VAR, "game_config_defaults");
            Ok(GameConfig::default())
        }
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod persistence;
mod sprite_keys;

pub use app::{
    resolve_axis, resolve_move, run_app, world_to_screen_px, AnimationClip, Animator, AppError,
    Axis, AxisResolution, Camera2D, DrawLayer, Entity, EntityId, EntityIdAllocator, EntityKind,
    Facing, HitSelection, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot,
    MoveResolution, Rect, RenderableDesc, RenderableKind, Renderer, Scene, SceneCommand,
    SceneWorld, SpawnDesc, StatusBars, TileGrid, TileGridError, TileKind, Vec2, Viewport,
};
pub use persistence::{sha256_hex, write_text_atomic};
pub use sprite_keys::{SpriteKey, SpriteKeyError};

pub const ROOT_ENV_VAR: &str = "KNIGHT_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub saves_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("KNIGHT_ROOT={path} is not a project root (needs Cargo.toml plus crates/ or assets/)")]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "no project root above {searched} or the working directory; set KNIGHT_ROOT to the checkout"
    )]
    RootNotFound { searched: PathBuf },
    #[error("failed to locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("failed to create saves directory {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    app_paths_for_root(find_root()?)
}

pub fn app_paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let saves_dir = root.join("saves");
    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: saves_dir.clone(),
        source,
    })?;
    Ok(AppPaths {
        assets_dir: root.join("assets"),
        saves_dir,
        root,
    })
}

/// `KNIGHT_ROOT` when set, else the nearest ancestor of the executable, else
/// the nearest ancestor of the working directory.
fn find_root() -> Result<PathBuf, StartupError> {
    if let Some(raw) = env::var_os(ROOT_ENV_VAR) {
        let path = canonical_or_raw(Path::new(&raw));
        return if looks_like_root(&path) {
            Ok(path)
        } else {
            Err(StartupError::InvalidEnvRoot { path })
        };
    }

    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let exe_dir = exe.parent().unwrap_or(Path::new(".")).to_path_buf();
    let cwd = env::current_dir().ok();
    exe_dir
        .ancestors()
        .chain(cwd.iter().flat_map(|dir| dir.ancestors()))
        .find(|dir| looks_like_root(dir))
        .map(canonical_or_raw)
        .ok_or(StartupError::RootNotFound { searched: exe_dir.clone() })
}

fn looks_like_root(dir: &Path) -> bool {
    dir.join("Cargo.toml").is_file() && (dir.join("crates").is_dir() || dir.join("assets").is_dir())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

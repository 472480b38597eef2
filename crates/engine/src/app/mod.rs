mod animation;
mod camera;
mod collision;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod tilemap;

pub use animation::{AnimationClip, Animator};
pub use camera::Camera2D;
pub use collision::{resolve_axis, resolve_move, AxisResolution, HitSelection, MoveResolution};
pub use geometry::{Axis, Facing, Rect, Vec2};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{world_to_screen_px, Renderer, Viewport};
pub use scene::{
    DrawLayer, Entity, EntityId, EntityIdAllocator, EntityKind, InputSnapshot, RenderableDesc,
    RenderableKind, Scene, SceneCommand, SceneWorld, SpawnDesc, StatusBars,
};
pub use tilemap::{TileGrid, TileGridError, TileKind};

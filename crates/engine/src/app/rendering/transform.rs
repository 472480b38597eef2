use crate::app::{Camera2D, TileGrid, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

pub fn world_to_screen_px(camera: &Camera2D, world: Vec2) -> (i32, i32) {
    let screen = camera.world_to_screen(world);
    (screen.x.round() as i32, screen.y.round() as i32)
}

pub(crate) fn visible_tile_range(
    grid: &TileGrid,
    camera: &Camera2D,
    viewport: Viewport,
) -> Option<(u32, u32, u32, u32)> {
    grid.tiles_covering(&camera.visible_rect(viewport.size()))
}

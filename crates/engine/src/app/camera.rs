use super::geometry::{Rect, Vec2};

/// Draw-time offset. `position` is the world pixel shown at the top-left of the
/// viewport; entity positions are never touched by the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
}

impl Camera2D {
    pub fn follow_clamped(&mut self, target_center: Vec2, viewport_size: Vec2, world_size: Vec2) {
        self.position = Vec2::new(
            clamp_axis(
                target_center.x - viewport_size.x * 0.5,
                world_size.x - viewport_size.x,
            ),
            clamp_axis(
                target_center.y - viewport_size.y * 0.5,
                world_size.y - viewport_size.y,
            ),
        );
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world - self.position
    }

    pub fn visible_rect(&self, viewport_size: Vec2) -> Rect {
        Rect::from_position_size(self.position, viewport_size)
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    value.min(max).max(0.0)
}

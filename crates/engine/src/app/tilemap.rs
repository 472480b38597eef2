use thiserror::Error;

use super::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Floor,
    Wall,
}

/// Static collision grid.
///
/// Tile origin convention:
/// - tile (x,y) covers world pixels `[x*tile_size, (x+1)*tile_size)` on each axis.
/// - `y` grows downward, row 0 is the top row of the source map.
///
/// The grid is immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    tiles: Vec<TileKind>,
    wall_rects: Vec<Rect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileGridError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be positive")]
    NonPositiveTileSize,
}

impl TileGrid {
    pub fn new(
        width: u32,
        height: u32,
        tile_size: f32,
        tiles: Vec<TileKind>,
    ) -> Result<Self, TileGridError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TileGridError::TileCountMismatch { expected, actual });
        }
        if tile_size.is_nan() || tile_size <= 0.0 {
            return Err(TileGridError::NonPositiveTileSize);
        }

        // Row-major, so wall order matches the order the map was read in.
        let mut wall_rects = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if tiles[y as usize * width as usize + x as usize] == TileKind::Wall {
                    wall_rects.push(Rect::new(
                        x as f32 * tile_size,
                        y as f32 * tile_size,
                        tile_size,
                        tile_size,
                    ));
                }
            }
        }

        Ok(Self {
            width,
            height,
            tile_size,
            tiles,
            wall_rects,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<TileKind> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tile_origin_world(&self, x: u32, y: u32) -> Option<Vec2> {
        self.index_of(x, y)?;
        Some(Vec2::new(
            x as f32 * self.tile_size,
            y as f32 * self.tile_size,
        ))
    }

    pub fn tile_rect(&self, x: u32, y: u32) -> Option<Rect> {
        let origin = self.tile_origin_world(x, y)?;
        Some(Rect::new(origin.x, origin.y, self.tile_size, self.tile_size))
    }

    pub fn wall_rects(&self) -> &[Rect] {
        &self.wall_rects
    }

    pub fn tiles_covering(&self, rect: &Rect) -> Option<(u32, u32, u32, u32)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let x_min = (rect.left() / self.tile_size).floor() as i64;
        let y_min = (rect.top() / self.tile_size).floor() as i64;
        let x_max = (rect.right() / self.tile_size).ceil() as i64 - 1;
        let y_max = (rect.bottom() / self.tile_size).ceil() as i64 - 1;
        if x_max < 0 || y_max < 0 || x_min > max_x || y_min > max_y {
            return None;
        }
        Some((
            x_min.clamp(0, max_x) as u32,
            y_min.clamp(0, max_y) as u32,
            x_max.clamp(0, max_x) as u32,
            y_max.clamp(0, max_y) as u32,
        ))
    }
}

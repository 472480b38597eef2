use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use tracing::warn;
use winit::window::Window;

use crate::app::{
    Camera2D, DrawLayer, Entity, RenderableKind, SceneWorld, StatusBars, TileKind,
};
use crate::sprite_keys::SpriteKey;

use super::transform::visible_tile_range;
use super::{world_to_screen_px, Viewport};

const CLEAR_COLOR: [u8; 4] = [12, 12, 16, 255];
const FLOOR_FALLBACK_COLOR: [u8; 4] = [58, 52, 46, 255];
const WALL_FALLBACK_COLOR: [u8; 4] = [96, 96, 104, 255];
const FLOOR_SPRITE_KEY: &str = "tiles/floor";
const WALL_SPRITE_KEY: &str = "tiles/wall";
const BAR_LEFT_PX: i32 = 10;
const BAR_OFFSET_FROM_BOTTOM_PX: i32 = 150;
const BAR_WIDTH_PX: i32 = 200;
const BAR_HEIGHT_PX: i32 = 20;
const BAR_SPACING_PX: i32 = 55;
const BAR_BORDER_COLOR: [u8; 4] = [255, 255, 255, 255];
const HP_BAR_BACK_COLOR: [u8; 4] = [255, 0, 0, 255];
const HP_BAR_FILL_COLOR: [u8; 4] = [0, 255, 0, 255];
const MANA_BAR_BACK_COLOR: [u8; 4] = [0, 0, 255, 255];
const MANA_BAR_FILL_COLOR: [u8; 4] = [255, 255, 255, 255];

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Lazily decoded sprites keyed by sprite key. A failed load is cached as
/// `None` and warned about once.
struct SpriteStore {
    asset_root: PathBuf,
    cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl SpriteStore {
    fn new(asset_root: PathBuf) -> Self {
        Self {
            asset_root,
            cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        }
    }

    fn resolve(&mut self, key: &str) -> Option<&LoadedSprite> {
        if !self.cache.contains_key(key) {
            let loaded = match resolve_sprite_image_path(&self.asset_root, key) {
                Ok(path) => match load_sprite_rgba(&path) {
                    Ok(sprite) => Some(sprite),
                    Err(reason) => {
                        warn_sprite_load_once(
                            &mut self.warned_missing_sprite_keys,
                            key,
                            Some(path.as_path()),
                            reason.as_str(),
                        );
                        None
                    }
                },
                Err(reason) => {
                    warn_sprite_load_once(
                        &mut self.warned_missing_sprite_keys,
                        key,
                        None,
                        reason.as_str(),
                    );
                    None
                }
            };
            self.cache.insert(key.to_string(), loaded);
        }
        self.cache.get(key).and_then(Option::as_ref)
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    sprites: SpriteStore,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(viewport.width, viewport.height, surface)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            sprites: SpriteStore::new(asset_root),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        status_bars: Option<StatusBars>,
    ) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        compose_frame(
            self.pixels.frame_mut(),
            self.viewport,
            world,
            status_bars,
            &mut self.sprites,
        );
        self.pixels.render()
    }
}

fn compose_frame(
    frame: &mut [u8],
    viewport: Viewport,
    world: &SceneWorld,
    status_bars: Option<StatusBars>,
    sprites: &mut SpriteStore,
) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&CLEAR_COLOR);
    }

    // The tile pass is the Ground layer, so Item-layer entities go underneath it.
    let ordered = world.draw_order();
    let split = ordered.partition_point(|entity| entity.layer < DrawLayer::Ground);
    let (under_tiles, over_tiles) = ordered.split_at(split);

    draw_entities(frame, viewport, world, under_tiles, sprites);
    draw_tile_background(frame, viewport, world, sprites);
    draw_entities(frame, viewport, world, over_tiles, sprites);

    if let Some(bars) = status_bars {
        draw_status_bars(frame, viewport, bars);
    }
}

fn draw_entities(
    frame: &mut [u8],
    viewport: Viewport,
    world: &SceneWorld,
    entities: &[&Entity],
    sprites: &mut SpriteStore,
) {
    let visible = world.camera().visible_rect(viewport.size());
    for entity in entities {
        if entity.rect().overlaps(&visible) {
            draw_entity(frame, viewport, world.camera(), entity, sprites);
        }
    }
}

fn draw_tile_background(
    frame: &mut [u8],
    viewport: Viewport,
    world: &SceneWorld,
    sprites: &mut SpriteStore,
) {
    let Some(grid) = world.tile_grid() else {
        return;
    };
    let Some((x_min, y_min, x_max, y_max)) = visible_tile_range(grid, world.camera(), viewport)
    else {
        return;
    };
    let tile_px = grid.tile_size().round() as i32;

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let (Some(kind), Some(origin)) = (grid.tile_at(x, y), grid.tile_origin_world(x, y))
            else {
                continue;
            };
            let (left, top) = world_to_screen_px(world.camera(), origin);
            let (key, fallback) = match kind {
                TileKind::Floor => (FLOOR_SPRITE_KEY, FLOOR_FALLBACK_COLOR),
                TileKind::Wall => (WALL_SPRITE_KEY, WALL_FALLBACK_COLOR),
            };
            match sprites.resolve(key) {
                Some(sprite) => draw_sprite(frame, viewport, left, top, sprite),
                None => fill_rect(frame, viewport, left, top, tile_px, tile_px, fallback),
            }
        }
    }
}

fn entity_sprite_key(entity: &Entity) -> Option<String> {
    match &entity.renderable.kind {
        RenderableKind::Placeholder => None,
        RenderableKind::Sprite(key) => Some(key.clone()),
        // A bad sheet name falls through to the store, which warns once.
        RenderableKind::Directional(sheet) => Some(
            SpriteKey::directional(sheet, entity.facing, entity.frame)
                .map_or_else(|_| sheet.clone(), |key| key.to_string()),
        ),
    }
}

fn draw_entity(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    entity: &Entity,
    sprites: &mut SpriteStore,
) {
    let (left, top) = world_to_screen_px(camera, entity.position);
    let sprite = entity_sprite_key(entity).and_then(|key| sprites.resolve(&key));
    match sprite {
        Some(sprite) => draw_sprite(frame, viewport, left, top, sprite),
        None => fill_rect(
            frame,
            viewport,
            left,
            top,
            entity.size.x.round() as i32,
            entity.size.y.round() as i32,
            entity.renderable.placeholder_rgba,
        ),
    }
}

fn draw_status_bars(frame: &mut [u8], viewport: Viewport, bars: StatusBars) {
    let hp_top = viewport.height as i32 - BAR_OFFSET_FROM_BOTTOM_PX;
    draw_bar(
        frame,
        viewport,
        hp_top,
        (bars.hp, bars.max_hp),
        (HP_BAR_BACK_COLOR, HP_BAR_FILL_COLOR),
    );
    draw_bar(
        frame,
        viewport,
        hp_top + BAR_SPACING_PX,
        (bars.mana, bars.max_mana),
        (MANA_BAR_BACK_COLOR, MANA_BAR_FILL_COLOR),
    );
}

fn draw_bar(
    frame: &mut [u8],
    viewport: Viewport,
    top: i32,
    (value, max): (u32, u32),
    (back, fill): ([u8; 4], [u8; 4]),
) {
    fill_rect(frame, viewport, BAR_LEFT_PX, top, BAR_WIDTH_PX, BAR_HEIGHT_PX, back);
    let filled = bar_fill_width(value, max, BAR_WIDTH_PX);
    fill_rect(frame, viewport, BAR_LEFT_PX, top, filled, BAR_HEIGHT_PX, fill);
    draw_rect_outline(frame, viewport, BAR_LEFT_PX, top, BAR_WIDTH_PX, BAR_HEIGHT_PX);
}

fn draw_rect_outline(frame: &mut [u8], viewport: Viewport, left: i32, top: i32, width: i32, height: i32) {
    let right = left + width - 1;
    let bottom = top + height - 1;
    for x in left..=right {
        write_pixel_rgba_clipped(frame, viewport, x, top, BAR_BORDER_COLOR);
        write_pixel_rgba_clipped(frame, viewport, x, bottom, BAR_BORDER_COLOR);
    }
    for y in top..=bottom {
        write_pixel_rgba_clipped(frame, viewport, left, y, BAR_BORDER_COLOR);
        write_pixel_rgba_clipped(frame, viewport, right, y, BAR_BORDER_COLOR);
    }
}

fn bar_fill_width(value: u32, max: u32, width: i32) -> i32 {
    if max == 0 {
        return 0;
    }
    let ratio = value.min(max) as f32 / max as f32;
    (ratio * width as f32).round() as i32
}

fn resolve_sprite_image_path(asset_root: &Path, key: &str) -> Result<PathBuf, String> {
    SpriteKey::parse(key)
        .map(|key| key.image_path(asset_root))
        .map_err(|error| format!("invalid_key:{error}"))
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}

fn write_pixel_rgba_clipped(frame: &mut [u8], viewport: Viewport, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= viewport.width as i32 || y >= viewport.height as i32 {
        return;
    }
    let offset = (y as usize * viewport.width as usize + x as usize) * 4;
    let Some(pixel) = frame.get_mut(offset..offset + 4) else {
        return;
    };
    pixel.copy_from_slice(&color);
}

fn fill_rect(
    frame: &mut [u8],
    viewport: Viewport,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    color: [u8; 4],
) {
    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = (left + width).min(viewport.width as i32);
    let draw_bottom = (top + height).min(viewport.height as i32);
    for y in draw_top..draw_bottom {
        for x in draw_left..draw_right {
            write_pixel_rgba_clipped(frame, viewport, x, y, color);
        }
    }
}

fn draw_sprite(frame: &mut [u8], viewport: Viewport, left: i32, top: i32, sprite: &LoadedSprite) {
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.width == 0 || sprite.height == 0 || sprite.rgba.len() < expected_rgba_len {
        return;
    }
    for sy in 0..sprite.height as i32 {
        for sx in 0..sprite.width as i32 {
            let src = (sy as usize * sprite.width as usize + sx as usize) * 4;
            let alpha = sprite.rgba[src + 3];
            if alpha == 0 {
                continue;
            }
            let color = [
                sprite.rgba[src],
                sprite.rgba[src + 1],
                sprite.rgba[src + 2],
                alpha,
            ];
            write_pixel_rgba_clipped(frame, viewport, left + sx, top + sy, color);
        }
    }
}

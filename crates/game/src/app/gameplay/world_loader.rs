use engine::{TileGrid, TileGridError, TileKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::config::{GameConfig, ItemSpawnMode};
use super::items::ItemCategory;

pub(crate) const DEFAULT_MAP: &str = include_str!("../../../../../assets/maps/dungeon.map");

#[derive(Debug, Error, PartialEq)]
pub(crate) enum WorldLoadError {
    #[error("map has no rows")]
    Empty,
    #[error("map row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("map has no player spawn 'P'")]
    MissingPlayerSpawn,
    #[error("map has {count} player spawns, expected exactly one (first at {first:?}, second at {second:?})")]
    MultiplePlayerSpawns {
        count: usize,
        first: (u32, u32),
        second: (u32, u32),
    },
    #[error(transparent)]
    Grid(#[from] TileGridError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellSpawn {
    Enemy,
    Devil,
    Chest,
    Item(ItemCategory),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlacedSpawn {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) spawn: CellSpawn,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WorldLayout {
    pub(crate) grid: TileGrid,
    pub(crate) player_spawn: (u32, u32),
    pub(crate) barriers: Vec<(u32, u32)>,
    pub(crate) spawns: Vec<PlacedSpawn>,
}

pub(crate) fn parse_world(source: &str, config: &GameConfig) -> Result<WorldLayout, WorldLoadError> {
    let rows = source
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    let Some(first_row) = rows.first() else {
        return Err(WorldLoadError::Empty);
    };
    let width = first_row.chars().count();
    if width == 0 {
        return Err(WorldLoadError::Empty);
    }

    let mut rng = match config.item_spawn {
        ItemSpawnMode::Always => None,
        ItemSpawnMode::Weighted { seed } => Some(StdRng::seed_from_u64(seed)),
    };

    let mut tiles = Vec::with_capacity(width * rows.len());
    let mut barriers = Vec::new();
    let mut spawns = Vec::new();
    let mut player_spawns = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        let row_width = row.chars().count();
        if row_width != width {
            return Err(WorldLoadError::RaggedRow {
                row: row_index,
                expected: width,
                actual: row_width,
            });
        }

        let y = row_index as u32;
        for (column, ch) in row.chars().enumerate() {
            let x = column as u32;
            tiles.push(if ch == 'B' {
                TileKind::Wall
            } else {
                TileKind::Floor
            });

            let spawn = match ch {
                'B' => None,
                'G' => {
                    barriers.push((x, y));
                    None
                }
                'P' => {
                    player_spawns.push((x, y));
                    None
                }
                'E' => Some(CellSpawn::Enemy),
                'D' => Some(CellSpawn::Devil),
                'T' => Some(CellSpawn::Chest),
                other => ItemCategory::from_map_char(other)
                    .filter(|category| roll_item_spawn(rng.as_mut(), *category, config))
                    .map(CellSpawn::Item),
            };
            if let Some(spawn) = spawn {
                spawns.push(PlacedSpawn { x, y, spawn });
            }
        }
    }

    let player_spawn = match player_spawns.as_slice() {
        [] => return Err(WorldLoadError::MissingPlayerSpawn),
        [only] => *only,
        [first, second, ..] => {
            return Err(WorldLoadError::MultiplePlayerSpawns {
                count: player_spawns.len(),
                first: *first,
                second: *second,
            })
        }
    };

    let grid = TileGrid::new(width as u32, rows.len() as u32, config.tile_size, tiles)?;
    Ok(WorldLayout {
        grid,
        player_spawn,
        barriers,
        spawns,
    })
}

fn roll_item_spawn(rng: Option<&mut StdRng>, category: ItemCategory, config: &GameConfig) -> bool {
    match rng {
        None => true,
        Some(rng) => rng.gen_range(0..100u8) < config.item_spawn_rates.rate_for(category),
    }
}

use std::collections::{HashMap, HashSet, VecDeque};

use engine::{
    DrawLayer, EntityId, EntityKind, Facing, RenderableDesc, RenderableKind, SceneWorld,
    SpawnDesc, Vec2,
};

use super::config::GameConfig;
use super::items::{Inventory, Item};

const CHEST_CLOSED_SPRITE: &str = "objects/chest_closed";
const CHEST_OPEN_SPRITE: &str = "objects/chest_open";

pub(crate) fn within_interaction_range(a: Vec2, b: Vec2, range: f32) -> bool {
    a.distance(b) <= range
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TreasureChest {
    is_open: bool,
    contents: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChestOpening {
    pub(crate) granted: usize,
    pub(crate) dropped: Vec<Item>,
}

impl TreasureChest {
    pub(crate) fn new(contents: Vec<Item>) -> Self {
        Self {
            is_open: false,
            contents,
        }
    }

    pub(crate) fn stocked(config: &GameConfig) -> Self {
        let health = Item::health_potion(config.health_potion_heal);
        let mana = Item::mana_potion(config.mana_potion_restore);
        Self::new(vec![health.clone(), mana.clone(), health, mana])
    }

    pub(crate) fn is_open(&self) -> bool {
        self.is_open
    }

    pub(crate) fn contents(&self) -> &[Item] {
        &self.contents
    }

    pub(crate) fn open(&mut self, inventory: &mut Inventory) -> Option<ChestOpening> {
        if self.is_open {
            return None;
        }
        self.is_open = true;

        let mut granted = 0;
        let mut dropped = Vec::new();
        for item in &self.contents {
            if inventory.add_item(item.clone()) {
                granted += 1;
            } else {
                dropped.push(item.clone());
            }
        }
        Some(ChestOpening { granted, dropped })
    }
}

pub(crate) fn chest_spawn_desc(position: Vec2, tile_size: f32) -> SpawnDesc {
    SpawnDesc {
        kind: EntityKind::TreasureChest,
        layer: DrawLayer::Ground,
        position,
        size: Vec2::new(tile_size, tile_size),
        facing: Facing::Down,
        renderable: RenderableDesc {
            kind: RenderableKind::Sprite(CHEST_CLOSED_SPRITE.to_string()),
            placeholder_rgba: [139, 69, 19, 255],
            debug_name: "chest",
        },
    }
}

pub(crate) fn show_chest_opened(world: &mut SceneWorld, chest_id: EntityId) {
    if let Some(entity) = world.find_entity_mut(chest_id) {
        entity.renderable.kind = RenderableKind::Sprite(CHEST_OPEN_SPRITE.to_string());
        entity.renderable.placeholder_rgba = [205, 170, 60, 255];
    }
}

pub(crate) fn barrier_spawn_desc(position: Vec2, tile_size: f32) -> SpawnDesc {
    SpawnDesc {
        kind: EntityKind::Barrier,
        layer: DrawLayer::Block,
        position,
        size: Vec2::new(tile_size, tile_size),
        facing: Facing::Down,
        renderable: RenderableDesc {
            kind: RenderableKind::Sprite("tiles/barrier".to_string()),
            placeholder_rgba: [120, 60, 200, 255],
            debug_name: "barrier",
        },
    }
}

pub(crate) fn group_barrier_cells(cells: &[(u32, u32)]) -> Vec<Vec<(u32, u32)>> {
    let all = cells.iter().copied().collect::<HashSet<_>>();
    let mut seen = HashSet::with_capacity(cells.len());
    let mut groups = Vec::new();

    for &start in cells {
        if !seen.insert(start) {
            continue;
        }
        let mut group = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some((x, y)) = queue.pop_front() {
            group.push((x, y));
            let neighbors = [
                x.checked_sub(1).map(|nx| (nx, y)),
                Some((x + 1, y)),
                y.checked_sub(1).map(|ny| (x, ny)),
                Some((x, y + 1)),
            ];
            for neighbor in neighbors.into_iter().flatten() {
                if all.contains(&neighbor) && seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        group.sort_by_key(|&(x, y)| (y, x));
        groups.push(group);
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BarrierGroup {
    cells: Vec<(u32, u32)>,
    entity_ids: Vec<EntityId>,
    unlocked: bool,
}

impl BarrierGroup {
    pub(crate) fn cells(&self) -> &[(u32, u32)] {
        &self.cells
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

/// Riddle-locked obstacles. A locked cell is solid; a correct answer unlocks
/// the whole connected group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BarrierField {
    groups: Vec<BarrierGroup>,
}

impl BarrierField {
    pub(crate) fn new(cells: &[(u32, u32)], entity_by_cell: &HashMap<(u32, u32), EntityId>) -> Self {
        let mut field = Self::default();
        for cells in group_barrier_cells(cells) {
            let entity_ids = cells
                .iter()
                .filter_map(|cell| entity_by_cell.get(cell).copied())
                .collect();
            field.groups.push(BarrierGroup {
                cells,
                entity_ids,
                unlocked: false,
            });
        }
        field
    }

    pub(crate) fn groups(&self) -> &[BarrierGroup] {
        &self.groups
    }

    pub(crate) fn locked_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.groups
            .iter()
            .filter(|group| !group.is_unlocked())
            .flat_map(|group| group.cells().iter().copied())
    }

    pub(crate) fn locked_group_in_range(&self, center: Vec2, range: f32, tile_size: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, group) in self.groups.iter().enumerate() {
            if group.is_unlocked() {
                continue;
            }
            for &(x, y) in group.cells() {
                let cell_center = Vec2::new(
                    (x as f32 + 0.5) * tile_size,
                    (y as f32 + 0.5) * tile_size,
                );
                let distance = center.distance(cell_center);
                if distance <= range && best.map_or(true, |(_, best_distance)| distance < best_distance) {
                    best = Some((index, distance));
                }
            }
        }
        best.map(|(index, _)| index)
    }

    pub(crate) fn unlock(&mut self, group_index: usize, world: &mut SceneWorld) -> bool {
        let Some(group) = self.groups.get_mut(group_index) else {
            return false;
        };
        if group.unlocked {
            return false;
        }
        group.unlocked = true;
        for entity_id in &group.entity_ids {
            world.despawn(*entity_id);
        }
        true
    }
}

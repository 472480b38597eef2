use std::collections::HashMap;
use std::path::{Path, PathBuf};

use engine::{
    resolve_move, Animator, EntityId, EntityKind, InputAction, InputSnapshot, Rect,
    SceneCommand, SceneWorld, StatusBars, TileGrid, Vec2,
};
use tracing::{debug, info, warn};

use super::ai::{decide_pursuit, enemy_spawn_desc, EnemyAgent};
use super::combat::{advance_hitbox, resolve_contact_damage, try_spawn_attack, Hitbox, HitboxOutcome};
use super::config::GameConfig;
use super::interact::{
    barrier_spawn_desc, chest_spawn_desc, show_chest_opened, within_interaction_range,
    BarrierField, TreasureChest,
};
use super::items::{item_pickup_spawn_desc, Inventory, Item, ItemCategory};
use super::player::{
    advance_walk_animation, player_spawn_desc, read_move_intent, DamageOutcome, PlayerStats,
};
use super::save::{
    read_save_file, validate_save_state, write_save_file, SaveError, SaveState,
};
use super::world_loader::{CellSpawn, WorldLayout};
use super::WALK_CLIP;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionFlags {
    pub(crate) inventory_open: bool,
    pub(crate) menu_open: bool,
    pub(crate) music_paused: bool,
    pub(crate) game_over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActiveRiddle {
    pub(crate) barrier_group: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RiddleOutcome {
    Solved,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PersistenceStatus {
    Saved,
    Loaded,
    SaveFailed(String),
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChestPrompt {
    pub(crate) is_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RiddleView {
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HudSnapshot {
    pub(crate) hp: u32,
    pub(crate) max_hp: u32,
    pub(crate) mana: u32,
    pub(crate) max_mana: u32,
    pub(crate) score: u32,
    pub(crate) attack_bonus: u32,
    pub(crate) health_potions: u32,
    pub(crate) mana_potions: u32,
    pub(crate) inventory: Vec<String>,
    pub(crate) inventory_capacity: usize,
    pub(crate) free_slots: usize,
    pub(crate) flags: SessionFlags,
    pub(crate) nearby_chest: Option<ChestPrompt>,
    pub(crate) barrier_nearby: bool,
    pub(crate) riddle: Option<RiddleView>,
    pub(crate) persistence: Option<PersistenceStatus>,
}

#[derive(Debug)]
pub(crate) struct Session {
    config: GameConfig,
    player_id: Option<EntityId>,
    stats: PlayerStats,
    inventory: Inventory,
    player_animator: Animator,
    enemies: HashMap<EntityId, EnemyAgent>,
    hitboxes: HashMap<EntityId, Hitbox>,
    pickups: HashMap<EntityId, Item>,
    chests: HashMap<EntityId, TreasureChest>,
    barriers: BarrierField,
    blocks: Vec<Rect>,
    flags: SessionFlags,
    riddle: Option<ActiveRiddle>,
    barrier_nearby: Option<usize>,
    persistence: Option<PersistenceStatus>,
    save_path: Option<PathBuf>,
    ticks: u64,
}

impl Session {
    pub(crate) fn start(
        config: &GameConfig,
        layout: &WorldLayout,
        world: &mut SceneWorld,
        save_path: Option<PathBuf>,
    ) -> Self {
        world.set_tile_grid(layout.grid.clone());
        let tile_size = config.tile_size;
        let cell_origin = |x: u32, y: u32| Vec2::new(x as f32 * tile_size, y as f32 * tile_size);

        let mut barrier_entities = HashMap::new();
        for &(x, y) in &layout.barriers {
            let id = world.spawn(barrier_spawn_desc(cell_origin(x, y), tile_size));
            barrier_entities.insert((x, y), id);
        }

        let mut enemies = HashMap::new();
        let mut pickups = HashMap::new();
        let mut chests = HashMap::new();
        for placed in &layout.spawns {
            let position = cell_origin(placed.x, placed.y);
            match placed.spawn {
                CellSpawn::Enemy | CellSpawn::Devil => {
                    let kind = if placed.spawn == CellSpawn::Devil {
                        EntityKind::Devil
                    } else {
                        EntityKind::Enemy
                    };
                    let id = world.spawn(enemy_spawn_desc(kind, position, tile_size));
                    enemies.insert(
                        id,
                        EnemyAgent::new(config.enemy_speed, config.enemy_detection_range),
                    );
                }
                CellSpawn::Chest => {
                    let id = world.spawn(chest_spawn_desc(position, tile_size));
                    chests.insert(id, TreasureChest::stocked(config));
                }
                CellSpawn::Item(category) => {
                    let item = Item::from_category(category, config);
                    let id = world.spawn(item_pickup_spawn_desc(&item, position, tile_size));
                    pickups.insert(id, item);
                }
            }
        }

        let (spawn_x, spawn_y) = layout.player_spawn;
        let player_id = world.spawn(player_spawn_desc(cell_origin(spawn_x, spawn_y), tile_size));

        let mut session = Self {
            config: config.clone(),
            player_id: Some(player_id),
            stats: PlayerStats::new(config),
            inventory: Inventory::new(config.inventory_slots),
            player_animator: Animator::new(WALK_CLIP),
            enemies,
            hitboxes: HashMap::new(),
            pickups,
            chests,
            barriers: BarrierField::new(&layout.barriers, &barrier_entities),
            blocks: Vec::new(),
            flags: SessionFlags::default(),
            riddle: None,
            barrier_nearby: None,
            persistence: None,
            save_path,
            ticks: 0,
        };
        session.rebuild_blocks(&layout.grid);
        let player_center = Rect::from_position_size(
            cell_origin(spawn_x, spawn_y),
            Vec2::new(tile_size, tile_size),
        )
        .center();
        session.follow_camera(world, player_center);

        info!(
            enemies = session.enemies.len(),
            chests = session.chests.len(),
            pickups = session.pickups.len(),
            barrier_groups = session.barriers.groups().len(),
            blocks = session.blocks.len(),
            "session_started"
        );
        session
    }

    /// Runs one fixed step. Order: session input, cooldown, player, enemies,
    /// combat, pickups and chests, camera. Removals queued here apply after
    /// the step, so every system sees the same arena.
    pub(crate) fn tick(&mut self, input: &InputSnapshot, world: &mut SceneWorld) -> SceneCommand {
        if self.flags.game_over {
            return SceneCommand::GameOver;
        }
        self.ticks += 1;

        self.handle_session_input(input, world);
        if self.is_paused() {
            return SceneCommand::None;
        }
        self.handle_action_input(input, world);

        self.stats.tick_cooldown();
        self.move_player(input, world);
        self.move_enemies(world);
        self.resolve_combat(world);
        self.collect_pickups(world);
        self.update_chests(input, world);
        self.barrier_nearby = self
            .player_center(world)
            .and_then(|center| self.barrier_group_in_range(center));
        if let Some(center) = self.player_center(world) {
            self.follow_camera(world, center);
        }

        if self.flags.game_over {
            SceneCommand::GameOver
        } else {
            SceneCommand::None
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.flags.menu_open || self.riddle.is_some()
    }

    #[cfg(test)]
    pub(crate) fn player_id(&self) -> Option<EntityId> {
        self.player_id
    }

    pub(crate) fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    #[cfg(test)]
    pub(crate) fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub(crate) fn flags(&self) -> SessionFlags {
        self.flags
    }

    #[cfg(test)]
    pub(crate) fn riddle(&self) -> Option<ActiveRiddle> {
        self.riddle
    }

    #[cfg(test)]
    pub(crate) fn barriers(&self) -> &BarrierField {
        &self.barriers
    }

    #[cfg(test)]
    pub(crate) fn blocks(&self) -> &[Rect] {
        &self.blocks
    }

    #[cfg(test)]
    pub(crate) fn chest(&self, id: EntityId) -> Option<&TreasureChest> {
        self.chests.get(&id)
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn status_bars(&self) -> StatusBars {
        StatusBars {
            hp: self.stats.hp(),
            max_hp: self.stats.max_hp(),
            mana: self.stats.mana(),
            max_mana: self.stats.max_mana(),
        }
    }

    pub(crate) fn hud(&self, world: &SceneWorld) -> HudSnapshot {
        let inventory = self
            .inventory
            .items()
            .iter()
            .map(|item| item.display_name())
            .collect();
        let riddle = self.riddle.map(|_| RiddleView {
            question: self.config.riddle.question.clone(),
            options: self.config.riddle.options.clone(),
        });

        HudSnapshot {
            hp: self.stats.hp(),
            max_hp: self.stats.max_hp(),
            mana: self.stats.mana(),
            max_mana: self.stats.max_mana(),
            score: self.stats.score(),
            attack_bonus: self.stats.attack_bonus(),
            health_potions: self.inventory.potion_count(ItemCategory::HealthPotion),
            mana_potions: self.inventory.potion_count(ItemCategory::ManaPotion),
            inventory,
            inventory_capacity: self.inventory.max_slots(),
            free_slots: self.inventory.empty_slots(),
            flags: self.flags,
            nearby_chest: self.nearest_chest_in_range(world),
            barrier_nearby: self.barrier_nearby.is_some(),
            riddle,
            persistence: self.persistence.clone(),
        }
    }

    pub(crate) fn answer_riddle(&mut self, option: usize, world: &mut SceneWorld) -> Option<RiddleOutcome> {
        let riddle = self.riddle.take()?;
        let correct = option == self.config.riddle.correct_option;
        info!(option, correct, group = riddle.barrier_group, "riddle_answered");
        if !correct {
            return Some(RiddleOutcome::Wrong);
        }
        if self.barriers.unlock(riddle.barrier_group, world) {
            if let Some(grid) = world.tile_grid() {
                self.rebuild_blocks(grid);
            }
            info!(group = riddle.barrier_group, blocks = self.blocks.len(), "barrier_unlocked");
        }
        Some(RiddleOutcome::Solved)
    }

    pub(crate) fn capture_save_state(&self, world: &SceneWorld) -> Result<SaveState, SaveError> {
        let player = self
            .live_player(world)
            .and_then(|id| world.find_entity(id))
            .ok_or(SaveError::NoPlayer)?;
        Ok(SaveState {
            hp: self.stats.hp(),
            mana: self.stats.mana(),
            position: player.position.into(),
            inventory: self.inventory.items().to_vec(),
            music_paused: self.flags.music_paused,
        })
    }

    pub(crate) fn apply_save_state(&mut self, state: SaveState, world: &mut SceneWorld) -> Result<(), SaveError> {
        let world_size = world
            .tile_grid()
            .map(|grid| grid.world_size())
            .unwrap_or(Vec2::ZERO);
        validate_save_state(&state, &self.config, world_size, &self.blocks)?;
        let player_id = self.live_player(world).ok_or(SaveError::NoPlayer)?;
        let player = world.find_entity_mut(player_id).ok_or(SaveError::NoPlayer)?;

        player.position = state.position.into();
        player.motion = Vec2::ZERO;
        let center = player.center();
        self.stats.restore_pools(state.hp, state.mana);
        self.inventory.replace_items(state.inventory);
        self.flags.music_paused = state.music_paused;
        self.follow_camera(world, center);
        Ok(())
    }

    pub(crate) fn save_to_path(&self, world: &SceneWorld, path: &Path) -> Result<(), SaveError> {
        let state = self.capture_save_state(world)?;
        write_save_file(path, &state)
    }

    pub(crate) fn load_from_path(&mut self, world: &mut SceneWorld, path: &Path) -> Result<(), SaveError> {
        let state = read_save_file(path)?;
        self.apply_save_state(state, world)
    }

    fn handle_session_input(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        if input.pressed(InputAction::ToggleMenu) {
            if self.riddle.take().is_some() {
                info!("riddle_dismissed");
            } else {
                self.flags.menu_open = !self.flags.menu_open;
                info!(open = self.flags.menu_open, "menu_toggled");
            }
        }
        if input.pressed(InputAction::ToggleMusic) {
            self.flags.music_paused = !self.flags.music_paused;
            info!(paused = self.flags.music_paused, "music_toggled");
        }
        if input.pressed(InputAction::ToggleInventory) {
            self.flags.inventory_open = !self.flags.inventory_open;
            debug!(open = self.flags.inventory_open, "inventory_toggled");
        }
        if input.pressed(InputAction::Save) {
            self.save_requested(world);
        }
        if input.pressed(InputAction::Load) {
            self.load_requested(world);
        }

        if self.riddle.is_some() {
            let answer = InputAction::ALL
                .into_iter()
                .filter(|action| input.pressed(*action))
                .find_map(InputAction::answer_option);
            if let Some(option) = answer {
                self.answer_riddle(option, world);
            }
        }
    }

    fn handle_action_input(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        if input.pressed(InputAction::UseHealthPotion) {
            if self.inventory.has_category(ItemCategory::HealthPotion) {
                let used = self.inventory.use_hp_potion(&mut self.stats);
                debug!(used, hp = self.stats.hp(), "health_potion_used");
            } else {
                debug!("health_potion_missing");
            }
        }
        if input.pressed(InputAction::UseManaPotion) {
            if self.inventory.has_category(ItemCategory::ManaPotion) {
                let used = self.inventory.use_mana_potion(&mut self.stats);
                debug!(used, mana = self.stats.mana(), "mana_potion_used");
            } else {
                debug!("mana_potion_missing");
            }
        }

        let Some(player_id) = self.live_player(world) else {
            return;
        };
        if input.pressed(InputAction::Attack) {
            if let Some((id, hitbox)) = try_spawn_attack(
                world,
                player_id,
                &mut self.stats,
                self.config.attack_mana_cost,
                self.config.tile_size,
            ) {
                self.hitboxes.insert(id, hitbox);
            }
        }
        if input.pressed(InputAction::Interact) {
            let group = self
                .player_center(world)
                .and_then(|center| self.barrier_group_in_range(center));
            if let Some(barrier_group) = group {
                self.riddle = Some(ActiveRiddle { barrier_group });
                info!(group = barrier_group, "riddle_opened");
            }
        }
    }

    fn move_player(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        let Some(player_id) = self.live_player(world) else {
            return;
        };
        let Some(player) = world.find_entity_mut(player_id) else {
            return;
        };
        let intent = read_move_intent(input, self.config.player_speed);
        if let Some(facing) = intent.facing {
            player.facing = facing;
        }
        player.motion = intent.velocity;
        player.frame = advance_walk_animation(&mut self.player_animator, player.facing, player.motion);

        let resolved = resolve_move(
            player.rect(),
            player.motion,
            &self.blocks,
            self.config.hit_selection,
        );
        player.position = resolved.rect.position();
        player.motion = Vec2::ZERO;
    }

    fn move_enemies(&mut self, world: &mut SceneWorld) {
        let player_center = self.player_center(world);
        let enemy_ids = world
            .entities()
            .iter()
            .filter(|entity| entity.kind.is_hostile() && !world.is_despawn_pending(entity.id))
            .map(|entity| entity.id)
            .collect::<Vec<_>>();

        for enemy_id in enemy_ids {
            let Some(agent) = self.enemies.get_mut(&enemy_id) else {
                continue;
            };
            let Some(enemy) = world.find_entity_mut(enemy_id) else {
                continue;
            };
            let decision = decide_pursuit(enemy.center(), player_center, agent);
            if decision.state != agent.state {
                debug!(enemy = enemy_id.0, state = ?decision.state, "enemy_state_changed");
                agent.state = decision.state;
            }
            if let Some(facing) = decision.facing {
                enemy.facing = facing;
            }
            enemy.motion = decision.velocity;
            enemy.frame = advance_walk_animation(&mut agent.animator, enemy.facing, enemy.motion);

            let resolved = resolve_move(
                enemy.rect(),
                enemy.motion,
                &self.blocks,
                self.config.hit_selection,
            );
            enemy.position = resolved.rect.position();
            enemy.motion = Vec2::ZERO;
        }
    }

    fn resolve_combat(&mut self, world: &mut SceneWorld) {
        for hitbox_id in world.ids_of_kind(EntityKind::Attack) {
            let Some(hitbox) = self.hitboxes.get_mut(&hitbox_id) else {
                continue;
            };
            match advance_hitbox(world, hitbox_id, hitbox) {
                HitboxOutcome::Active => {}
                HitboxOutcome::Expired => {
                    self.hitboxes.remove(&hitbox_id);
                }
                HitboxOutcome::Struck { killed } => {
                    for enemy_id in &killed {
                        self.enemies.remove(enemy_id);
                    }
                    self.hitboxes.remove(&hitbox_id);
                }
            }
        }

        let Some(player_id) = self.player_id else {
            return;
        };
        match resolve_contact_damage(world, player_id, &mut self.stats) {
            Some(DamageOutcome::Damaged { hp }) => {
                info!(
                    hp,
                    max_hp = self.stats.max_hp(),
                    cooldown = self.stats.damage_cooldown(),
                    "player_damaged"
                );
            }
            Some(DamageOutcome::Died) => {
                world.despawn(player_id);
                self.player_id = None;
                self.flags.game_over = true;
                info!(ticks = self.ticks, score = self.stats.score(), "player_died");
                info!("game_over");
            }
            Some(DamageOutcome::Ignored) | None => {}
        }
    }

    fn collect_pickups(&mut self, world: &mut SceneWorld) {
        let Some(player_rect) = self
            .live_player(world)
            .and_then(|id| world.find_entity(id))
            .map(|player| player.rect())
        else {
            return;
        };

        for pickup_id in world.ids_of_kind(EntityKind::ItemPickup) {
            let touching = world
                .find_entity(pickup_id)
                .is_some_and(|pickup| player_rect.overlaps(&pickup.rect()));
            if !touching {
                continue;
            }
            let Some(item) = self.pickups.get(&pickup_id) else {
                continue;
            };
            // A full inventory leaves the pickup in the world.
            if self.inventory.add_item(item.clone()) {
                debug!(item = %item.name, slots_used = self.inventory.len(), "item_picked_up");
                self.pickups.remove(&pickup_id);
                world.despawn(pickup_id);
            }
        }
    }

    fn update_chests(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        // A riddle here means this tick's press went to a barrier.
        if !input.is_down(InputAction::Interact) || self.riddle.is_some() {
            return;
        }
        let Some(player_center) = self.player_center(world) else {
            return;
        };

        for chest_id in world.ids_of_kind(EntityKind::TreasureChest) {
            let Some(chest_center) = world.find_entity(chest_id).map(|chest| chest.center()) else {
                continue;
            };
            let Some(chest) = self.chests.get_mut(&chest_id) else {
                continue;
            };
            if chest.is_open()
                || !within_interaction_range(
                    player_center,
                    chest_center,
                    self.config.chest_interaction_range,
                )
            {
                continue;
            }
            if let Some(opening) = chest.open(&mut self.inventory) {
                show_chest_opened(world, chest_id);
                info!(
                    chest = chest_id.0,
                    offered = chest.contents().len(),
                    granted = opening.granted,
                    dropped = opening.dropped.len(),
                    "chest_opened"
                );
            }
        }
    }

    fn save_requested(&mut self, world: &SceneWorld) {
        let result = match self.save_path.as_deref() {
            Some(path) => self.save_to_path(world, path).map(|()| path.to_path_buf()),
            None => Err(SaveError::NoSavePath),
        };
        match result {
            Ok(path) => {
                info!(path = %path.display(), "save_written");
                self.persistence = Some(PersistenceStatus::Saved);
            }
            Err(error) => {
                warn!(error = %error, "save_failed");
                self.persistence = Some(PersistenceStatus::SaveFailed(error.to_string()));
            }
        }
    }

    fn load_requested(&mut self, world: &mut SceneWorld) {
        let result = match self.save_path.clone() {
            Some(path) => self.load_from_path(world, &path).map(|()| path),
            None => Err(SaveError::NoSavePath),
        };
        match result {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    hp = self.stats.hp(),
                    mana = self.stats.mana(),
                    items = self.inventory.len(),
                    "save_loaded"
                );
                self.persistence = Some(PersistenceStatus::Loaded);
            }
            Err(error) => {
                warn!(error = %error, "load_failed");
                self.persistence = Some(PersistenceStatus::LoadFailed(error.to_string()));
            }
        }
    }

    fn live_player(&self, world: &SceneWorld) -> Option<EntityId> {
        self.player_id.filter(|id| world.is_alive(*id))
    }

    fn player_center(&self, world: &SceneWorld) -> Option<Vec2> {
        self.live_player(world)
            .and_then(|id| world.find_entity(id))
            .map(|player| player.center())
    }

    fn barrier_group_in_range(&self, center: Vec2) -> Option<usize> {
        self.barriers.locked_group_in_range(
            center,
            self.config.chest_interaction_range,
            self.config.tile_size,
        )
    }

    fn nearest_chest_in_range(&self, world: &SceneWorld) -> Option<ChestPrompt> {
        let player_center = self.player_center(world)?;
        let mut nearest: Option<(ChestPrompt, f32)> = None;
        for chest_id in world.ids_of_kind(EntityKind::TreasureChest) {
            let (Some(entity), Some(chest)) = (world.find_entity(chest_id), self.chests.get(&chest_id))
            else {
                continue;
            };
            let distance = player_center.distance(entity.center());
            if distance > self.config.chest_interaction_range {
                continue;
            }
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((
                    ChestPrompt {
                        is_open: chest.is_open(),
                    },
                    distance,
                ));
            }
        }
        nearest.map(|(prompt, _)| prompt)
    }

    fn rebuild_blocks(&mut self, grid: &TileGrid) {
        let locked = self
            .barriers
            .locked_cells()
            .filter_map(|(x, y)| grid.tile_rect(x, y));
        self.blocks = grid.wall_rects().iter().copied().chain(locked).collect();
    }

    fn follow_camera(&self, world: &mut SceneWorld, target_center: Vec2) {
        let Some(world_size) = world.tile_grid().map(|grid| grid.world_size()) else {
            return;
        };
        let viewport = Vec2::new(
            self.config.screen_width as f32,
            self.config.screen_height as f32,
        );
        world
            .camera_mut()
            .follow_clamped(target_center, viewport, world_size);
    }
}

use super::camera::Camera2D;
use super::geometry::{Facing, Rect, Vec2};
use super::input::{ActionStates, InputAction};
use super::tilemap::TileGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    GameOver,
    Quit,
}

/// One tick of sampled input. `is_down` is level-triggered, `pressed` is true
/// only on the tick the key went down.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    down: ActionStates,
    pressed: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, down: ActionStates, pressed: ActionStates) -> Self {
        Self {
            quit_requested,
            down,
            pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down.is_down(action)
    }

    pub fn pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.down.set(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction, pressed: bool) -> Self {
        self.pressed.set(action, pressed);
        if pressed {
            self.down.set(action, true);
        }
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Enemy,
    Devil,
    Attack,
    ItemPickup,
    TreasureChest,
    Barrier,
}

impl EntityKind {
    pub fn is_hostile(self) -> bool {
        matches!(self, Self::Enemy | Self::Devil)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawLayer {
    Item = 0,
    Ground = 1,
    Block = 2,
    Enemy = 3,
    Player = 4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderableKind {
    Placeholder,
    Sprite(String),
    Directional(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub placeholder_rgba: [u8; 4],
    pub debug_name: &'static str,
}

#[derive(Debug, Clone)]
pub struct SpawnDesc {
    pub kind: EntityKind,
    pub layer: DrawLayer,
    pub position: Vec2,
    pub size: Vec2,
    pub facing: Facing,
    pub renderable: RenderableDesc,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub layer: DrawLayer,
    pub position: Vec2,
    pub size: Vec2,
    pub facing: Facing,
    pub motion: Vec2,
    pub renderable: RenderableDesc,
    pub frame: u32,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn rect(&self) -> Rect {
        Rect::from_position_size(self.position, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusBars {
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
    camera: Camera2D,
    tile_grid: Option<TileGrid>,
}

impl SceneWorld {
    /// Queues a spawn. The entity joins the arena at the next `apply_pending`,
    /// so systems iterating this tick never see it.
    pub fn spawn(&mut self, desc: SpawnDesc) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            kind: desc.kind,
            layer: desc.layer,
            position: desc.position,
            size: desc.size,
            facing: desc.facing,
            motion: Vec2::ZERO,
            renderable: desc.renderable,
            frame: 0,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn is_despawn_pending(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        !self.is_despawn_pending(id) && self.find_entity(id).is_some()
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_spawns
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }

        if !self.pending_spawns.is_empty() {
            for mut entity in self.pending_spawns.drain(..) {
                entity.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.entities.push(entity);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
        self.camera = Camera2D::default();
        self.tile_grid = None;
    }

    pub fn set_tile_grid(&mut self, tile_grid: TileGrid) {
        self.tile_grid = Some(tile_grid);
    }

    pub fn tile_grid(&self) -> Option<&TileGrid> {
        self.tile_grid.as_ref()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.kind == kind && !self.is_despawn_pending(entity.id))
            .map(|entity| entity.id)
            .collect()
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn draw_order(&self) -> Vec<&Entity> {
        let mut ordered = self.entities.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|entity| (entity.layer, entity.applied_spawn_order));
        ordered
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn render(&mut self, world: &SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn status_bars(&self, _world: &SceneWorld) -> Option<StatusBars> {
        None
    }
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

pub(crate) struct SceneHost {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    loaded: bool,
}

impl SceneHost {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            loaded: false,
        }
    }

    pub(crate) fn start(&mut self) {
        if !self.loaded {
            self.scene.load(&mut self.world);
            self.loaded = true;
        }
        self.world.apply_pending();
    }

    pub(crate) fn step(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let command = self.scene.update(fixed_dt_seconds, input, &mut self.world);
        self.world.apply_pending();
        command
    }

    pub(crate) fn restart(&mut self) {
        if self.loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.loaded = false;
        self.start();
    }

    pub(crate) fn render(&mut self) {
        self.scene.render(&self.world);
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn status_bars(&self) -> Option<StatusBars> {
        self.scene.status_bars(&self.world)
    }

    pub(crate) fn title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn stop(&mut self) {
        if !self.loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(kind: EntityKind, layer: DrawLayer, x: f32) -> SpawnDesc {
        SpawnDesc {
            kind,
            layer,
            position: Vec2::new(x, 0.0),
            size: Vec2::new(32.0, 32.0),
            facing: Facing::Down,
            renderable: RenderableDesc {
                kind: RenderableKind::Placeholder,
                placeholder_rgba: [255, 255, 255, 255],
                debug_name: "test",
            },
        }
    }

    struct TestScene {
        spawn_count: usize,
    }

    impl Scene for TestScene {
        fn load(&mut self, world: &mut SceneWorld) {
            for index in 0..self.spawn_count {
                world.spawn(desc(EntityKind::Enemy, DrawLayer::Enemy, index as f32));
            }
            world.apply_pending();
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            world: &mut SceneWorld,
        ) -> SceneCommand {
            if let Some(id) = world.entities().first().map(|entity| entity.id) {
                if let Some(entity) = world.find_entity_mut(id) {
                    entity.position.x += 1.0;
                }
            }
            SceneCommand::None
        }

        fn render(&mut self, _world: &SceneWorld) {}

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn(desc(EntityKind::Attack, DrawLayer::Player, 0.0));
        assert_eq!(world.entity_count(), 0);
        assert!(world.find_entity(id).is_none());

        world.apply_pending();
        assert_eq!(world.entity_count(), 1);
        assert!(world.is_alive(id));
    }

    #[test]
    fn despawned_entity_stays_visible_until_end_of_tick() {
        let mut world = SceneWorld::default();
        let id = world.spawn(desc(EntityKind::Enemy, DrawLayer::Enemy, 0.0));
        world.apply_pending();

        assert!(world.despawn(id));
        assert!(world.find_entity(id).is_some());
        assert!(world.is_despawn_pending(id));
        assert!(!world.is_alive(id));
        assert!(world.ids_of_kind(EntityKind::Enemy).is_empty());

        world.apply_pending();
        assert!(world.find_entity(id).is_none());
        assert!(!world.despawn(id));
    }

    #[test]
    fn duplicate_pending_despawns_are_idempotent() {
        let mut world = SceneWorld::default();
        let doomed = world.spawn(desc(EntityKind::Enemy, DrawLayer::Enemy, 0.0));
        let survivor = world.spawn(desc(EntityKind::Enemy, DrawLayer::Enemy, 32.0));
        world.apply_pending();

        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(survivor).is_some());
    }

    #[test]
    fn despawn_of_pending_spawn_drops_it() {
        let mut world = SceneWorld::default();
        let id = world.spawn(desc(EntityKind::Attack, DrawLayer::Player, 0.0));
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn draw_order_sorts_by_layer_then_spawn_order() {
        let mut world = SceneWorld::default();
        let player = world.spawn(desc(EntityKind::Player, DrawLayer::Player, 0.0));
        let chest = world.spawn(desc(EntityKind::TreasureChest, DrawLayer::Ground, 0.0));
        let item_a = world.spawn(desc(EntityKind::ItemPickup, DrawLayer::Item, 0.0));
        let enemy = world.spawn(desc(EntityKind::Enemy, DrawLayer::Enemy, 0.0));
        let item_b = world.spawn(desc(EntityKind::ItemPickup, DrawLayer::Item, 0.0));
        world.apply_pending();

        let order = world
            .draw_order()
            .iter()
            .map(|entity| entity.id)
            .collect::<Vec<_>>();
        assert_eq!(order, vec![item_a, item_b, chest, enemy, player]);
    }

    #[test]
    fn pressed_implies_down_for_the_tick() {
        let snapshot = InputSnapshot::empty().with_action_pressed(InputAction::Attack, true);
        assert!(snapshot.pressed(InputAction::Attack));
        assert!(snapshot.is_down(InputAction::Attack));

        let held = InputSnapshot::empty().with_action_down(InputAction::Interact, true);
        assert!(held.is_down(InputAction::Interact));
        assert!(!held.pressed(InputAction::Interact));
    }

    #[test]
    fn restart_reloads_a_fresh_session() {
        let mut host = SceneHost::new(Box::new(TestScene { spawn_count: 2 }));
        host.start();

        let _ = host.step(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(host.world().entities()[0].position.x, 1.0);

        host.restart();
        assert_eq!(host.world().entity_count(), 2);
        assert_eq!(host.world().entities()[0].position.x, 0.0);
        assert!(host.world().entities()[0].id.0 >= 2);
    }

    #[test]
    fn stop_unloads_and_clears_world() {
        let mut host = SceneHost::new(Box::new(TestScene { spawn_count: 3 }));
        host.start();
        assert_eq!(host.world().entity_count(), 3);

        host.stop();
        assert_eq!(host.world().entity_count(), 0);
        assert_eq!(host.world().camera().position, Vec2::ZERO);
        host.stop();
    }
}

use std::path::PathBuf;

use engine::{
    EntityId, EntityKind, Facing, InputAction, InputSnapshot, RenderableKind, Scene,
    SceneCommand, SceneWorld, Vec2,
};
use serde_json::json;
use tempfile::TempDir;

use super::config::GameConfig;
use super::items::ItemCategory;
use super::save::{SaveError, SAVE_FILE_NAME};
use super::scene_impl::GameplayScene;
use super::session::{ChestPrompt, PersistenceStatus, RiddleOutcome, Session};
use super::world_loader::{parse_world, DEFAULT_MAP};

const TILE: f32 = 32.0;

fn start_with(map: &str, config: GameConfig, save_path: Option<PathBuf>) -> (SceneWorld, Session) {
    let layout = parse_world(map, &config).expect("layout");
    let mut world = SceneWorld::default();
    let session = Session::start(&config, &layout, &mut world, save_path);
    world.apply_pending();
    (world, session)
}

fn start(map: &str, config: GameConfig) -> (SceneWorld, Session) {
    start_with(map, config, None)
}

fn step(session: &mut Session, world: &mut SceneWorld, input: InputSnapshot) -> SceneCommand {
    let command = session.tick(&input, world);
    world.apply_pending();
    command
}

fn idle() -> InputSnapshot {
    InputSnapshot::empty()
}

fn press(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_pressed(action, true)
}

fn hold(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_down(action, true)
}

fn first_of_kind(world: &SceneWorld, kind: EntityKind) -> Option<EntityId> {
    world.ids_of_kind(kind).into_iter().next()
}

fn player_position(world: &SceneWorld, session: &Session) -> Vec2 {
    let id = session.player_id().expect("player id");
    world.find_entity(id).expect("player entity").position
}

fn calm_enemies() -> GameConfig {
    GameConfig {
        enemy_detection_range: 10.0,
        ..GameConfig::default()
    }
}

#[test]
fn attack_right_spawns_hitbox_one_tile_over_and_kills_enemy_next_tick() {
    let (mut world, mut session) = start("BBBBB\nBPE.B\nBBBBB", calm_enemies());
    let player_id = session.player_id().expect("player");
    world.find_entity_mut(player_id).expect("player").facing = Facing::Right;
    let enemy_id = first_of_kind(&world, EntityKind::Enemy).expect("enemy");

    step(&mut session, &mut world, press(InputAction::Attack));
    assert_eq!(session.stats().mana(), 170);
    let hitbox_id = first_of_kind(&world, EntityKind::Attack).expect("hitbox spawned");
    let hitbox = world.find_entity(hitbox_id).expect("hitbox");
    assert_eq!(hitbox.position, Vec2::new(TILE + TILE, TILE));
    assert_eq!(hitbox.facing, Facing::Right);
    assert!(world.find_entity(enemy_id).is_some());

    step(&mut session, &mut world, idle());
    assert!(world.find_entity(enemy_id).is_none());
    assert!(world.find_entity(hitbox_id).is_none());
    assert_eq!(session.stats().hp(), 6);
}

#[test]
fn attack_is_refused_without_enough_mana() {
    let config = GameConfig {
        max_mana: 15,
        ..calm_enemies()
    };
    let (mut world, mut session) = start("BBBBB\nBP..B\nBBBBB", config);

    step(&mut session, &mut world, press(InputAction::Attack));
    assert_eq!(session.stats().mana(), 5);
    for _ in 0..12 {
        step(&mut session, &mut world, idle());
    }
    step(&mut session, &mut world, press(InputAction::Attack));
    assert_eq!(session.stats().mana(), 5);
    assert!(first_of_kind(&world, EntityKind::Attack).is_none());
}

#[test]
fn unhit_attack_lives_exactly_ten_ticks() {
    let (mut world, mut session) = start("BBBBBB\nBP...B\nB....B\nBBBBBB", GameConfig::default());

    step(&mut session, &mut world, press(InputAction::Attack));
    let hitbox_id = first_of_kind(&world, EntityKind::Attack).expect("hitbox");
    for tick in 1..10 {
        step(&mut session, &mut world, idle());
        assert!(world.is_alive(hitbox_id), "hitbox removed early at tick {tick}");
    }
    step(&mut session, &mut world, idle());
    assert!(world.find_entity(hitbox_id).is_none());
}

#[test]
fn contact_damage_repeats_only_after_cooldown() {
    let (mut world, mut session) = start("BBBBBB\nBPE..B\nBBBBBB", GameConfig::default());

    let mut damage_ticks = Vec::new();
    let mut last_hp = session.stats().hp();
    for tick in 1..=250u32 {
        step(&mut session, &mut world, idle());
        let hp = session.stats().hp();
        if hp != last_hp {
            damage_ticks.push(tick);
            last_hp = hp;
        }
    }

    assert_eq!(damage_ticks, vec![1, 121, 241]);
    assert_eq!(session.stats().hp(), 3);
}

#[test]
fn enemy_outside_detection_range_waits_then_pursues_next_tick() {
    let (mut world, mut session) = start("BBBBBBBBBBBB\nBP.......E.B\nBBBBBBBBBBBB", GameConfig::default());
    let player_id = session.player_id().expect("player");
    let enemy_id = first_of_kind(&world, EntityKind::Enemy).expect("enemy");
    let enemy_start = world.find_entity(enemy_id).expect("enemy").position;
    let enemy_center_x = enemy_start.x + TILE / 2.0;

    world.find_entity_mut(player_id).expect("player").position.x = enemy_center_x - 100.0 - TILE / 2.0;
    step(&mut session, &mut world, idle());
    assert_eq!(world.find_entity(enemy_id).expect("enemy").position, enemy_start);

    world.find_entity_mut(player_id).expect("player").position.x = enemy_center_x - 70.0 - TILE / 2.0;
    step(&mut session, &mut world, idle());
    let enemy = world.find_entity(enemy_id).expect("enemy");
    assert_eq!(enemy.position, Vec2::new(enemy_start.x - 2.0, enemy_start.y));
    assert_eq!(enemy.facing, Facing::Left);
}

#[test]
fn devil_pursues_like_an_enemy() {
    let (mut world, mut session) = start("BBBBBB\nBP.D.B\nBBBBBB", GameConfig::default());
    let devil_id = first_of_kind(&world, EntityKind::Devil).expect("devil");
    let before = world.find_entity(devil_id).expect("devil").position;

    step(&mut session, &mut world, idle());
    let devil = world.find_entity(devil_id).expect("devil");
    assert_eq!(devil.position.x, before.x - 2.0);
    assert_eq!(
        devil.renderable.kind,
        RenderableKind::Directional("devil".to_string())
    );
}

#[test]
fn walking_into_a_wall_snaps_flush_and_keeps_other_axis() {
    let (mut world, mut session) = start("BBBBB\nBP..B\nB...B\nBBBBB", GameConfig::default());

    for _ in 0..20 {
        step(&mut session, &mut world, hold(InputAction::MoveRight));
        let position = player_position(&world, &session);
        let player_rect = world
            .find_entity(session.player_id().expect("player"))
            .expect("player")
            .rect();
        assert!(session.blocks().iter().all(|block| !block.overlaps(&player_rect)));
        assert_eq!(position.y, TILE);
    }
    assert_eq!(player_position(&world, &session), Vec2::new(4.0 * TILE - TILE, TILE));
}

#[test]
fn diagonal_movement_slides_along_walls() {
    let (mut world, mut session) = start("BBBBB\nBP..B\nB...B\nBBBBB", GameConfig::default());
    let input = InputSnapshot::empty()
        .with_action_down(InputAction::MoveRight, true)
        .with_action_down(InputAction::MoveUp, true);

    step(&mut session, &mut world, input);
    assert_eq!(player_position(&world, &session), Vec2::new(TILE + 5.0, TILE));
    let facing = world
        .find_entity(session.player_id().expect("player"))
        .expect("player")
        .facing;
    assert_eq!(facing, Facing::Up);
}

#[test]
fn pickups_fill_inventory_and_stay_when_full() {
    let config = GameConfig {
        inventory_slots: 1,
        ..GameConfig::default()
    };
    let (mut world, mut session) = start("BBBBBB\nBPHM.B\nBBBBBB", config);
    assert_eq!(world.ids_of_kind(EntityKind::ItemPickup).len(), 2);

    for _ in 0..30 {
        step(&mut session, &mut world, hold(InputAction::MoveRight));
    }

    let inventory = session.inventory();
    assert_eq!(inventory.len(), 1);
    assert_eq!(
        inventory.get_item(0).map(|item| item.category),
        Some(ItemCategory::HealthPotion)
    );
    let remaining = world.ids_of_kind(EntityKind::ItemPickup);
    assert_eq!(remaining.len(), 1);
}

#[test]
fn health_potion_key_is_a_noop_at_full_health() {
    let (mut world, mut session) = start("BBBBB\nBPH.B\nBBBBB", GameConfig::default());
    for _ in 0..10 {
        step(&mut session, &mut world, hold(InputAction::MoveRight));
    }
    assert_eq!(session.inventory().len(), 1);

    step(&mut session, &mut world, press(InputAction::UseHealthPotion));
    assert_eq!(session.inventory().len(), 1);
    assert_eq!(session.stats().hp(), 6);
}

#[test]
fn chest_with_two_free_slots_grants_two_and_opens_once() {
    let config = GameConfig {
        inventory_slots: 2,
        ..GameConfig::default()
    };
    let (mut world, mut session) = start("BBBBB\nBPT.B\nBBBBB", config);
    let chest_id = first_of_kind(&world, EntityKind::TreasureChest).expect("chest");

    let hud = session.hud(&world);
    assert_eq!(hud.nearby_chest, Some(ChestPrompt { is_open: false }));
    assert_eq!(hud.free_slots, 2);

    step(&mut session, &mut world, hold(InputAction::Interact));
    assert!(session.chest(chest_id).expect("chest").is_open());
    assert_eq!(session.inventory().len(), 2);
    assert_eq!(
        world.find_entity(chest_id).expect("chest").renderable.kind,
        RenderableKind::Sprite("objects/chest_open".to_string())
    );

    for _ in 0..5 {
        step(&mut session, &mut world, hold(InputAction::Interact));
    }
    assert_eq!(session.inventory().len(), 2);
    let hud = session.hud(&world);
    assert_eq!(hud.nearby_chest, Some(ChestPrompt { is_open: true }));
    assert_eq!(hud.free_slots, 0);
    assert_eq!(hud.inventory, vec!["Health Potion".to_string(), "Mana Potion".to_string()]);
}

#[test]
fn chest_out_of_range_stays_closed() {
    let (mut world, mut session) = start("BBBBBB\nBP..TB\nBBBBBB", GameConfig::default());
    let chest_id = first_of_kind(&world, EntityKind::TreasureChest).expect("chest");

    step(&mut session, &mut world, hold(InputAction::Interact));
    assert!(!session.chest(chest_id).expect("chest").is_open());
    assert!(session.hud(&world).nearby_chest.is_none());
}

#[test]
fn riddle_barrier_blocks_until_answered_correctly() {
    let (mut world, mut session) = start("BBBBBB\nBPG..B\nBBBBBB", GameConfig::default());
    let barrier_id = first_of_kind(&world, EntityKind::Barrier).expect("barrier");

    step(&mut session, &mut world, hold(InputAction::MoveRight));
    assert_eq!(player_position(&world, &session).x, TILE);
    assert!(session.hud(&world).barrier_nearby);

    step(&mut session, &mut world, press(InputAction::Interact));
    assert!(session.riddle().is_some());
    let hud = session.hud(&world);
    let riddle = hud.riddle.expect("riddle view");
    assert_eq!(riddle.options.len(), 4);
    assert!(riddle.question.contains("without a mouth"));

    // The dialog pauses the world.
    step(&mut session, &mut world, hold(InputAction::MoveRight).with_action_down(InputAction::MoveDown, true));
    assert_eq!(player_position(&world, &session), Vec2::new(TILE, TILE));

    step(&mut session, &mut world, press(InputAction::AnswerOption1));
    assert!(session.riddle().is_none());
    assert!(world.is_alive(barrier_id));
    step(&mut session, &mut world, hold(InputAction::MoveRight));
    assert_eq!(player_position(&world, &session).x, TILE);

    step(&mut session, &mut world, press(InputAction::Interact));
    assert_eq!(session.answer_riddle(1, &mut world), Some(RiddleOutcome::Solved));
    world.apply_pending();
    assert!(world.find_entity(barrier_id).is_none());
    assert!(session.barriers().groups()[0].is_unlocked());

    step(&mut session, &mut world, hold(InputAction::MoveRight));
    assert_eq!(player_position(&world, &session).x, TILE + 5.0);
}

#[test]
fn answering_without_an_open_riddle_does_nothing() {
    let (mut world, mut session) = start("BBBBB\nBP..B\nBBBBB", GameConfig::default());
    assert_eq!(session.answer_riddle(1, &mut world), None);
}

#[test]
fn menu_pauses_simulation_until_closed() {
    let (mut world, mut session) = start("BBBBBB\nBP...B\nBBBBBB", GameConfig::default());

    step(&mut session, &mut world, press(InputAction::ToggleMenu));
    assert!(session.flags().menu_open);
    for _ in 0..3 {
        step(&mut session, &mut world, hold(InputAction::MoveRight));
    }
    assert_eq!(player_position(&world, &session).x, TILE);

    step(&mut session, &mut world, press(InputAction::ToggleMenu));
    step(&mut session, &mut world, hold(InputAction::MoveRight));
    assert_eq!(player_position(&world, &session).x, TILE + 5.0);
}

#[test]
fn inventory_and_music_toggles_are_edge_triggered() {
    let (mut world, mut session) = start("BBBB\nBP.B\nBBBB", GameConfig::default());

    step(&mut session, &mut world, press(InputAction::ToggleInventory));
    step(&mut session, &mut world, hold(InputAction::ToggleInventory));
    assert!(session.flags().inventory_open);

    step(&mut session, &mut world, press(InputAction::ToggleMusic));
    assert!(session.flags().music_paused);
    step(&mut session, &mut world, press(InputAction::ToggleMusic));
    assert!(!session.flags().music_paused);
}

#[test]
fn death_despawns_player_and_reports_game_over() {
    let config = GameConfig {
        max_hp: 1,
        ..GameConfig::default()
    };
    let (mut world, mut session) = start("BBBBBB\nBPE..B\nBBBBBB", config);
    let player_id = session.player_id().expect("player");
    let enemy_id = first_of_kind(&world, EntityKind::Enemy).expect("enemy");

    assert_eq!(step(&mut session, &mut world, idle()), SceneCommand::GameOver);
    assert!(world.find_entity(player_id).is_none());
    assert!(session.player_id().is_none());
    assert!(session.flags().game_over);
    assert!(session.hud(&world).flags.game_over);

    let enemy_before = world.find_entity(enemy_id).expect("enemy").position;
    assert_eq!(step(&mut session, &mut world, idle()), SceneCommand::GameOver);
    assert_eq!(world.find_entity(enemy_id).expect("enemy").position, enemy_before);
}

#[test]
fn camera_follows_player_and_clamps_to_world() {
    let (mut world, mut session) = start(DEFAULT_MAP, calm_enemies());
    assert_eq!(world.camera().position, Vec2::ZERO);
    let player_id = session.player_id().expect("player");

    world.find_entity_mut(player_id).expect("player").position = Vec2::new(1600.0, 800.0);
    step(&mut session, &mut world, idle());
    assert_eq!(world.camera().position, Vec2::new(1616.0 - 512.0, 816.0 - 384.0));

    world.find_entity_mut(player_id).expect("player").position = Vec2::new(2900.0, 1480.0);
    step(&mut session, &mut world, idle());
    assert_eq!(
        world.camera().position,
        Vec2::new(96.0 * TILE - 1024.0, 51.0 * TILE - 768.0)
    );
}

#[test]
fn save_then_load_restores_the_persisted_slice() {
    let temp = TempDir::new().expect("tempdir");
    let save_path = temp.path().join(SAVE_FILE_NAME);
    let (mut world, mut session) =
        start_with("BBBBBBB\nBPH...B\nB.....B\nBBBBBBB", GameConfig::default(), Some(save_path.clone()));

    for _ in 0..10 {
        step(&mut session, &mut world, hold(InputAction::MoveRight));
    }
    step(&mut session, &mut world, press(InputAction::ToggleMusic));
    step(&mut session, &mut world, press(InputAction::Attack));
    let saved_position = player_position(&world, &session);

    step(&mut session, &mut world, press(InputAction::Save));
    assert!(save_path.is_file());
    assert_eq!(session.hud(&world).persistence, Some(PersistenceStatus::Saved));

    for _ in 0..6 {
        step(&mut session, &mut world, hold(InputAction::MoveDown));
    }
    step(&mut session, &mut world, press(InputAction::ToggleMusic));
    step(&mut session, &mut world, press(InputAction::Attack));
    assert_ne!(player_position(&world, &session), saved_position);

    step(&mut session, &mut world, press(InputAction::Load));
    assert_eq!(session.hud(&world).persistence, Some(PersistenceStatus::Loaded));
    assert_eq!(player_position(&world, &session), saved_position);
    assert_eq!(session.stats().mana(), 170);
    assert!(session.flags().music_paused);
    assert_eq!(session.inventory().len(), 1);
}

#[test]
fn failed_load_leaves_session_untouched() {
    let temp = TempDir::new().expect("tempdir");
    let save_path = temp.path().join(SAVE_FILE_NAME);
    let (mut world, mut session) =
        start_with("BBBBB\nBP..B\nBBBBB", GameConfig::default(), Some(save_path.clone()));

    std::fs::write(
        &save_path,
        json!({ "save_version": 1, "checksum": "0", "state": { "hp": 2 } }).to_string(),
    )
    .expect("write corrupt save");
    let before = (
        player_position(&world, &session),
        session.stats().clone(),
        session.inventory().clone(),
    );

    step(&mut session, &mut world, press(InputAction::Load));
    assert!(matches!(
        session.hud(&world).persistence,
        Some(PersistenceStatus::LoadFailed(_))
    ));
    assert_eq!(
        (
            player_position(&world, &session),
            session.stats().clone(),
            session.inventory().clone(),
        ),
        before
    );
}

#[test]
fn save_state_from_another_config_is_rejected_before_applying() {
    let (mut world, mut session) = start("BBBBB\nBP..B\nBBBBB", GameConfig::default());
    let mut state = session.capture_save_state(&world).expect("capture");
    state.hp = 99;

    let error = session
        .apply_save_state(state, &mut world)
        .expect_err("hp above max");
    assert!(matches!(error, SaveError::Invalid { ref path, .. } if path == "hp"));
    assert_eq!(session.stats().hp(), 6);
}

#[test]
fn saved_position_inside_wall_or_past_locked_barrier_is_rejected() {
    let config = GameConfig::default();
    let correct_option = config.riddle.correct_option;
    let (mut world, mut session) = start("BBBBBB\nBP.G.B\nBBBBBB", config);
    let spawn = player_position(&world, &session);

    let mut in_wall = session.capture_save_state(&world).expect("capture");
    in_wall.position.x = 0.0;
    in_wall.position.y = 0.0;
    let error = session
        .apply_save_state(in_wall, &mut world)
        .expect_err("inside wall");
    assert!(matches!(error, SaveError::Invalid { ref path, .. } if path == "position"));

    let mut past_barrier = session.capture_save_state(&world).expect("capture");
    past_barrier.position.x = 4.0 * TILE;
    let error = session
        .apply_save_state(past_barrier.clone(), &mut world)
        .expect_err("barrier still locked");
    assert!(matches!(error, SaveError::Invalid { ref path, .. } if path == "position"));
    assert_eq!(player_position(&world, &session), spawn);

    let player_id = session.player_id().expect("player");
    world.find_entity_mut(player_id).expect("player").position = Vec2::new(2.0 * TILE, TILE);
    step(&mut session, &mut world, press(InputAction::Interact));
    assert_eq!(
        session.answer_riddle(correct_option, &mut world),
        Some(RiddleOutcome::Solved)
    );
    world.apply_pending();

    session
        .apply_save_state(past_barrier, &mut world)
        .expect("barrier unlocked");
    assert_eq!(player_position(&world, &session), Vec2::new(4.0 * TILE, TILE));
}

#[test]
fn interact_press_near_barrier_and_chest_engages_only_the_barrier() {
    let config = GameConfig::default();
    let wrong_option = (config.riddle.correct_option + 1) % 4;
    let (mut world, mut session) = start("BBBBB\nB.T.B\nBPG.B\nBBBBB", config);
    let chest_id = first_of_kind(&world, EntityKind::TreasureChest).expect("chest");

    step(&mut session, &mut world, press(InputAction::Interact));
    assert!(session.riddle().is_some());
    assert!(!session.chest(chest_id).expect("chest").is_open());
    assert_eq!(session.inventory().len(), 0);

    assert_eq!(
        session.answer_riddle(wrong_option, &mut world),
        Some(RiddleOutcome::Wrong)
    );
    step(&mut session, &mut world, hold(InputAction::Interact));
    assert!(session.riddle().is_none());
    assert!(session.chest(chest_id).expect("chest").is_open());
}

#[test]
fn save_without_path_reports_failure() {
    let (mut world, mut session) = start("BBBB\nBP.B\nBBBB", GameConfig::default());
    step(&mut session, &mut world, press(InputAction::Save));
    assert!(matches!(
        session.hud(&world).persistence,
        Some(PersistenceStatus::SaveFailed(_))
    ));
}

#[test]
fn draw_order_sorts_items_under_chests_under_enemies_under_player() {
    let (world, _session) = start("BBBBBBB\nBPETHGB\nBBBBBBB", calm_enemies());
    let kinds = world
        .draw_order()
        .into_iter()
        .map(|entity| entity.kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            EntityKind::ItemPickup,
            EntityKind::TreasureChest,
            EntityKind::Barrier,
            EntityKind::Enemy,
            EntityKind::Player,
        ]
    );
}

#[test]
fn scene_reports_status_bars_and_title() {
    let mut scene =
        GameplayScene::new(GameConfig::default(), "BBBBB\nBPT.B\nBBBBB", None).expect("scene");
    let mut world = SceneWorld::default();
    assert!(scene.status_bars(&world).is_none());

    scene.load(&mut world);
    world.apply_pending();
    let bars = scene.status_bars(&world).expect("bars");
    assert_eq!((bars.hp, bars.max_hp, bars.mana, bars.max_mana), (6, 6, 180, 180));
    let title = scene.debug_title(&world).expect("title");
    assert!(title.contains("HP 6/6"));
    assert!(title.contains("Press E to open treasure chest"));

    assert_eq!(
        scene.update(1.0 / 60.0, &press(InputAction::Attack), &mut world),
        SceneCommand::None
    );
    world.apply_pending();
    assert_eq!(scene.session().expect("session").stats().mana(), 170);

    let closing = InputSnapshot::empty().with_quit_requested(true);
    assert_eq!(scene.update(1.0 / 60.0, &closing, &mut world), SceneCommand::Quit);

    scene.unload(&mut world);
    assert!(scene.session().is_none());
}

#[test]
fn default_map_builds_a_scene() {
    let scene = super::build_scene(GameConfig::default(), None);
    assert!(scene.is_ok());
}

use engine::{
    AnimationClip, Animator, DrawLayer, EntityId, EntityKind, Facing, RenderableDesc,
    RenderableKind, SceneWorld, SpawnDesc, Vec2,
};
use tracing::debug;

use super::player::{DamageOutcome, PlayerStats};

pub(crate) const ATTACK_CLIP: AnimationClip = AnimationClip::once(0, 5, 2);
pub(crate) const CONTACT_DAMAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hitbox {
    pub(crate) facing: Facing,
    pub(crate) animator: Animator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HitboxOutcome {
    Active,
    Expired,
    Struck { killed: Vec<EntityId> },
}

pub(crate) fn attack_origin(player_position: Vec2, facing: Facing, tile_size: f32) -> Vec2 {
    let step = facing.unit_offset();
    Vec2::new(
        player_position.x + step.x * tile_size,
        player_position.y + step.y * tile_size,
    )
}

pub(crate) fn try_spawn_attack(
    world: &mut SceneWorld,
    player_id: EntityId,
    stats: &mut PlayerStats,
    attack_mana_cost: u32,
    tile_size: f32,
) -> Option<(EntityId, Hitbox)> {
    if !stats.can_attack() || !world.is_alive(player_id) {
        return None;
    }
    let (position, facing) = {
        let player = world.find_entity(player_id)?;
        (player.position, player.facing)
    };
    if !stats.use_mana(attack_mana_cost) {
        return None;
    }

    let origin = attack_origin(position, facing, tile_size);
    let id = world.spawn(hitbox_spawn_desc(origin, facing, tile_size));
    debug!(
        attack = id.0,
        facing = facing.as_token(),
        x = origin.x,
        y = origin.y,
        mana = stats.mana(),
        "attack_spawned"
    );
    Some((
        id,
        Hitbox {
            facing,
            animator: Animator::new(ATTACK_CLIP),
        },
    ))
}

pub(crate) fn advance_hitbox(
    world: &mut SceneWorld,
    hitbox_id: EntityId,
    hitbox: &mut Hitbox,
) -> HitboxOutcome {
    let frame = hitbox.animator.tick();
    let Some(entity) = world.find_entity_mut(hitbox_id) else {
        return HitboxOutcome::Expired;
    };
    entity.frame = frame;
    entity.facing = hitbox.facing;
    let hitbox_rect = entity.rect();

    let expired = hitbox.animator.is_finished();
    if expired {
        world.despawn(hitbox_id);
    }

    let killed = world
        .entities()
        .iter()
        .filter(|other| other.kind.is_hostile() && !world.is_despawn_pending(other.id))
        .filter(|other| hitbox_rect.overlaps(&other.rect()))
        .map(|other| other.id)
        .collect::<Vec<_>>();
    if killed.is_empty() {
        return if expired {
            HitboxOutcome::Expired
        } else {
            HitboxOutcome::Active
        };
    }

    for enemy_id in &killed {
        world.despawn(*enemy_id);
        debug!(enemy = enemy_id.0, attack = hitbox_id.0, "enemy_killed");
    }
    world.despawn(hitbox_id);
    HitboxOutcome::Struck { killed }
}

/// Any live hostile touching the player deals one point, regardless of how
/// many overlap. Returns `None` when nothing touches the player.
pub(crate) fn resolve_contact_damage(
    world: &SceneWorld,
    player_id: EntityId,
    stats: &mut PlayerStats,
) -> Option<DamageOutcome> {
    if !world.is_alive(player_id) {
        return None;
    }
    let player_rect = world.find_entity(player_id)?.rect();
    let touching = world.entities().iter().any(|other| {
        other.kind.is_hostile()
            && !world.is_despawn_pending(other.id)
            && player_rect.overlaps(&other.rect())
    });
    if !touching {
        return None;
    }
    Some(stats.take_damage(CONTACT_DAMAGE))
}

fn hitbox_spawn_desc(position: Vec2, facing: Facing, tile_size: f32) -> SpawnDesc {
    SpawnDesc {
        kind: EntityKind::Attack,
        layer: DrawLayer::Player,
        position,
        size: Vec2::new(tile_size, tile_size),
        facing,
        renderable: RenderableDesc {
            kind: RenderableKind::Directional("attack".to_string()),
            placeholder_rgba: [240, 240, 120, 200],
            debug_name: "attack",
        },
    }
}

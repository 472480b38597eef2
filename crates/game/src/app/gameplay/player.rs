use engine::{
    Animator, Axis, DrawLayer, EntityKind, Facing, InputAction, InputSnapshot, RenderableDesc,
    RenderableKind, SpawnDesc, Vec2,
};

use super::config::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DamageOutcome {
    Ignored,
    Damaged { hp: u32 },
    Died,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayerStats {
    hp: u32,
    max_hp: u32,
    mana: u32,
    max_mana: u32,
    attack_mana_cost: u32,
    damage_cooldown: u32,
    damage_cooldown_ticks: u32,
    attack_bonus: u32,
    score: u32,
}

impl PlayerStats {
    pub(crate) fn new(config: &GameConfig) -> Self {
        Self {
            hp: config.max_hp,
            max_hp: config.max_hp,
            mana: config.max_mana,
            max_mana: config.max_mana,
            attack_mana_cost: config.attack_mana_cost,
            damage_cooldown: 0,
            damage_cooldown_ticks: config.damage_cooldown_ticks,
            attack_bonus: 0,
            score: 0,
        }
    }

    pub(crate) fn hp(&self) -> u32 {
        self.hp
    }

    pub(crate) fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub(crate) fn mana(&self) -> u32 {
        self.mana
    }

    pub(crate) fn max_mana(&self) -> u32 {
        self.max_mana
    }

    pub(crate) fn damage_cooldown(&self) -> u32 {
        self.damage_cooldown
    }

    pub(crate) fn attack_bonus(&self) -> u32 {
        self.attack_bonus
    }

    pub(crate) fn score(&self) -> u32 {
        self.score
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub(crate) fn can_attack(&self) -> bool {
        self.mana >= self.attack_mana_cost
    }

    pub(crate) fn use_mana(&mut self, amount: u32) -> bool {
        if self.mana < amount {
            return false;
        }
        self.mana -= amount;
        true
    }

    pub(crate) fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.damage_cooldown > 0 || !self.is_alive() {
            return DamageOutcome::Ignored;
        }
        self.hp = self.hp.saturating_sub(amount);
        if self.hp == 0 {
            return DamageOutcome::Died;
        }
        self.damage_cooldown = self.damage_cooldown_ticks;
        DamageOutcome::Damaged { hp: self.hp }
    }

    pub(crate) fn tick_cooldown(&mut self) {
        self.damage_cooldown = self.damage_cooldown.saturating_sub(1);
    }

    pub(crate) fn use_hp_potion(&mut self, heal: u32) -> bool {
        if self.hp >= self.max_hp {
            return false;
        }
        self.hp = self.hp.saturating_add(heal).min(self.max_hp);
        true
    }

    pub(crate) fn use_mana_potion(&mut self, restore: u32) -> bool {
        if self.mana >= self.max_mana {
            return false;
        }
        self.mana = self.mana.saturating_add(restore).min(self.max_mana);
        true
    }

    pub(crate) fn equip_weapon(&mut self, attack_bonus: u32) -> bool {
        self.attack_bonus = attack_bonus;
        true
    }

    pub(crate) fn add_score(&mut self, points: u32) -> bool {
        self.score = self.score.saturating_add(points);
        true
    }

    pub(crate) fn restore_pools(&mut self, hp: u32, mana: u32) {
        self.hp = hp.min(self.max_hp);
        self.mana = mana.min(self.max_mana);
        self.damage_cooldown = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MoveIntent {
    pub(crate) velocity: Vec2,
    pub(crate) facing: Option<Facing>,
}

pub(crate) fn read_move_intent(input: &InputSnapshot, speed: f32) -> MoveIntent {
    let mut velocity = Vec2::ZERO;
    let mut facing = None;
    if input.is_down(InputAction::MoveLeft) {
        velocity.x -= speed;
        facing = Some(Facing::Left);
    }
    if input.is_down(InputAction::MoveRight) {
        velocity.x += speed;
        facing = Some(Facing::Right);
    }
    if input.is_down(InputAction::MoveUp) {
        velocity.y -= speed;
        facing = Some(Facing::Up);
    }
    if input.is_down(InputAction::MoveDown) {
        velocity.y += speed;
        facing = Some(Facing::Down);
    }
    MoveIntent { velocity, facing }
}

pub(crate) fn advance_walk_animation(animator: &mut Animator, facing: Facing, velocity: Vec2) -> u32 {
    let moving = match facing.axis() {
        Axis::X => velocity.x != 0.0,
        Axis::Y => velocity.y != 0.0,
    };
    if moving {
        animator.tick()
    } else {
        0
    }
}

pub(crate) fn player_spawn_desc(position: Vec2, tile_size: f32) -> SpawnDesc {
    SpawnDesc {
        kind: EntityKind::Player,
        layer: DrawLayer::Player,
        position,
        size: Vec2::new(tile_size, tile_size),
        facing: Facing::Down,
        renderable: RenderableDesc {
            kind: RenderableKind::Directional("knight".to_string()),
            placeholder_rgba: [40, 200, 80, 255],
            debug_name: "player",
        },
    }
}

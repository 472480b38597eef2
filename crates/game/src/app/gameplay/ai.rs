use engine::{
    Animator, DrawLayer, EntityKind, Facing, RenderableDesc, RenderableKind, SpawnDesc, Vec2,
};

use super::WALK_CLIP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PursuitState {
    Idle,
    Pursuing,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EnemyAgent {
    pub(crate) speed: f32,
    pub(crate) detection_range: f32,
    pub(crate) state: PursuitState,
    pub(crate) animator: Animator,
}

impl EnemyAgent {
    pub(crate) fn new(speed: f32, detection_range: f32) -> Self {
        Self {
            speed,
            detection_range,
            state: PursuitState::Idle,
            animator: Animator::new(WALK_CLIP),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PursuitDecision {
    pub(crate) state: PursuitState,
    pub(crate) velocity: Vec2,
    pub(crate) facing: Option<Facing>,
}

impl PursuitDecision {
    const IDLE: PursuitDecision = PursuitDecision {
        state: PursuitState::Idle,
        velocity: Vec2::ZERO,
        facing: None,
    };
}

pub(crate) fn decide_pursuit(
    enemy_center: Vec2,
    player_center: Option<Vec2>,
    agent: &EnemyAgent,
) -> PursuitDecision {
    let Some(player_center) = player_center else {
        return PursuitDecision::IDLE;
    };
    let offset = player_center - enemy_center;
    let distance = offset.length();
    if distance <= 0.0 || distance > agent.detection_range {
        return PursuitDecision::IDLE;
    }

    let velocity = Vec2::new(
        offset.x / distance * agent.speed,
        offset.y / distance * agent.speed,
    );
    PursuitDecision {
        state: PursuitState::Pursuing,
        velocity,
        facing: Some(Facing::from_dominant_axis(velocity)),
    }
}

pub(crate) fn enemy_spawn_desc(kind: EntityKind, position: Vec2, tile_size: f32) -> SpawnDesc {
    let (sheet, placeholder_rgba, debug_name) = match kind {
        EntityKind::Devil => ("devil", [170, 30, 30, 255], "devil"),
        _ => ("zombie", [110, 140, 60, 255], "enemy"),
    };
    SpawnDesc {
        kind,
        layer: DrawLayer::Enemy,
        position,
        size: Vec2::new(tile_size, tile_size),
        facing: Facing::Down,
        renderable: RenderableDesc {
            kind: RenderableKind::Directional(sheet.to_string()),
            placeholder_rgba,
            debug_name,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> EnemyAgent {
        EnemyAgent::new(2.0, 80.0)
    }

    #[test]
    fn out_of_range_enemy_stays_idle() {
        let decision = decide_pursuit(Vec2::new(100.0, 0.0), Some(Vec2::ZERO), &agent());
        assert_eq!(decision.state, PursuitState::Idle);
        assert!(decision.velocity.is_zero());
        assert_eq!(decision.facing, None);
    }

    #[test]
    fn in_range_enemy_moves_toward_player_at_speed() {
        let decision = decide_pursuit(Vec2::new(60.0, 0.0), Some(Vec2::ZERO), &agent());
        assert_eq!(decision.state, PursuitState::Pursuing);
        assert_eq!(decision.velocity, Vec2::new(-2.0, 0.0));
        assert_eq!(decision.facing, Some(Facing::Left));
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let decision = decide_pursuit(Vec2::new(0.0, 80.0), Some(Vec2::ZERO), &agent());
        assert_eq!(decision.state, PursuitState::Pursuing);
        assert_eq!(decision.facing, Some(Facing::Up));
    }

    #[test]
    fn coincident_centers_do_not_divide_by_zero() {
        let decision = decide_pursuit(Vec2::new(5.0, 5.0), Some(Vec2::new(5.0, 5.0)), &agent());
        assert_eq!(decision, PursuitDecision::IDLE);
    }

    #[test]
    fn diagonal_tie_faces_vertically() {
        let decision = decide_pursuit(Vec2::new(30.0, 30.0), Some(Vec2::ZERO), &agent());
        assert_eq!(decision.facing, Some(Facing::Up));
        let speed = decision.velocity.length();
        assert!((speed - 2.0).abs() < 1e-4);
    }

    #[test]
    fn no_player_means_idle() {
        assert_eq!(decide_pursuit(Vec2::ZERO, None, &agent()), PursuitDecision::IDLE);
    }
}

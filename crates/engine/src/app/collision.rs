use serde::{Deserialize, Serialize};

use super::geometry::{Axis, Rect, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSelection {
    #[default]
    FirstRegistered,
    DeepestPenetration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisResolution {
    pub rect: Rect,
    pub applied: f32,
    pub hit_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResolution {
    pub rect: Rect,
    pub applied: Vec2,
}

pub fn resolve_axis(
    mover: Rect,
    delta: f32,
    axis: Axis,
    blocks: &[Rect],
    policy: HitSelection,
) -> AxisResolution {
    let mut moved = mover;
    match axis {
        Axis::X => moved.x += delta,
        Axis::Y => moved.y += delta,
    }

    let hit_index = if delta == 0.0 {
        None
    } else {
        select_hit(&moved, axis, blocks, policy)
    };

    if let Some(index) = hit_index {
        let block = blocks[index];
        match (axis, delta > 0.0) {
            (Axis::X, true) => moved.x = block.left() - moved.w,
            (Axis::X, false) => moved.x = block.right(),
            (Axis::Y, true) => moved.y = block.top() - moved.h,
            (Axis::Y, false) => moved.y = block.bottom(),
        }
    }

    let applied = match axis {
        Axis::X => moved.x - mover.x,
        Axis::Y => moved.y - mover.y,
    };

    AxisResolution {
        rect: moved,
        applied,
        hit_index,
    }
}

/// Horizontal first, then vertical. The order is load-bearing: swapping it
/// changes which corner a diagonal mover catches on.
pub fn resolve_move(
    mover: Rect,
    delta: Vec2,
    blocks: &[Rect],
    policy: HitSelection,
) -> MoveResolution {
    let x = resolve_axis(mover, delta.x, Axis::X, blocks, policy);
    let y = resolve_axis(x.rect, delta.y, Axis::Y, blocks, policy);
    MoveResolution {
        rect: y.rect,
        applied: Vec2::new(x.applied, y.applied),
    }
}

fn select_hit(moved: &Rect, axis: Axis, blocks: &[Rect], policy: HitSelection) -> Option<usize> {
    match policy {
        HitSelection::FirstRegistered => blocks.iter().position(|block| moved.overlaps(block)),
        HitSelection::DeepestPenetration => {
            let mut best: Option<(usize, f32)> = None;
            for (index, block) in blocks.iter().enumerate() {
                let depth = moved.penetration(block, axis);
                if depth <= 0.0 {
                    continue;
                }
                match best {
                    Some((_, best_depth)) if best_depth >= depth => {}
                    _ => best = Some((index, depth)),
                }
            }
            best.map(|(index, _)| index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 32.0;

    fn tile(x: f32, y: f32) -> Rect {
        Rect::new(x * TILE, y * TILE, TILE, TILE)
    }

    #[test]
    fn moving_right_snaps_right_edge_to_block_left() {
        let mover = tile(1.0, 1.0);
        let blocks = [tile(2.0, 1.0)];
        let result = resolve_axis(mover, 5.0, Axis::X, &blocks, HitSelection::FirstRegistered);
        assert_eq!(result.rect.right(), blocks[0].left());
        assert_eq!(result.applied, 0.0);
        assert_eq!(result.hit_index, Some(0));
        assert!(!result.rect.overlaps(&blocks[0]));
    }

    #[test]
    fn moving_left_and_vertical_snap_to_opposite_edges() {
        let mover = Rect::new(66.0, 66.0, TILE, TILE);
        let blocks = [tile(1.0, 2.0), tile(2.0, 1.0), tile(1.0, 1.0)];

        let left = resolve_axis(mover, -5.0, Axis::X, &blocks, HitSelection::FirstRegistered);
        assert_eq!(left.rect.left(), 64.0);

        let up = resolve_axis(mover, -5.0, Axis::Y, &blocks, HitSelection::FirstRegistered);
        assert_eq!(up.rect.top(), 64.0);

        let down_mover = Rect::new(64.0, 30.0, TILE, TILE);
        let down = resolve_axis(
            down_mover,
            5.0,
            Axis::Y,
            &[tile(2.0, 2.0)],
            HitSelection::FirstRegistered,
        );
        assert_eq!(down.rect.bottom(), 64.0);
    }

    #[test]
    fn free_movement_applies_full_delta() {
        let mover = tile(1.0, 1.0);
        let blocks = [tile(5.0, 5.0)];
        let result = resolve_move(
            mover,
            Vec2::new(5.0, -5.0),
            &blocks,
            HitSelection::FirstRegistered,
        );
        assert_eq!(result.applied, Vec2::new(5.0, -5.0));
    }

    #[test]
    fn blocked_axis_does_not_disturb_other_axis() {
        let mover = tile(1.0, 1.0);
        let blocks = [tile(2.0, 1.0)];
        let result = resolve_move(
            mover,
            Vec2::new(5.0, 3.0),
            &blocks,
            HitSelection::FirstRegistered,
        );
        assert_eq!(result.applied.x, 0.0);
        assert_eq!(result.applied.y, 3.0);
        for block in &blocks {
            assert!(!result.rect.overlaps(block));
        }
    }

    #[test]
    fn zero_delta_never_snaps() {
        let mover = Rect::new(40.0, 32.0, TILE, TILE);
        let blocks = [tile(1.0, 1.0)];
        let result = resolve_axis(mover, 0.0, Axis::X, &blocks, HitSelection::FirstRegistered);
        assert_eq!(result.rect, mover);
        assert_eq!(result.hit_index, None);
    }

    #[test]
    fn first_registered_uses_creation_order_not_nearest() {
        // Mover overlaps two blocks after the step; the first one in the list wins.
        let mover = Rect::new(0.0, 0.0, 40.0, TILE);
        let blocks = [Rect::new(44.0, 0.0, TILE, TILE), Rect::new(42.0, 0.0, TILE, TILE)];
        let first = resolve_axis(mover, 6.0, Axis::X, &blocks, HitSelection::FirstRegistered);
        assert_eq!(first.hit_index, Some(0));
        assert_eq!(first.rect.right(), 44.0);

        let deepest = resolve_axis(mover, 6.0, Axis::X, &blocks, HitSelection::DeepestPenetration);
        assert_eq!(deepest.hit_index, Some(1));
        assert_eq!(deepest.rect.right(), 42.0);
        for block in &blocks {
            assert!(!deepest.rect.overlaps(block));
        }
    }

    #[test]
    fn diagonal_into_corner_resolves_x_before_y() {
        // Wall segment to the right and floor below; moving down-right ends flush on both.
        let mover = Rect::new(30.0, 30.0, TILE, TILE);
        let blocks = [tile(2.0, 0.0), tile(2.0, 1.0), tile(0.0, 2.0), tile(1.0, 2.0)];
        let result = resolve_move(
            mover,
            Vec2::new(5.0, 5.0),
            &blocks,
            HitSelection::FirstRegistered,
        );
        assert_eq!(result.rect.right(), 64.0);
        assert_eq!(result.rect.bottom(), 64.0);
        for block in &blocks {
            assert!(!result.rect.overlaps(block));
        }
    }
}

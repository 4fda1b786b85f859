use bitflags::bitflags;

use crate::world::position::{Direction, Position};

/// Sprite sub-grid selection inside a descriptor's pattern grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PatternIndex {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl PatternIndex {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

bitflags! {
    /// Cardinal neighbours that continue a border.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NeighborMask: u8 {
        const NORTH = 1;
        const EAST = 2;
        const SOUTH = 4;
        const WEST = 8;
    }
}

/// Count-dependent pile sprite of a stackable item on its 4x2 grid.
pub fn stackable_pattern(count: u32) -> PatternIndex {
    match count {
        0 | 1 => PatternIndex::new(0, 0, 0),
        2..=4 => PatternIndex::new(count - 1, 0, 0),
        5..=9 => PatternIndex::new(0, 1, 0),
        10..=24 => PatternIndex::new(1, 1, 0),
        25..=49 => PatternIndex::new(2, 1, 0),
        _ => PatternIndex::new(3, 1, 0),
    }
}

pub fn fluid_pattern(subtype: u32, pattern_x: u32, pattern_y: u32) -> PatternIndex {
    PatternIndex::new(
        (subtype % 4) % pattern_x.max(1),
        (subtype / 4) % pattern_y.max(1),
        0,
    )
}

pub fn neighbor_mask(position: Position, continues: impl Fn(Position) -> bool) -> NeighborMask {
    let mut mask = NeighborMask::empty();
    for (direction, bit) in [
        (Direction::North, NeighborMask::NORTH),
        (Direction::East, NeighborMask::EAST),
        (Direction::South, NeighborMask::SOUTH),
        (Direction::West, NeighborMask::WEST),
    ] {
        if continues(position.translated_to_direction(direction)) {
            mask |= bit;
        }
    }
    mask
}

pub fn border_pattern(mask: NeighborMask) -> PatternIndex {
    let bits = u32::from(mask.bits());
    PatternIndex::new(bits % 4, bits / 4, 0)
}

/// Tiled variation: each axis of the position modulo its pattern dimension.
pub fn position_pattern(
    position: Position,
    pattern_x: u32,
    pattern_y: u32,
    pattern_z: u32,
) -> PatternIndex {
    PatternIndex::new(
        u32::from(position.x) % pattern_x.max(1),
        u32::from(position.y) % pattern_y.max(1),
        u32::from(position.z) % pattern_z.max(1),
    )
}

/// Effect sub-sprite chosen relative to the camera anchor; the x axis is
/// mirrored.
pub fn camera_pattern(
    position: Position,
    center: Position,
    pattern_x: u32,
    pattern_y: u32,
) -> PatternIndex {
    let px = pattern_x.max(1) as i64;
    let py = pattern_y.max(1) as i64;
    let offset_x = i64::from(position.x) - i64::from(center.x);
    let offset_y = i64::from(position.y) - i64::from(center.y);
    let x = (1 - offset_x.rem_euclid(px) - px).rem_euclid(px);
    let y = offset_y.rem_euclid(py);
    PatternIndex::new(x as u32, y as u32, 0)
}

/// Phase of a looping animation that spreads `phases` evenly over `cycle_ms`.
pub fn cycle_phase(phases: u32, now: u64, cycle_ms: u64) -> u32 {
    if phases <= 1 || cycle_ms == 0 {
        return 0;
    }
    let per_phase = cycle_ms as f64 / f64::from(phases);
    let within = (now % cycle_ms) as f64;
    ((within / per_phase).floor() as u32) % phases
}

/// Phase of a one-shot animation that advances every `ticks_per_frame` ms and
/// holds on the last frame.
pub fn frame_phase(elapsed: u64, ticks_per_frame: u64, phases: u32) -> u32 {
    if phases == 0 {
        return 0;
    }
    let frame = elapsed / ticks_per_frame.max(1);
    frame.min(u64::from(phases - 1)) as u32
}

/// Position of a projectile's sprite inside its 3x3 direction block.
pub fn missile_pattern(direction: Direction) -> PatternIndex {
    let (x, y) = match direction {
        Direction::Northwest => (0, 0),
        Direction::North => (1, 0),
        Direction::Northeast => (2, 0),
        Direction::East => (2, 1),
        Direction::Southeast => (2, 2),
        Direction::South => (1, 2),
        Direction::Southwest => (0, 2),
        Direction::West => (0, 1),
        Direction::Invalid => (1, 1),
    };
    PatternIndex::new(x, y, 0)
}

/// Outfit sheets only carry the four cardinal facings.
pub fn creature_direction_pattern(direction: Direction) -> u32 {
    match direction {
        Direction::North => 0,
        Direction::East | Direction::Northeast | Direction::Southeast => 1,
        Direction::South | Direction::Invalid => 2,
        Direction::West | Direction::Northwest | Direction::Southwest => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stackable_counts_pick_pile_sprites() {
        let expected = [
            (1, (0, 0)),
            (4, (3, 0)),
            (5, (0, 1)),
            (9, (0, 1)),
            (10, (1, 1)),
            (24, (1, 1)),
            (25, (2, 1)),
            (49, (2, 1)),
            (50, (3, 1)),
            (999, (3, 1)),
        ];
        for (count, (x, y)) in expected {
            assert_eq!(stackable_pattern(count), PatternIndex::new(x, y, 0), "count {}", count);
        }
        assert_eq!(stackable_pattern(0), PatternIndex::default());
        assert_eq!(stackable_pattern(2), PatternIndex::new(1, 0, 0));
    }

    #[test]
    fn border_mask_encodes_cardinal_neighbours() {
        let origin = Position::new(100, 100, 7);
        let mask = neighbor_mask(origin, |pos| pos.y < 100 || pos.x > 100);
        assert_eq!(mask, NeighborMask::NORTH | NeighborMask::EAST);
        assert_eq!(border_pattern(mask), PatternIndex::new(3, 0, 0));
        assert_eq!(border_pattern(NeighborMask::all()), PatternIndex::new(3, 3, 0));
        assert_eq!(border_pattern(NeighborMask::SOUTH), PatternIndex::new(0, 1, 0));
    }

    #[test]
    fn position_pattern_wraps_each_axis() {
        let pattern = position_pattern(Position::new(7, 9, 6), 2, 4, 1);
        assert_eq!(pattern, PatternIndex::new(1, 1, 0));
        assert_eq!(position_pattern(Position::new(7, 9, 6), 0, 0, 0), PatternIndex::default());
    }

    #[test]
    fn camera_pattern_mirrors_x() {
        let center = Position::new(100, 100, 7);
        assert_eq!(camera_pattern(center, center, 2, 2), PatternIndex::new(1, 0, 0));
        assert_eq!(
            camera_pattern(Position::new(101, 99, 7), center, 2, 2),
            PatternIndex::new(0, 1, 0)
        );
        for dx in 0..6u16 {
            let pattern = camera_pattern(Position::new(97 + dx, 100, 7), center, 3, 1);
            assert!(pattern.x < 3);
        }
    }

    #[test]
    fn phases() {
        assert_eq!(cycle_phase(1, 12_345, 1_000), 0);
        assert_eq!(cycle_phase(4, 0, 1_000), 0);
        assert_eq!(cycle_phase(4, 250, 1_000), 1);
        assert_eq!(cycle_phase(4, 1_999, 1_000), 3);
        assert_eq!(frame_phase(0, 100, 5), 0);
        assert_eq!(frame_phase(250, 100, 5), 2);
        assert_eq!(frame_phase(9_000, 100, 5), 4);
        assert_eq!(frame_phase(9_000, 100, 0), 0);
    }

    #[test]
    fn missile_block_is_a_compass_rose() {
        assert_eq!(missile_pattern(Direction::Northwest), PatternIndex::new(0, 0, 0));
        assert_eq!(missile_pattern(Direction::East), PatternIndex::new(2, 1, 0));
        assert_eq!(missile_pattern(Direction::South), PatternIndex::new(1, 2, 0));
        assert_eq!(missile_pattern(Direction::Invalid), PatternIndex::new(1, 1, 0));
    }
}

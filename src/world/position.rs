use serde::{Deserialize, Serialize};

pub const MAX_FLOOR: u8 = 15;
pub const SEA_FLOOR: u8 = 7;

/// Unset position; `is_valid` compares against it exactly.
pub const INVALID_POSITION: Position = Position {
    x: 0xFFFF,
    y: 0xFFFF,
    z: 0xFF,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Northeast,
    Southeast,
    Southwest,
    Northwest,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDelta {
    pub dx: i16,
    pub dy: i16,
    pub dz: i8,
}

impl Default for Position {
    fn default() -> Self {
        INVALID_POSITION
    }
}

impl Position {
    pub fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn is_valid(&self) -> bool {
        *self != INVALID_POSITION
    }

    pub fn offset(self, delta: PositionDelta) -> Option<Self> {
        let x = i32::from(self.x) + i32::from(delta.dx);
        let y = i32::from(self.y) + i32::from(delta.dy);
        let z = i16::from(self.z) + i16::from(delta.dz);

        if x < 0 || y < 0 || z < 0 {
            return None;
        }

        if x > i32::from(u16::MAX) || y > i32::from(u16::MAX) || z > i16::from(u8::MAX) {
            return None;
        }

        Some(Self {
            x: x as u16,
            y: y as u16,
            z: z as u8,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        if direction == Direction::Invalid {
            return None;
        }
        self.offset(direction.delta())
    }

    /// Wrapping translation; x/y wrap at the u16 boundary, z at u8.
    pub fn translated(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx as u16),
            y: self.y.wrapping_add(dy as u16),
            z: self.z.wrapping_add(dz as u8),
        }
    }

    pub fn translate(&mut self, dx: i32, dy: i32, dz: i32) {
        *self = self.translated(dx, dy, dz);
    }

    pub fn translated_to_direction(self, direction: Direction) -> Self {
        let delta = direction.delta();
        self.translated(i32::from(delta.dx), i32::from(delta.dy), 0)
    }

    pub fn translated_to_reverse_direction(self, direction: Direction) -> Self {
        self.translated_to_direction(direction.reverse())
    }

    pub fn angle_to(&self, to: &Position) -> f64 {
        angle_from_positions(*self, *to)
    }

    pub fn direction_to(&self, to: &Position) -> Direction {
        direction_from_positions(*self, *to)
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan_distance(&self, other: &Position) -> u32 {
        let dx = (i32::from(other.x) - i32::from(self.x)).unsigned_abs();
        let dy = (i32::from(other.y) - i32::from(self.y)).unsigned_abs();
        dx + dy
    }

    pub fn is_in_range(
        &self,
        other: &Position,
        x_range: u16,
        y_range: u16,
        ignore_z: bool,
    ) -> bool {
        if !ignore_z && self.z != other.z {
            return false;
        }
        let dx = (i32::from(other.x) - i32::from(self.x)).unsigned_abs();
        let dy = (i32::from(other.y) - i32::from(self.y)).unsigned_abs();
        dx <= u32::from(x_range) && dy <= u32::from(y_range)
    }

    pub fn up(&mut self, floors: u8) -> bool {
        let Some(z) = self.z.checked_sub(floors) else {
            return false;
        };
        self.z = z;
        true
    }

    pub fn down(&mut self, floors: u8) -> bool {
        let z = u16::from(self.z) + u16::from(floors);
        if z > u16::from(MAX_FLOOR) {
            return false;
        }
        self.z = z as u8;
        true
    }

    /// Moves toward the camera: one floor up shifts the tile one step south-east.
    pub fn covered_up(&mut self, floors: u8) -> bool {
        let mut next = self.translated(i32::from(floors), i32::from(floors), 0);
        if !next.up(floors) {
            return false;
        }
        *self = next;
        true
    }

    pub fn covered_down(&mut self, floors: u8) -> bool {
        let mut next = self.translated(-i32::from(floors), -i32::from(floors), 0);
        if !next.down(floors) {
            return false;
        }
        *self = next;
        true
    }

    pub fn positions_around(&self) -> Vec<Position> {
        let mut positions = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                positions.push(self.translated(dx, dy, 0));
            }
        }
        positions
    }
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::Northeast,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Northwest,
    ];

    pub fn delta(self) -> PositionDelta {
        match self {
            Direction::North => PositionDelta { dx: 0, dy: -1, dz: 0 },
            Direction::East => PositionDelta { dx: 1, dy: 0, dz: 0 },
            Direction::South => PositionDelta { dx: 0, dy: 1, dz: 0 },
            Direction::West => PositionDelta { dx: -1, dy: 0, dz: 0 },
            Direction::Northeast => PositionDelta { dx: 1, dy: -1, dz: 0 },
            Direction::Northwest => PositionDelta { dx: -1, dy: -1, dz: 0 },
            Direction::Southeast => PositionDelta { dx: 1, dy: 1, dz: 0 },
            Direction::Southwest => PositionDelta { dx: -1, dy: 1, dz: 0 },
            Direction::Invalid => PositionDelta { dx: 0, dy: 0, dz: 0 },
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Northeast => Direction::Southwest,
            Direction::Northwest => Direction::Southeast,
            Direction::Southeast => Direction::Northwest,
            Direction::Southwest => Direction::Northeast,
            Direction::Invalid => Direction::Invalid,
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Northeast
                | Direction::Northwest
                | Direction::Southeast
                | Direction::Southwest
        )
    }
}

/// Angle in radians within [0, 2π), or -1.0 when both positions share x/y.
pub fn angle_from_positions(from: Position, to: Position) -> f64 {
    let dx = f64::from(to.x) - f64::from(from.x);
    let dy = f64::from(to.y) - f64::from(from.y);
    if dx == 0.0 && dy == 0.0 {
        return -1.0;
    }
    let angle = (-dy).atan2(dx);
    if angle < 0.0 {
        angle + std::f64::consts::TAU
    } else {
        angle
    }
}

/// Coincident positions carry the -1 rad sentinel, which lands in the East
/// window.
pub fn direction_from_positions(from: Position, to: Position) -> Direction {
    direction_from_degrees(angle_from_positions(from, to).to_degrees())
}

/// Buckets an angle into eight 45° sectors; each sector owns its lower edge.
/// East is matched first, so anything below 22.5° or from 337.5° up is East.
/// Only NaN matches no window.
pub fn direction_from_degrees(angle: f64) -> Direction {
    if angle.is_nan() {
        return Direction::Invalid;
    }
    if angle >= 337.5 || angle < 22.5 {
        Direction::East
    } else if angle < 67.5 {
        Direction::Northeast
    } else if angle < 112.5 {
        Direction::North
    } else if angle < 157.5 {
        Direction::Northwest
    } else if angle < 202.5 {
        Direction::West
    } else if angle < 247.5 {
        Direction::Southwest
    } else if angle < 292.5 {
        Direction::South
    } else {
        Direction::Southeast
    }
}

use crate::world::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u16,
    pub height: u16,
}

impl Default for ViewportSize {
    fn default() -> Self {
        // Aware area of the classic client: 15x11 visible plus the partial border.
        Self { width: 18, height: 14 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub center: Position,
    pub min: Position,
    pub max: Position,
    pub size: ViewportSize,
}

impl Viewport {
    pub fn from_center(center: Position, size: ViewportSize) -> Self {
        let half_left = size.width / 2;
        let half_right = size.width.saturating_sub(half_left + 1);
        let half_up = size.height / 2;
        let half_down = size.height.saturating_sub(half_up + 1);

        let min = Position {
            x: center.x.saturating_sub(half_left),
            y: center.y.saturating_sub(half_up),
            z: center.z,
        };
        let max = Position {
            x: center.x.saturating_add(half_right),
            y: center.y.saturating_add(half_down),
            z: center.z,
        };

        Self {
            center,
            min,
            max,
            size,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.z == self.center.z
            && position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }

    /// Screen tile of `position`. Floors above the camera are drawn shifted
    /// one tile up-left per floor.
    pub fn to_view(&self, position: Position) -> Option<(i32, i32)> {
        let floor_shift = i32::from(self.center.z) - i32::from(position.z);
        let view_x = i32::from(position.x) - i32::from(self.min.x) - floor_shift;
        let view_y = i32::from(position.y) - i32::from(self.min.y) - floor_shift;
        if view_x < 0
            || view_y < 0
            || view_x >= i32::from(self.size.width)
            || view_y >= i32::from(self.size.height)
        {
            return None;
        }
        Some((view_x, view_y))
    }

    /// World position drawn at screen tile (view_x, view_y) on floor `z`.
    pub fn to_world(&self, view_x: i32, view_y: i32, z: u8) -> Position {
        let floor_shift = i32::from(self.center.z) - i32::from(z);
        Position {
            x: self.min.x,
            y: self.min.y,
            z,
        }
        .translated(view_x + floor_shift, view_y + floor_shift, 0)
    }

    /// Screen tiles ordered by anti-diagonal, top-left first, so that tiles
    /// further south-east overdraw their north-west neighbours.
    pub fn diagonal_order(&self) -> Vec<(i32, i32)> {
        let width = i32::from(self.size.width);
        let height = i32::from(self.size.height);
        let mut order = Vec::with_capacity((width * height) as usize);
        for diagonal in 0..(width + height - 1) {
            let start_x = (diagonal - (height - 1)).max(0);
            let end_x = diagonal.min(width - 1);
            for view_x in start_x..=end_x {
                order.push((view_x, diagonal - view_x));
            }
        }
        order
    }
}

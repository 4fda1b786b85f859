use serde::{Deserialize, Serialize};

/// Palette size of the 6x6x6 color cube used by lights and floating text.
pub const PALETTE_SIZE: u16 = 216;
pub const DEFAULT_LIGHT_COLOR: u8 = 215;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    pub fn to_u32(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Palette lookup scaled by `brightness`; 0 and anything past the cube
    /// resolve to white.
    pub fn from_8bit(color: u16, brightness: f32) -> Self {
        if color == 0 || color >= PALETTE_SIZE {
            return Rgb::WHITE;
        }
        let cube = |step: u16| -> u8 {
            let channel = f32::from((step % 6) * 51) * brightness;
            channel.floor().clamp(0.0, 255.0) as u8
        };
        Self {
            r: cube(color / 36),
            g: cube(color / 6),
            b: cube(color),
        }
    }

    pub fn channel_max(self, other: Rgb) -> Rgb {
        Rgb {
            r: self.r.max(other.r),
            g: self.g.max(other.g),
            b: self.b.max(other.b),
        }
    }

    pub fn with_alpha(self, a: u8) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }
}

impl Rgba {
    pub fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

use crate::animation::pattern::PatternIndex;
use crate::render::color::{Rgb, Rgba};
use crate::world::thing_types::ThingCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPoolType {
    Map,
    CreatureInformation,
    Light,
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionMode {
    Normal,
    /// Multiplies the destination; used to darken the scene with the light map.
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawOrder {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Where a sprite lands: a screen tile plus pixel adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileDest {
    pub tile_x: f32,
    pub tile_y: f32,
    pub elevation_px: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub tile_z: u8,
}

impl TileDest {
    pub fn new(tile_x: i32, tile_y: i32, tile_z: u8) -> Self {
        Self {
            tile_x: tile_x as f32,
            tile_y: tile_y as f32,
            tile_z,
            ..Self::default()
        }
    }

    pub fn with_elevation(mut self, elevation_px: i32) -> Self {
        self.elevation_px = elevation_px;
        self
    }

    pub fn with_offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.offset_x += offset_x;
        self.offset_y += offset_y;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub category: ThingCategory,
    pub client_id: u16,
    pub dest: TileDest,
    pub pattern: PatternIndex,
    pub phase: u32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    pub text: String,
    pub font: String,
    pub rect: Rect,
    pub color: Rgba,
}

/// Borrowed RGBA image, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Semantic draw requests. Implementations batch and submit; the world core
/// only describes what to draw. State set with `once = true` applies to the
/// next primitive only.
pub trait DrawPool {
    fn current_type(&self) -> DrawPoolType {
        DrawPoolType::Map
    }

    fn add_sprite(&mut self, sprite: SpriteDraw);

    fn set_opacity(&mut self, opacity: f32, once: bool);

    fn set_composition_mode(&mut self, mode: CompositionMode, once: bool);

    fn set_shader_program(&mut self, shader: &str, once: bool);

    fn set_draw_order(&mut self, order: DrawOrder);

    fn reset_draw_order(&mut self);

    fn add_textured_rect(&mut self, dest: Rect, texture: TextureImage<'_>);

    fn add_text(&mut self, text: TextDraw);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Sprite(SpriteDraw),
    Opacity { opacity: f32, once: bool },
    Composition { mode: CompositionMode, once: bool },
    Shader { name: String, once: bool },
    DrawOrder(DrawOrder),
    ResetDrawOrder,
    TexturedRect { dest: Rect, width: u32, height: u32, pixels: Vec<u8> },
    Text(TextDraw),
}

/// Keeps every request in order; used by tests and the scene probe.
#[derive(Debug, Default)]
pub struct RecordingDrawPool {
    pub commands: Vec<DrawCommand>,
}

impl RecordingDrawPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sprites(&self) -> impl Iterator<Item = &SpriteDraw> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Sprite(sprite) => Some(sprite),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextDraw> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites().count()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawPool for RecordingDrawPool {
    fn add_sprite(&mut self, sprite: SpriteDraw) {
        self.commands.push(DrawCommand::Sprite(sprite));
    }

    fn set_opacity(&mut self, opacity: f32, once: bool) {
        self.commands.push(DrawCommand::Opacity { opacity, once });
    }

    fn set_composition_mode(&mut self, mode: CompositionMode, once: bool) {
        self.commands.push(DrawCommand::Composition { mode, once });
    }

    fn set_shader_program(&mut self, shader: &str, once: bool) {
        self.commands.push(DrawCommand::Shader {
            name: shader.to_string(),
            once,
        });
    }

    fn set_draw_order(&mut self, order: DrawOrder) {
        self.commands.push(DrawCommand::DrawOrder(order));
    }

    fn reset_draw_order(&mut self) {
        self.commands.push(DrawCommand::ResetDrawOrder);
    }

    fn add_textured_rect(&mut self, dest: Rect, texture: TextureImage<'_>) {
        self.commands.push(DrawCommand::TexturedRect {
            dest,
            width: texture.width,
            height: texture.height,
            pixels: texture.pixels.to_vec(),
        });
    }

    fn add_text(&mut self, text: TextDraw) {
        self.commands.push(DrawCommand::Text(text));
    }
}

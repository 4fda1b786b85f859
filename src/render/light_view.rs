use crate::render::color::{Rgb, DEFAULT_LIGHT_COLOR};
use crate::render::draw_pool::{CompositionMode, DrawPool, Rect, TextureImage};
use crate::world::thing_types::Light;

/// Ambient intensity at and above which the scene counts as fully lit.
pub const DARKNESS_THRESHOLD: u8 = 250;
const FALLOFF: f32 = 0.2;
const MIN_CONTRIBUTION: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub x: i32,
    pub y: i32,
    pub intensity: u8,
    pub color: u8,
    pub brightness: f32,
}

/// Per-tile light map rebuilt every frame. One RGBA pixel per tile, later
/// stretched over the viewport and multiplied into the scene.
#[derive(Debug, Clone)]
pub struct LightView {
    width: u32,
    height: u32,
    tile_size: u32,
    enabled: bool,
    is_dark: bool,
    global_light: Light,
    global_color: Rgb,
    sources: Vec<LightSource>,
    tile_shade: Vec<usize>,
    pixels: Vec<u8>,
}

impl Default for LightView {
    fn default() -> Self {
        Self::new()
    }
}

impl LightView {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            tile_size: 32,
            enabled: true,
            is_dark: false,
            global_light: Light::new(255, DEFAULT_LIGHT_COLOR),
            global_color: Rgb::WHITE,
            sources: Vec::new(),
            tile_shade: Vec::new(),
            pixels: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32, tile_size: u32) {
        if width == self.width && height == self.height && tile_size == self.tile_size {
            return;
        }
        self.width = width;
        self.height = height;
        self.tile_size = tile_size.max(1);
        let tiles = (width * height) as usize;
        self.tile_shade = vec![0; tiles];
        self.pixels = vec![0; tiles * 4];
        self.sources.clear();
        log::debug!(target: "light", "light map resized to {}x{} tiles", width, height);
    }

    /// Frame start: forget last frame's sources and shade marks.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.tile_shade.fill(0);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_global_light(&mut self, light: Light) {
        let color = if light.color == 0 {
            DEFAULT_LIGHT_COLOR
        } else {
            light.color
        };
        self.global_light = Light::new(light.intensity, color);
        self.is_dark = light.intensity < DARKNESS_THRESHOLD;
        let brightness = if light.intensity == 0 || light.intensity >= DARKNESS_THRESHOLD {
            1.0
        } else {
            f32::from(light.intensity) / 255.0
        };
        self.global_color = if light.intensity == 0 {
            Rgb::BLACK
        } else {
            Rgb::from_8bit(u16::from(color), brightness)
        };
    }

    pub fn global_light(&self) -> Light {
        self.global_light
    }

    pub fn global_color(&self) -> Rgb {
        self.global_color
    }

    pub fn is_dark(&self) -> bool {
        self.is_dark
    }

    pub fn add_light_source(&mut self, x: i32, y: i32, light: Light, brightness: f32) {
        if !self.is_dark || light.intensity == 0 {
            return;
        }
        if let Some(last) = self.sources.last_mut() {
            if last.x == x && last.y == y && last.color == light.color {
                last.intensity = last.intensity.max(light.intensity);
                return;
            }
        }
        self.sources.push(LightSource {
            x,
            y,
            intensity: light.intensity,
            color: light.color,
            brightness,
        });
    }

    /// Marks the tile as covered: lights registered so far do not reach it.
    pub fn reset_shade(&mut self, tile_x: i32, tile_y: i32) {
        let Some(index) = self.tile_index(tile_x, tile_y) else {
            return;
        };
        self.tile_shade[index] = self.sources.len();
    }

    pub fn sources(&self) -> &[LightSource] {
        &self.sources
    }

    pub fn update_pixels(&mut self) {
        let tile = self.tile_size as f32;
        for tile_y in 0..self.height {
            for tile_x in 0..self.width {
                let index = (tile_y * self.width + tile_x) as usize;
                let center_x = (tile_x * self.tile_size + self.tile_size / 2) as f32;
                let center_y = (tile_y * self.tile_size + self.tile_size / 2) as f32;
                let mut color = self.global_color;
                let first = self.tile_shade[index].min(self.sources.len());
                for source in &self.sources[first..] {
                    let dx = center_x - source.x as f32;
                    let dy = center_y - source.y as f32;
                    let distance_sq = dx * dx + dy * dy;
                    let reach = f32::from(source.intensity) * tile;
                    if distance_sq > reach * reach {
                        continue;
                    }
                    let distance = distance_sq.sqrt();
                    let intensity = (-distance / tile + f32::from(source.intensity)) * FALLOFF;
                    if intensity < MIN_CONTRIBUTION {
                        continue;
                    }
                    let intensity = (intensity * source.brightness).min(1.0);
                    color = color.channel_max(Rgb::from_8bit(u16::from(source.color), intensity));
                }
                let offset = index * 4;
                self.pixels[offset] = color.r;
                self.pixels[offset + 1] = color.g;
                self.pixels[offset + 2] = color.b;
                self.pixels[offset + 3] = 255;
            }
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, tile_x: i32, tile_y: i32) -> Option<Rgb> {
        let offset = self.tile_index(tile_x, tile_y)? * 4;
        Some(Rgb::new(
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ))
    }

    pub fn draw(&self, pool: &mut dyn DrawPool, dest: Rect) {
        if !self.enabled || !self.is_dark || self.pixels.is_empty() {
            return;
        }
        pool.set_composition_mode(CompositionMode::Light, true);
        pool.add_textured_rect(
            dest,
            TextureImage {
                width: self.width,
                height: self.height,
                pixels: &self.pixels,
            },
        );
    }

    fn tile_index(&self, tile_x: i32, tile_y: i32) -> Option<usize> {
        if tile_x < 0 || tile_y < 0 {
            return None;
        }
        let (tile_x, tile_y) = (tile_x as u32, tile_y as u32);
        if tile_x >= self.width || tile_y >= self.height {
            return None;
        }
        Some((tile_y * self.width + tile_x) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::draw_pool::{DrawCommand, RecordingDrawPool};

    fn dark_view() -> LightView {
        let mut view = LightView::new();
        view.resize(5, 5, 32);
        view.set_global_light(Light::new(40, 215));
        view
    }

    fn lcg_next(state: &mut u64) -> u32 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (*state >> 32) as u32
    }

    #[test]
    fn global_light_controls_darkness() {
        let mut view = LightView::new();
        view.set_global_light(Light::new(250, 215));
        assert!(!view.is_dark());
        assert_eq!(view.global_color(), Rgb::WHITE);
        view.set_global_light(Light::new(249, 215));
        assert!(view.is_dark());
        view.set_global_light(Light::new(0, 215));
        assert_eq!(view.global_color(), Rgb::BLACK);
    }

    #[test]
    fn sources_ignored_when_lit_or_empty() {
        let mut view = LightView::new();
        view.resize(5, 5, 32);
        view.set_global_light(Light::new(255, 215));
        view.add_light_source(16, 16, Light::new(5, 206), 1.0);
        assert!(view.sources().is_empty());
        let mut dark = dark_view();
        dark.add_light_source(16, 16, Light::new(0, 206), 1.0);
        assert!(dark.sources().is_empty());
    }

    #[test]
    fn consecutive_sources_at_same_spot_merge() {
        let mut view = dark_view();
        view.add_light_source(48, 48, Light::new(5, 206), 1.0);
        view.add_light_source(48, 48, Light::new(8, 206), 1.0);
        assert_eq!(view.sources().len(), 1);
        assert_eq!(view.sources()[0].intensity, 8);
        view.add_light_source(48, 48, Light::new(3, 206), 1.0);
        assert_eq!(view.sources()[0].intensity, 8);
        view.add_light_source(48, 48, Light::new(3, 180), 1.0);
        assert_eq!(view.sources().len(), 2);
    }

    #[test]
    fn light_falls_off_with_distance() {
        let mut view = dark_view();
        view.add_light_source(16, 16, Light::new(3, 215), 1.0);
        view.update_pixels();
        let near = view.pixel(0, 0).expect("pixel");
        let far = view.pixel(4, 4).expect("pixel");
        assert!(near.r > far.r);
        assert_eq!(far, view.global_color());
        assert_eq!(view.pixels()[3], 255);
    }

    #[test]
    fn shade_mark_hides_earlier_sources() {
        let mut view = dark_view();
        view.add_light_source(16, 16, Light::new(3, 215), 1.0);
        view.reset_shade(0, 0);
        view.update_pixels();
        assert_eq!(view.pixel(0, 0), Some(view.global_color()));
        assert!(view.pixel(1, 0).expect("pixel").r > view.global_color().r);
    }

    #[test]
    fn lighting_never_darkens_below_ambient() {
        let mut state = 0x5eed_1234_abcd_0001;
        for _ in 0..32 {
            let mut view = LightView::new();
            view.resize(6, 6, 32);
            view.set_global_light(Light::new(
                (lcg_next(&mut state) % 250) as u8,
                (lcg_next(&mut state) % 216) as u8,
            ));
            for _ in 0..8 {
                view.add_light_source(
                    (lcg_next(&mut state) % 192) as i32,
                    (lcg_next(&mut state) % 192) as i32,
                    Light::new(
                        (lcg_next(&mut state) % 10) as u8,
                        (lcg_next(&mut state) % 216) as u8,
                    ),
                    (lcg_next(&mut state) % 100) as f32 / 100.0,
                );
            }
            view.update_pixels();
            let ambient = view.global_color();
            for tile_y in 0..6 {
                for tile_x in 0..6 {
                    let pixel = view.pixel(tile_x, tile_y).expect("pixel");
                    assert!(pixel.r >= ambient.r && pixel.g >= ambient.g && pixel.b >= ambient.b);
                }
            }
        }
    }

    #[test]
    fn resize_is_idempotent_and_draw_needs_darkness() {
        let mut view = dark_view();
        view.add_light_source(16, 16, Light::new(2, 215), 1.0);
        view.resize(5, 5, 32);
        assert_eq!(view.sources().len(), 1);
        view.resize(6, 5, 32);
        assert!(view.sources().is_empty());

        view.update_pixels();
        let mut pool = RecordingDrawPool::new();
        view.draw(&mut pool, Rect::new(0, 0, 192, 160));
        assert!(matches!(
            pool.commands[0],
            DrawCommand::Composition { mode: CompositionMode::Light, once: true }
        ));
        assert!(matches!(pool.commands[1], DrawCommand::TexturedRect { width: 6, height: 5, .. }));

        let mut lit = LightView::new();
        lit.resize(2, 2, 32);
        lit.update_pixels();
        let mut pool = RecordingDrawPool::new();
        lit.draw(&mut pool, Rect::new(0, 0, 64, 64));
        assert!(pool.commands.is_empty());
    }
}

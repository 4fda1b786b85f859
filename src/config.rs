use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::world::viewport::ViewportSize;

/// Logarithmic step-speed curve used by newer servers:
/// `floor(a * ln(speed + b) + c + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedFormula {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Client-side rendering knobs, read from `client.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub tile_pixels: u32,
    pub effect_ticks_per_frame: u64,
    pub missile_ticks_per_frame: u64,
    pub item_cycle_ms: u64,
    pub animated_text_duration_ms: u64,
    pub tile_max_things: usize,
    pub tile_max_elevation: u16,
    pub effect_alpha: f32,
    pub missile_alpha: f32,
    pub enhanced_animations: bool,
    pub light_enabled: bool,
    pub optimize: bool,
    pub draw_creature_info: bool,
    pub viewport_width: u16,
    pub viewport_height: u16,
    pub server_beat_ms: u64,
    pub diagonal_step_factor: u64,
    pub speed_formula: Option<SpeedFormula>,
    pub client_version: u16,
    pub text_metrics_capacity: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tile_pixels: 32,
            effect_ticks_per_frame: 100,
            missile_ticks_per_frame: 50,
            item_cycle_ms: 1_000,
            animated_text_duration_ms: 1_000,
            tile_max_things: 10,
            tile_max_elevation: 24,
            effect_alpha: 1.0,
            missile_alpha: 1.0,
            enhanced_animations: false,
            light_enabled: true,
            optimize: false,
            draw_creature_info: true,
            viewport_width: 18,
            viewport_height: 14,
            server_beat_ms: 50,
            diagonal_step_factor: 3,
            speed_formula: None,
            client_version: 1_098,
            text_metrics_capacity: 256,
        }
    }
}

impl RenderSettings {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut settings: RenderSettings = serde_yaml::from_str(content)
            .map_err(|err| format!("settings parse error: {}", err))?;
        settings.normalize();
        Ok(settings)
    }

    fn normalize(&mut self) {
        self.tile_pixels = self.tile_pixels.max(1);
        self.effect_ticks_per_frame = self.effect_ticks_per_frame.max(1);
        self.missile_ticks_per_frame = self.missile_ticks_per_frame.max(1);
        self.server_beat_ms = self.server_beat_ms.max(1);
        self.effect_alpha = self.effect_alpha.clamp(0.0, 1.0);
        self.missile_alpha = self.missile_alpha.clamp(0.0, 1.0);
        self.tile_max_things = self.tile_max_things.max(1);
    }

    /// Applies `TIBIA_*` overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Some(value) = env_flag("TIBIA_LIGHT") {
            self.light_enabled = value;
        }
        if let Some(value) = env_flag("TIBIA_ENHANCED_ANIMATIONS") {
            self.enhanced_animations = value;
        }
        if let Some(value) = env_flag("TIBIA_OPTIMIZE") {
            self.optimize = value;
        }
        if let Some(value) = env_number::<f32>("TIBIA_EFFECT_ALPHA") {
            self.effect_alpha = value;
        }
        if let Some(value) = env_number::<f32>("TIBIA_MISSILE_ALPHA") {
            self.missile_alpha = value;
        }
        self.normalize();
    }

    pub fn viewport_size(&self) -> ViewportSize {
        ViewportSize {
            width: self.viewport_width.max(1),
            height: self.viewport_height.max(1),
        }
    }

    /// Window in which a new floating number joins the previous one.
    pub fn animated_text_merge_window_ms(&self) -> u64 {
        (self.animated_text_duration_ms as f64 / 2.5) as u64
    }

    pub fn animated_text_lifetime_ms(&self) -> u64 {
        if self.optimize {
            self.animated_text_duration_ms / 2
        } else {
            self.animated_text_duration_ms
        }
    }
}

#[derive(Debug)]
pub struct ClientConfig {
    pub root: PathBuf,
    pub frames: u32,
    pub frame_ms: u64,
    pub log_filter: String,
    pub settings: RenderSettings,
}

impl ClientConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: tibia-client <asset-root> [frames] [frame_ms]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let frames = if args.len() > 2 {
            args[2]
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid frame count '{}'", args[2]))?
        } else {
            60
        };
        let frame_ms = if args.len() > 3 {
            args[3]
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid frame length '{}'", args[3]))?
        } else {
            16
        };
        let settings_path = root.join("client.yml");
        let mut settings = if settings_path.exists() {
            RenderSettings::load(&settings_path)?
        } else {
            RenderSettings::default()
        };
        settings.apply_env();
        let log_filter = std::env::var("TIBIA_LOG")
            .ok()
            .and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .unwrap_or_else(|| "info".to_string());
        Ok(Self {
            root,
            frames,
            frame_ms,
            log_filter,
            settings,
        })
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            log::warn!(target: "game", "ignoring invalid {} '{}'", name, value);
            None
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

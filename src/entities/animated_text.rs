use crate::config::RenderSettings;
use crate::entities::thing::{LifecycleContext, ThingId};
use crate::render::color::Rgb;
use crate::render::draw_pool::{DrawPool, Rect, TextDraw};
use crate::render::text::{TextMetricsCache, DEFAULT_FONT};
use crate::world::position::Position;
use crate::world::scheduler::ScheduledEvent;
use crate::world::time::Timer;

/// Floating text (damage numbers, heals, experience) that drifts up from a
/// tile and fades out.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedText {
    id: ThingId,
    color: Rgb,
    text: String,
    font: String,
    offset: (i32, i32),
    position: Option<Position>,
    timer: Timer,
}

impl AnimatedText {
    pub fn new(id: ThingId, text: &str, color_8bit: u16) -> Self {
        Self {
            id,
            color: Rgb::from_8bit(color_8bit, 1.0),
            text: text.to_string(),
            font: DEFAULT_FONT.to_string(),
            offset: (0, 0),
            position: None,
            timer: Timer::default(),
        }
    }

    pub fn id(&self) -> ThingId {
        self.id
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn set_color(&mut self, color_8bit: u16) {
        self.color = Rgb::from_8bit(color_8bit, 1.0);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    pub fn set_font(&mut self, font: &str) {
        self.font = font.to_string();
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    pub fn set_offset(&mut self, offset: (i32, i32)) {
        self.offset = offset;
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position.is_valid().then_some(position);
    }

    pub fn elapsed(&self, now: u64) -> u64 {
        self.timer.ticks_elapsed(now)
    }

    /// Starts the drift and schedules removal once the text has faded.
    pub fn on_appear(&mut self, ctx: &mut LifecycleContext<'_>) {
        self.timer.restart(ctx.now);
        ctx.scheduler.schedule_event(
            ScheduledEvent::RemoveAnimatedText(self.id),
            ctx.settings.animated_text_lifetime_ms(),
            ctx.now,
        );
    }

    /// Folds `other` into this text when both are fresh integer texts of the
    /// same look. On success the caller drops `other`.
    pub fn merge(&mut self, other: &AnimatedText, settings: &RenderSettings, now: u64) -> bool {
        if self.color != other.color || self.font != other.font {
            return false;
        }
        if self.elapsed(now) > settings.animated_text_merge_window_ms() {
            return false;
        }
        let (Ok(mine), Ok(theirs)) = (
            self.text.trim().parse::<i64>(),
            other.text.trim().parse::<i64>(),
        ) else {
            return false;
        };
        let Some(sum) = mine.checked_add(theirs) else {
            return false;
        };
        self.text = sum.to_string();
        true
    }

    /// Issues the text at its drifted position. `dest` is the pixel origin of
    /// the text's tile; nothing is drawn once it leaves `visible`.
    pub fn draw_text(
        &self,
        pool: &mut dyn DrawPool,
        metrics: &mut TextMetricsCache,
        dest: (i32, i32),
        visible: Rect,
        settings: &RenderSettings,
        now: u64,
    ) {
        let size = metrics.measure(&self.font, &self.text);
        let tf = settings.animated_text_duration_ms.max(1) as f64;
        let t = self.elapsed(now) as f64;

        let drift_x = 24.0 - f64::from(size.width) / 2.0 - (4.0 * t / tf + 8.0 * t * t / (tf * tf));
        let drift_y = 8.0 - 48.0 * t / tf;
        let x = dest.0 + drift_x as i32 + self.offset.0;
        let y = dest.1 + drift_y as i32 + self.offset.1;

        let rect = Rect::new(x, y, size.width, size.height);
        if !visible.contains_rect(&rect) {
            return;
        }

        let fade_start = tf / 1.2;
        let alpha = if t > fade_start {
            ((1.0 - (t - fade_start) / (tf - fade_start)).max(0.0) * 255.0) as u8
        } else {
            255
        };
        pool.add_text(TextDraw {
            text: self.text.clone(),
            font: self.font.clone(),
            rect,
            color: self.color.with_alpha(alpha),
        });
    }
}

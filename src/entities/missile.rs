use crate::animation::pattern::{missile_pattern, PatternIndex};
use crate::entities::thing::{DrawContext, LifecycleContext, ThingBase, ThingBehavior, ThingId};
use crate::render::color::Rgb;
use crate::render::draw_pool::{DrawOrder, DrawPoolType, SpriteDraw, TileDest};
use crate::world::position::{direction_from_positions, Direction, Position};
use crate::world::scheduler::ScheduledEvent;
use crate::world::thing_types::{ThingCategory, ThingTypeCatalog};
use crate::world::time::Timer;

/// Projectile flying from its source tile toward a destination tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Missile {
    base: ThingBase,
    client_id: u16,
    timer: Timer,
    direction: Direction,
    /// Flight vector in pixels.
    delta: (f64, f64),
    distance: f64,
    duration: f64,
    shader: Option<String>,
}

impl Missile {
    pub fn new(id: ThingId, client_id: u16, catalog: &ThingTypeCatalog) -> Self {
        let mut missile = Self {
            base: ThingBase::new(id),
            client_id: 0,
            timer: Timer::default(),
            direction: Direction::Invalid,
            delta: (0.0, 0.0),
            distance: 0.0,
            duration: 0.0,
            shader: None,
        };
        missile.set_id(client_id, catalog);
        missile
    }

    pub fn with_shader(mut self, shader: impl Into<String>) -> Self {
        self.shader = Some(shader.into());
        self
    }

    pub fn shader(&self) -> Option<&str> {
        self.shader.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pattern(&self) -> PatternIndex {
        missile_pattern(self.direction)
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Flight time in milliseconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Flight length in tiles.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn delta(&self) -> (f64, f64) {
        self.delta
    }

    pub fn set_path(&mut self, from: Position, to: Position, ctx: &mut LifecycleContext<'_>) {
        self.base.set_position(from);
        let dx = f64::from(to.x) - f64::from(from.x);
        let dy = f64::from(to.y) - f64::from(from.y);
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 {
            ctx.scheduler
                .add_event(ScheduledEvent::RemoveThing(self.base.id), ctx.now);
            return;
        }
        self.set_direction(direction_from_positions(from, to));
        let ticks = ctx.settings.missile_ticks_per_frame as f64;
        self.duration = 2.0 * ticks * length.sqrt();
        let tile = f64::from(ctx.settings.tile_pixels);
        self.delta = (dx * tile, dy * tile);
        self.distance = length;
        self.timer.restart(ctx.now);
        ctx.scheduler.schedule_event(
            ScheduledEvent::RemoveThing(self.base.id),
            self.duration.ceil() as u64,
            ctx.now,
        );
    }

    /// Share of the flight already covered, 0.0 to 1.0.
    pub fn progress(&self, now: u64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.timer.ticks_elapsed(now) as f64 / self.duration).min(1.0)
    }
}

impl ThingBehavior for Missile {
    fn base(&self) -> &ThingBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ThingBase {
        &mut self.base
    }

    fn category(&self) -> ThingCategory {
        ThingCategory::Missile
    }

    fn client_id(&self) -> u16 {
        self.client_id
    }

    fn set_id(&mut self, id: u16, catalog: &ThingTypeCatalog) {
        self.client_id = if catalog.is_valid_dat_id(id, ThingCategory::Missile) {
            id
        } else {
            0
        };
    }

    fn draw(&self, ctx: &mut DrawContext<'_>, dest: TileDest) {
        if self.drawable_type(ctx.catalog).is_none() {
            return;
        }
        let progress = self.progress(ctx.now);
        let offset_x = (self.delta.0 * progress).round() as i32;
        let offset_y = (self.delta.1 * progress).round() as i32;
        ctx.pool.set_draw_order(DrawOrder::Fourth);
        if ctx.pool.current_type() == DrawPoolType::Map && ctx.settings.missile_alpha < 1.0 {
            ctx.pool.set_opacity(ctx.settings.missile_alpha, true);
        }
        if let Some(shader) = self.shader.as_deref() {
            ctx.pool.set_shader_program(shader, true);
        }
        ctx.pool.add_sprite(SpriteDraw {
            category: ThingCategory::Missile,
            client_id: self.client_id,
            dest: dest.with_offset(offset_x, offset_y),
            pattern: self.pattern(),
            phase: 0,
            color: Rgb::WHITE,
        });
        ctx.pool.reset_draw_order();
    }
}

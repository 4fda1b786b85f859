use std::cell::Cell;

use crate::animation::pattern::{creature_direction_pattern, cycle_phase, PatternIndex};
use crate::config::RenderSettings;
use crate::entities::outfit::Outfit;
use crate::entities::player::Player;
use crate::entities::thing::{DrawContext, LifecycleContext, ThingBase, ThingBehavior, ThingId};
use crate::render::color::{Rgb, DEFAULT_LIGHT_COLOR};
use crate::render::draw_pool::{DrawPool, Rect, SpriteDraw, TextDraw, TileDest};
use crate::render::text::{TextMetricsCache, DEFAULT_FONT};
use crate::world::position::{direction_from_positions, Direction, Position};
use crate::world::scheduler::{EventHandle, ScheduledEvent, Scheduler};
use crate::world::thing_types::{
    Light, ThingCategory, ThingType, ThingTypeCatalog, DEFAULT_GROUND_SPEED,
};
use crate::world::time::Timer;

/// Server-side creature id, distinct from the map's runtime `ThingId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureKind {
    Npc,
    Monster,
    Player(Player),
}

const IDLE_CYCLE_MS: u64 = 1000;
const FINISH_ANIMATION_MAX_DELAY_MS: u64 = 200;
const DEFAULT_WALK_PHASES: u32 = 4;

#[derive(Debug, Clone, PartialEq, Default)]
struct WalkState {
    walking: bool,
    timer: Timer,
    ground_speed: u16,
    walked_pixels: u32,
    offset: (i32, i32),
    animation_phase: u32,
    turn_direction: Option<Direction>,
    last_step_direction: Option<Direction>,
    last_step_from: Option<Position>,
    last_step_to: Option<Position>,
    foot_step: u32,
    foot_timer: Timer,
    foot_step_drawn: Cell<bool>,
    update_event: Option<EventHandle>,
    finish_event: Option<EventHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    base: ThingBase,
    creature_id: CreatureId,
    name: String,
    kind: CreatureKind,
    health_percent: u8,
    direction: Direction,
    outfit: Outfit,
    speed: u16,
    base_speed: u16,
    light: Light,
    passable: bool,
    removed: bool,
    allow_appear_walk: bool,
    walk: WalkState,
}

impl Creature {
    pub fn new(id: ThingId, creature_id: CreatureId, name: &str, kind: CreatureKind) -> Self {
        Self {
            base: ThingBase::new(id),
            creature_id,
            name: name.to_string(),
            kind,
            health_percent: 100,
            direction: Direction::South,
            outfit: Outfit::default(),
            speed: 200,
            base_speed: 200,
            light: Light::new(0, DEFAULT_LIGHT_COLOR),
            passable: false,
            removed: false,
            allow_appear_walk: false,
            walk: WalkState::default(),
        }
    }

    /// Unvalidated look type; `set_id` checks it against the catalog.
    pub fn with_look_type(mut self, look_type: u16) -> Self {
        self.outfit = Outfit::new(look_type);
        self
    }

    pub fn with_speed(mut self, speed: u16) -> Self {
        self.speed = speed;
        self.base_speed = speed;
        self
    }

    pub fn creature_id(&self) -> CreatureId {
        self.creature_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CreatureKind {
        self.kind
    }

    pub fn player(&self) -> Option<&Player> {
        match &self.kind {
            CreatureKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, CreatureKind::Npc)
    }

    pub fn is_monster(&self) -> bool {
        matches!(self.kind, CreatureKind::Monster)
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CreatureKind::Player(_))
    }

    pub fn is_local_player(&self) -> bool {
        self.player().map(Player::is_local).unwrap_or(false)
    }

    pub fn health_percent(&self) -> u8 {
        self.health_percent
    }

    pub fn set_health_percent(&mut self, health_percent: u8) {
        self.health_percent = health_percent.min(100);
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        if direction != Direction::Invalid {
            self.direction = direction;
        }
    }

    /// Turning mid-step is deferred until the step ends.
    pub fn turn(&mut self, direction: Direction) {
        if self.walk.walking {
            self.walk.turn_direction = Some(direction);
        } else {
            self.set_direction(direction);
        }
    }

    pub fn outfit(&self) -> &Outfit {
        &self.outfit
    }

    pub fn set_outfit(&mut self, outfit: Outfit) {
        self.outfit = outfit;
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: u16) {
        self.speed = speed;
    }

    pub fn base_speed(&self) -> u16 {
        self.base_speed
    }

    pub fn set_base_speed(&mut self, base_speed: u16) {
        self.base_speed = base_speed;
    }

    pub fn is_passable(&self) -> bool {
        self.passable
    }

    pub fn set_passable(&mut self, passable: bool) {
        self.passable = passable;
    }

    pub fn set_light(&mut self, light: Light) {
        self.light = light;
    }

    /// Emitted light. Out-of-palette colors fall back to the default and the
    /// local player always glows a little.
    pub fn light(&self) -> Light {
        let mut light = self.light;
        if light.color == 0 || light.color > DEFAULT_LIGHT_COLOR {
            light.color = DEFAULT_LIGHT_COLOR;
        }
        if self.is_local_player() && light.intensity < 2 {
            light.intensity = 2;
        }
        light
    }

    pub fn is_walking(&self) -> bool {
        self.walk.walking
    }

    pub fn walk_offset(&self) -> (i32, i32) {
        self.walk.offset
    }

    pub fn walked_pixels(&self) -> u32 {
        self.walk.walked_pixels
    }

    pub fn walk_animation_phase(&self) -> u32 {
        self.walk.animation_phase
    }

    pub fn last_step_from(&self) -> Option<Position> {
        self.walk.last_step_from
    }

    pub fn last_step_to(&self) -> Option<Position> {
        self.walk.last_step_to
    }

    pub fn allow_appear_walk(&mut self) {
        self.allow_appear_walk = true;
    }

    /// Milliseconds one step takes on the current ground.
    pub fn step_duration(&self, settings: &RenderSettings, ignore_diagonal: bool) -> u64 {
        if self.speed < 1 {
            return 0;
        }
        let ground_speed = match self.walk.ground_speed {
            0 => DEFAULT_GROUND_SPEED,
            speed => speed,
        };
        let mut duration = 1000 * u64::from(ground_speed);
        match settings.speed_formula {
            Some(formula) => {
                let speed = f64::from(self.speed) * 2.0;
                let mut step_speed = 1.0;
                if speed > -formula.b {
                    step_speed = (formula.a * (speed / 2.0 + formula.b).ln() + formula.c + 0.5)
                        .floor()
                        .max(1.0);
                }
                duration /= step_speed as u64;
            }
            None => duration /= u64::from(self.speed),
        }

        let beat = settings.server_beat_ms.max(1);
        duration = duration.div_ceil(beat) * beat;

        let diagonal = self
            .walk
            .last_step_direction
            .map(Direction::is_diagonal)
            .unwrap_or(false);
        if !ignore_diagonal && diagonal {
            duration *= settings.diagonal_step_factor;
        }
        duration
    }

    /// Starts animating a one-tile step. The map has already moved the
    /// creature onto `to`.
    pub fn walk(
        &mut self,
        from: Position,
        to: Position,
        ground_speed: u16,
        ctx: &mut LifecycleContext<'_>,
    ) {
        if from == to {
            return;
        }
        let direction = direction_from_positions(from, to);
        self.walk.last_step_direction = Some(direction);
        self.walk.last_step_from = Some(from);
        self.walk.last_step_to = Some(to);
        self.walk.ground_speed = ground_speed;
        self.set_direction(direction);

        self.walk.walking = true;
        self.walk.timer.restart(ctx.now);
        self.walk.walked_pixels = 0;
        if let Some(handle) = self.walk.finish_event.take() {
            ctx.scheduler.cancel(handle);
        }
        self.walk.turn_direction = None;
        self.next_walk_update(ctx);
    }

    pub fn stop_walk(&mut self, scheduler: &mut Scheduler) {
        if self.walk.walking {
            self.terminate_walk(scheduler);
        }
    }

    /// Advances the walk and re-arms the periodic update while still walking.
    pub fn next_walk_update(&mut self, ctx: &mut LifecycleContext<'_>) {
        if let Some(handle) = self.walk.update_event.take() {
            ctx.scheduler.cancel(handle);
        }
        self.update_walk(ctx);
        if !self.walk.walking {
            return;
        }
        let tile_pixels = u64::from(ctx.settings.tile_pixels.max(1));
        let interval = (self.step_duration(ctx.settings, true) / tile_pixels).max(1);
        let handle = ctx
            .scheduler
            .schedule_event(ScheduledEvent::WalkUpdate(self.base.id), interval, ctx.now);
        self.walk.update_event = Some(handle);
    }

    fn update_walk(&mut self, ctx: &mut LifecycleContext<'_>) {
        let tile = ctx.settings.tile_pixels;
        let step = self.step_duration(ctx.settings, true);
        let elapsed = self.walk.timer.ticks_elapsed(ctx.now);
        let total = if step > 0 {
            ((elapsed * u64::from(tile)) / step).min(u64::from(tile)) as u32
        } else {
            tile
        };
        self.walk.walked_pixels = self.walk.walked_pixels.max(total);

        self.update_walk_animation(total, step, ctx);
        self.update_walk_offset(self.walk.walked_pixels, tile);

        if self.walk.walking && elapsed >= self.step_duration(ctx.settings, false) {
            self.terminate_walk(ctx.scheduler);
        }
    }

    fn walk_animation_phases(&self, catalog: &ThingTypeCatalog) -> u32 {
        let look = if self.outfit.has_mount() {
            self.outfit.mount()
        } else {
            self.outfit.look_type()
        };
        catalog
            .get_creature(look)
            .map(|thing_type| thing_type.animation_phases)
            .filter(|phases| *phases > 0)
            .unwrap_or(DEFAULT_WALK_PHASES)
    }

    fn update_walk_animation(&mut self, total: u32, step: u64, ctx: &mut LifecycleContext<'_>) {
        let tile = ctx.settings.tile_pixels;
        let foot_phases = self.walk_animation_phases(ctx.catalog) - 1;
        let foot_delay = step / 3;
        if foot_phases == 0 {
            self.walk.animation_phase = 0;
            return;
        }

        let walk = &mut self.walk;
        if walk.foot_step_drawn.get()
            && walk.foot_timer.ticks_elapsed(ctx.now) >= foot_delay
            && total < tile
        {
            walk.foot_step += 1;
            walk.animation_phase = 1 + walk.foot_step % foot_phases;
            walk.foot_step_drawn.set(false);
            walk.foot_timer.restart(ctx.now);
        } else if walk.animation_phase == 0 && total < tile {
            walk.animation_phase = 1 + walk.foot_step % foot_phases;
        }

        if total == tile && walk.finish_event.is_none() {
            let handle = ctx.scheduler.schedule_event(
                ScheduledEvent::FinishWalkAnimation(self.base.id),
                foot_delay.min(FINISH_ANIMATION_MAX_DELAY_MS),
                ctx.now,
            );
            walk.finish_event = Some(handle);
        }
    }

    /// Scheduled once the sprite has covered the full tile; drops back to the
    /// standing frame unless a new step already started.
    pub fn finish_walk_animation(&mut self, now: u64, settings: &RenderSettings) {
        if !self.walk.walking
            || self.walk.timer.ticks_elapsed(now) >= self.step_duration(settings, true)
        {
            self.walk.animation_phase = 0;
        }
        self.walk.finish_event = None;
    }

    fn update_walk_offset(&mut self, walked: u32, tile: u32) {
        let (walked, tile) = (walked as i32, tile as i32);
        let mut offset = (0, 0);
        match self.direction {
            Direction::North | Direction::Northeast | Direction::Northwest => {
                offset.1 = tile - walked
            }
            Direction::South | Direction::Southeast | Direction::Southwest => {
                offset.1 = walked - tile
            }
            _ => {}
        }
        match self.direction {
            Direction::East | Direction::Northeast | Direction::Southeast => {
                offset.0 = walked - tile
            }
            Direction::West | Direction::Northwest | Direction::Southwest => {
                offset.0 = tile - walked
            }
            _ => {}
        }
        self.walk.offset = offset;
    }

    fn terminate_walk(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.walk.update_event.take() {
            scheduler.cancel(handle);
        }
        if let Some(direction) = self.walk.turn_direction.take() {
            self.set_direction(direction);
        }
        self.walk.walking = false;
        self.walk.walked_pixels = 0;
        self.walk.offset = (0, 0);
        self.walk.animation_phase = 0;
    }

    /// Called after the map placed the creature. Adjacent moves the server
    /// announced as walks animate; anything else snaps.
    pub fn on_appear(
        &mut self,
        from: Option<Position>,
        ground_speed: u16,
        ctx: &mut LifecycleContext<'_>,
    ) {
        let to = self.base.position();
        if self.removed {
            self.stop_walk(ctx.scheduler);
            self.removed = false;
            return;
        }
        let (Some(from), Some(to)) = (from, to) else {
            return;
        };
        let adjacent = from.z == to.z && from.x.abs_diff(to.x) <= 1 && from.y.abs_diff(to.y) <= 1;
        if adjacent && self.allow_appear_walk {
            self.allow_appear_walk = false;
            self.walk(from, to, ground_speed, ctx);
        } else if from.x != to.x || from.y != to.y {
            self.stop_walk(ctx.scheduler);
        }
    }

    pub fn on_disappear(&mut self) {
        self.removed = true;
    }

    pub fn animation_phase(&self, thing_type: &ThingType, now: u64, animate: bool) -> u32 {
        let phases = thing_type.animation_phases;
        if phases <= 1 {
            return 0;
        }
        if self.walk.walking {
            return self.walk.animation_phase.min(phases - 1);
        }
        if !animate || !thing_type.is_animate_always() {
            return 0;
        }
        cycle_phase(phases, now, IDLE_CYCLE_MS)
    }

    /// Name tag above the creature, tinted by remaining health.
    pub fn draw_information(
        &self,
        pool: &mut dyn DrawPool,
        metrics: &mut TextMetricsCache,
        tile_origin: (i32, i32),
        settings: &RenderSettings,
    ) {
        if self.name.is_empty() {
            return;
        }
        let size = metrics.measure(DEFAULT_FONT, &self.name);
        let tile = settings.tile_pixels as i32;
        let center_x = tile_origin.0 + self.walk.offset.0 + tile / 2;
        let top = tile_origin.1 + self.walk.offset.1 - size.height - 2;
        pool.add_text(TextDraw {
            text: self.name.clone(),
            font: DEFAULT_FONT.to_string(),
            rect: Rect::new(center_x - size.width / 2, top, size.width, size.height),
            color: health_color(self.health_percent).with_alpha(255),
        });
    }
}

pub fn health_color(health_percent: u8) -> Rgb {
    match health_percent {
        93..=u8::MAX => Rgb::from_u32(0x00BC00),
        61..=92 => Rgb::from_u32(0x50A150),
        31..=60 => Rgb::from_u32(0xA1A100),
        9..=30 => Rgb::from_u32(0xBF0A0A),
        4..=8 => Rgb::from_u32(0x910F0F),
        _ => Rgb::from_u32(0x850C0C),
    }
}

impl ThingBehavior for Creature {
    fn base(&self) -> &ThingBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ThingBase {
        &mut self.base
    }

    fn category(&self) -> ThingCategory {
        ThingCategory::Creature
    }

    fn client_id(&self) -> u16 {
        self.outfit.look_type()
    }

    fn set_id(&mut self, id: u16, catalog: &ThingTypeCatalog) {
        let look_type = if catalog.is_valid_dat_id(id, ThingCategory::Creature) {
            id
        } else {
            0
        };
        self.outfit.set_look_type(look_type);
    }

    fn draw(&self, ctx: &mut DrawContext<'_>, dest: TileDest) {
        let Some(thing_type) = self.drawable_type(ctx.catalog) else {
            return;
        };
        let dest = dest.with_offset(self.walk.offset.0, self.walk.offset.1);
        let phase = self.animation_phase(thing_type, ctx.now, true);

        let mut pattern_z = 0;
        if self.outfit.has_mount() {
            if let Some(mount_type) = ctx
                .catalog
                .get_creature(self.outfit.mount())
                .filter(|t| t.is_drawable())
            {
                let x = if mount_type.pattern_x >= 4 {
                    creature_direction_pattern(self.direction)
                } else {
                    0
                };
                ctx.pool.add_sprite(SpriteDraw {
                    category: ThingCategory::Creature,
                    client_id: self.outfit.mount(),
                    dest,
                    pattern: PatternIndex::new(x, 0, 0),
                    phase: self.animation_phase(mount_type, ctx.now, true),
                    color: Rgb::WHITE,
                });
                pattern_z = thing_type.pattern_z.saturating_sub(1).min(1);
            }
        }

        let x = if thing_type.pattern_x >= 4 {
            creature_direction_pattern(self.direction)
        } else {
            0
        };
        for layer in 0..thing_type.pattern_y {
            if !self.outfit.has_addon_layer(layer) {
                continue;
            }
            ctx.pool.add_sprite(SpriteDraw {
                category: ThingCategory::Creature,
                client_id: self.outfit.look_type(),
                dest,
                pattern: PatternIndex::new(x, layer, pattern_z),
                phase,
                color: Rgb::WHITE,
            });
        }
        self.walk.foot_step_drawn.set(true);
    }
}

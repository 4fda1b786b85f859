use crate::animation::pattern::{camera_pattern, frame_phase, PatternIndex};
use crate::config::RenderSettings;
use crate::entities::thing::{DrawContext, LifecycleContext, ThingBase, ThingBehavior, ThingId};
use crate::render::color::Rgb;
use crate::render::draw_pool::{DrawPoolType, SpriteDraw, TileDest};
use crate::world::position::Position;
use crate::world::scheduler::ScheduledEvent;
use crate::world::thing_types::{ThingCategory, ThingType, ThingTypeCatalog};
use crate::world::time::Timer;

/// Short-lived animation on a tile. Removes itself once its duration runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    base: ThingBase,
    client_id: u16,
    timer: Timer,
    duration: u64,
    time_to_start_drawing: u64,
    shader: Option<String>,
    pattern: PatternIndex,
}

impl Effect {
    pub fn new(id: ThingId, client_id: u16, catalog: &ThingTypeCatalog) -> Self {
        let mut effect = Self {
            base: ThingBase::new(id),
            client_id: 0,
            timer: Timer::default(),
            duration: 0,
            time_to_start_drawing: 0,
            shader: None,
            pattern: PatternIndex::default(),
        };
        effect.set_id(client_id, catalog);
        effect
    }

    pub fn with_shader(mut self, shader: impl Into<String>) -> Self {
        self.shader = Some(shader.into());
        self
    }

    pub fn shader(&self) -> Option<&str> {
        self.shader.as_deref()
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn time_to_start_drawing(&self) -> u64 {
        self.time_to_start_drawing
    }

    pub fn elapsed(&self, now: u64) -> u64 {
        self.timer.ticks_elapsed(now)
    }

    /// Variation picked from the world position, kept non-negative.
    pub fn pattern(&self) -> PatternIndex {
        self.pattern
    }

    /// The position is always stored; the pattern only follows it when the
    /// descriptor has a usable grid.
    pub fn set_position(&mut self, position: Position, catalog: &ThingTypeCatalog) {
        self.base.set_position(position);
        if self.client_id == 0 {
            return;
        }
        let Some(thing_type) = self.thing_type(catalog) else {
            return;
        };
        if thing_type.pattern_x == 0 || thing_type.pattern_y == 0 {
            return;
        }
        let px = i64::from(thing_type.pattern_x);
        let py = i64::from(thing_type.pattern_y);
        self.pattern = PatternIndex::new(
            i64::from(position.x).rem_euclid(px) as u32,
            i64::from(position.y).rem_euclid(py) as u32,
            0,
        );
    }

    fn ticks_per_frame(thing_type: &ThingType, settings: &RenderSettings) -> u64 {
        settings.effect_ticks_per_frame * u64::from(thing_type.tick_multiplier.max(1))
    }

    fn full_duration(thing_type: &ThingType, settings: &RenderSettings) -> u64 {
        match thing_type.animator.as_ref() {
            Some(animator) if settings.enhanced_animations => animator.total_duration(),
            _ => {
                Self::ticks_per_frame(thing_type, settings)
                    * u64::from(thing_type.animation_phases)
            }
        }
    }

    pub fn on_appear(&mut self, ctx: &mut LifecycleContext<'_>) {
        self.duration = match self.thing_type(ctx.catalog) {
            Some(thing_type) => Self::full_duration(thing_type, ctx.settings),
            None => 0,
        };
        self.timer.restart(ctx.now);
        ctx.scheduler
            .schedule_event(ScheduledEvent::RemoveThing(self.base.id), self.duration, ctx.now);
    }

    /// Delays this effect behind a still-playing effect of the same kind.
    /// Returns false when `other` has already played long enough to be
    /// overlapped without a delay.
    pub fn wait_for(
        &mut self,
        other: &Effect,
        catalog: &ThingTypeCatalog,
        settings: &RenderSettings,
        now: u64,
    ) -> bool {
        let Some(thing_type) = other.thing_type(catalog) else {
            return false;
        };
        let min_duration = match thing_type.animator.as_ref() {
            Some(animator) if settings.enhanced_animations => animator.min_duration(),
            _ => Self::ticks_per_frame(thing_type, settings),
        };
        let min_duration = min_duration * u64::from((thing_type.animation_phases / 3).max(1));
        let other_elapsed = other.elapsed(now);
        if other_elapsed > min_duration {
            return false;
        }
        self.time_to_start_drawing = (other.duration / 3).saturating_sub(other_elapsed);
        true
    }

    pub fn animation_phase(
        &self,
        thing_type: &ThingType,
        settings: &RenderSettings,
        now: u64,
    ) -> u32 {
        let elapsed = self.elapsed(now);
        match thing_type.animator.as_ref() {
            Some(animator) if settings.enhanced_animations => animator
                .phase_at(elapsed, 1.0)
                .min(thing_type.animation_phases.saturating_sub(1)),
            _ => frame_phase(
                elapsed,
                Self::ticks_per_frame(thing_type, settings),
                thing_type.animation_phases,
            ),
        }
    }
}

impl ThingBehavior for Effect {
    fn base(&self) -> &ThingBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ThingBase {
        &mut self.base
    }

    fn category(&self) -> ThingCategory {
        ThingCategory::Effect
    }

    fn client_id(&self) -> u16 {
        self.client_id
    }

    /// Invalid ids keep the previous id.
    fn set_id(&mut self, id: u16, catalog: &ThingTypeCatalog) {
        if !catalog.is_valid_dat_id(id, ThingCategory::Effect) {
            return;
        }
        self.client_id = id;
    }

    fn draw(&self, ctx: &mut DrawContext<'_>, dest: TileDest) {
        if self.elapsed(ctx.now) < self.time_to_start_drawing {
            return;
        }
        let Some(thing_type) = self.drawable_type(ctx.catalog) else {
            return;
        };
        let phase = self.animation_phase(thing_type, ctx.settings, ctx.now);
        let pattern = match self.base.position() {
            Some(position) if ctx.central_position.is_valid() => camera_pattern(
                position,
                ctx.central_position,
                thing_type.pattern_x,
                thing_type.pattern_y,
            ),
            _ => self.pattern,
        };
        if ctx.pool.current_type() == DrawPoolType::Map && ctx.settings.effect_alpha < 1.0 {
            ctx.pool.set_opacity(ctx.settings.effect_alpha, true);
        }
        if let Some(shader) = self.shader.as_deref() {
            ctx.pool.set_shader_program(shader, true);
        }
        ctx.pool.add_sprite(SpriteDraw {
            category: ThingCategory::Effect,
            client_id: self.client_id,
            dest,
            pattern,
            phase,
            color: Rgb::WHITE,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::animator::Animator;
    use crate::render::draw_pool::{DrawCommand, RecordingDrawPool};
    use crate::world::scheduler::Scheduler;

    fn catalog() -> ThingTypeCatalog {
        let mut catalog = ThingTypeCatalog::new();
        for thing_type in [
            ThingType::new(ThingCategory::Effect, 1).with_patterns(2, 2, 1).with_phases(6),
            ThingType::new(ThingCategory::Effect, 2)
                .with_phases(2)
                .with_animator(Animator::new(vec![(50, 50), (300, 300)])),
            ThingType::new(ThingCategory::Effect, 33).with_phases(3),
            ThingType::new(ThingCategory::Effect, 4).with_patterns(0, 0, 1),
        ] {
            catalog.insert(thing_type).expect("insert");
        }
        catalog
    }

    fn appear(
        effect: &mut Effect,
        catalog: &ThingTypeCatalog,
        settings: &RenderSettings,
        scheduler: &mut Scheduler,
        now: u64,
    ) {
        let mut ctx = LifecycleContext {
            now,
            catalog,
            settings,
            scheduler,
        };
        effect.on_appear(&mut ctx);
    }

    fn draw(
        effect: &Effect,
        catalog: &ThingTypeCatalog,
        settings: &RenderSettings,
        now: u64,
    ) -> RecordingDrawPool {
        let mut pool = RecordingDrawPool::new();
        let mut ctx = DrawContext {
            now,
            catalog,
            settings,
            central_position: Position::default(),
            neighbors: None,
            pool: &mut pool,
        };
        effect.draw(&mut ctx, TileDest::new(0, 0, 7));
        pool
    }

    #[test]
    fn invalid_id_keeps_previous() {
        let catalog = catalog();
        let mut effect = Effect::new(ThingId(1), 1, &catalog);
        effect.set_id(500, &catalog);
        assert_eq!(effect.client_id(), 1);
        let fresh = Effect::new(ThingId(2), 500, &catalog);
        assert_eq!(fresh.client_id(), 0);
    }

    #[test]
    fn position_pattern_is_non_negative_modulo() {
        let catalog = catalog();
        let mut effect = Effect::new(ThingId(1), 1, &catalog);
        effect.set_position(Position::new(7, 10, 7), &catalog);
        assert_eq!(effect.pattern(), PatternIndex::new(1, 0, 0));
        assert_eq!(effect.position(), Some(Position::new(7, 10, 7)));

        let mut unset = Effect::new(ThingId(2), 500, &catalog);
        unset.set_position(Position::new(7, 10, 7), &catalog);
        assert_eq!(unset.position(), Some(Position::new(7, 10, 7)));
        assert_eq!(unset.pattern(), PatternIndex::default());

        let mut gridless = Effect::new(ThingId(3), 4, &catalog);
        gridless.set_position(Position::new(9, 9, 7), &catalog);
        assert_eq!(gridless.position(), Some(Position::new(9, 9, 7)));
        assert_eq!(gridless.pattern(), PatternIndex::default());
    }

    #[test]
    fn appearing_schedules_removal_after_duration() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut effect = Effect::new(ThingId(9), 1, &catalog);
        appear(&mut effect, &catalog, &settings, &mut scheduler, 1_000);
        assert_eq!(effect.duration(), 600);
        assert!(scheduler.drain_ready(1_599).is_empty());
        assert_eq!(
            scheduler.drain_ready(1_600),
            vec![ScheduledEvent::RemoveThing(ThingId(9))]
        );
    }

    #[test]
    fn legacy_effect_runs_four_times_slower() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut effect = Effect::new(ThingId(1), 33, &catalog);
        appear(&mut effect, &catalog, &settings, &mut scheduler, 0);
        assert_eq!(effect.duration(), 1_200);
        let thing_type = effect.thing_type(&catalog).expect("type");
        assert_eq!(effect.animation_phase(thing_type, &settings, 399), 0);
        assert_eq!(effect.animation_phase(thing_type, &settings, 400), 1);
        assert_eq!(effect.animation_phase(thing_type, &settings, 5_000), 2);
    }

    #[test]
    fn enhanced_animation_uses_animator_curve() {
        let catalog = catalog();
        let settings = RenderSettings {
            enhanced_animations: true,
            ..RenderSettings::default()
        };
        let mut scheduler = Scheduler::new();
        let mut effect = Effect::new(ThingId(1), 2, &catalog);
        appear(&mut effect, &catalog, &settings, &mut scheduler, 0);
        assert_eq!(effect.duration(), 350);
        let thing_type = effect.thing_type(&catalog).expect("type");
        assert_eq!(effect.animation_phase(thing_type, &settings, 49), 0);
        assert_eq!(effect.animation_phase(thing_type, &settings, 50), 1);
    }

    #[test]
    fn wait_for_delays_behind_a_fresh_effect() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut first = Effect::new(ThingId(1), 1, &catalog);
        appear(&mut first, &catalog, &settings, &mut scheduler, 0);

        // min duration = 100 * max(6 / 3, 1) = 200
        let mut second = Effect::new(ThingId(2), 1, &catalog);
        assert!(second.wait_for(&first, &catalog, &settings, 50));
        assert_eq!(second.time_to_start_drawing(), 150);

        let mut late = Effect::new(ThingId(3), 1, &catalog);
        assert!(!late.wait_for(&first, &catalog, &settings, 201));
        assert_eq!(late.time_to_start_drawing(), 0);
    }

    #[test]
    fn draw_waits_for_start_delay_and_applies_alpha() {
        let catalog = catalog();
        let settings = RenderSettings {
            effect_alpha: 0.5,
            ..RenderSettings::default()
        };
        let mut scheduler = Scheduler::new();
        let mut first = Effect::new(ThingId(1), 1, &catalog);
        appear(&mut first, &catalog, &settings, &mut scheduler, 0);
        let mut second = Effect::new(ThingId(2), 1, &catalog).with_shader("Outline");
        second.wait_for(&first, &catalog, &settings, 0);
        appear(&mut second, &catalog, &settings, &mut scheduler, 0);

        assert!(draw(&second, &catalog, &settings, 100).commands.is_empty());
        let pool = draw(&second, &catalog, &settings, 250);
        assert_eq!(
            pool.commands[0],
            DrawCommand::Opacity {
                opacity: 0.5,
                once: true
            }
        );
        assert!(matches!(
            &pool.commands[1],
            DrawCommand::Shader { name, once: true } if name == "Outline"
        ));
        assert_eq!(pool.sprite_count(), 1);
        assert_eq!(pool.sprites().next().expect("sprite").phase, 2);
    }
}

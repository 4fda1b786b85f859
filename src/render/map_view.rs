use std::sync::Arc;

use crate::config::RenderSettings;
use crate::entities::animated_text::AnimatedText;
use crate::entities::creature::CreatureId;
use crate::entities::missile::Missile;
use crate::entities::thing::{DrawContext, LifecycleContext, Thing, ThingBehavior, ThingId};
use crate::render::draw_pool::{DrawPool, Rect, TileDest};
use crate::render::light_view::LightView;
use crate::render::text::{MetricsStats, TextMetricsCache};
use crate::world::map::ClientMap;
use crate::world::position::{Position, MAX_FLOOR, SEA_FLOOR};
use crate::world::scheduler::Scheduler;
use crate::world::thing_types::{Light, ThingTypeCatalog};
use crate::world::time::FrameClock;
use crate::world::viewport::Viewport;

/// Floors drawn above and below the camera when underground.
const AWARE_UNDERGROUND_FLOOR_RANGE: u8 = 2;

/// Frame driver: owns the world state and turns it into draw requests once
/// per frame.
pub struct MapView {
    settings: RenderSettings,
    catalog: Arc<ThingTypeCatalog>,
    clock: FrameClock,
    scheduler: Scheduler,
    map: ClientMap,
    light_view: LightView,
    metrics: TextMetricsCache,
}

impl MapView {
    pub fn new(
        settings: RenderSettings,
        catalog: Arc<ThingTypeCatalog>,
        clock: FrameClock,
    ) -> Self {
        let metrics = TextMetricsCache::new(settings.text_metrics_capacity);
        let mut light_view = LightView::new();
        light_view.set_enabled(settings.light_enabled);
        Self {
            settings,
            catalog,
            clock,
            scheduler: Scheduler::new(),
            map: ClientMap::new(),
            light_view,
            metrics,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &ThingTypeCatalog {
        &self.catalog
    }

    pub fn map(&self) -> &ClientMap {
        &self.map
    }

    pub fn light_view(&self) -> &LightView {
        &self.light_view
    }

    pub fn metrics_stats(&self) -> &MetricsStats {
        self.metrics.stats()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn camera(&self) -> Position {
        self.map.central_position()
    }

    pub fn set_camera(&mut self, position: Position) {
        self.map.set_central_position(position);
    }

    pub fn set_global_light(&mut self, light: Light) {
        self.light_view.set_global_light(light);
    }

    pub fn allocate_id(&mut self) -> ThingId {
        self.map.allocate_id()
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_center(self.camera(), self.settings.viewport_size())
    }

    pub fn add_thing(&mut self, thing: Thing, position: Position) {
        let mut ctx = LifecycleContext {
            now: self.clock.now(),
            catalog: &self.catalog,
            settings: &self.settings,
            scheduler: &mut self.scheduler,
        };
        self.map.add_thing(thing, position, &mut ctx);
    }

    pub fn add_missile(&mut self, missile: Missile, from: Position, to: Position) {
        let mut ctx = LifecycleContext {
            now: self.clock.now(),
            catalog: &self.catalog,
            settings: &self.settings,
            scheduler: &mut self.scheduler,
        };
        self.map.add_missile(missile, from, to, &mut ctx);
    }

    pub fn add_animated_text(&mut self, text: AnimatedText, position: Position) {
        let mut ctx = LifecycleContext {
            now: self.clock.now(),
            catalog: &self.catalog,
            settings: &self.settings,
            scheduler: &mut self.scheduler,
        };
        self.map.add_animated_text(text, position, &mut ctx);
    }

    pub fn remove_thing(&mut self, id: ThingId) -> Option<Thing> {
        let mut ctx = LifecycleContext {
            now: self.clock.now(),
            catalog: &self.catalog,
            settings: &self.settings,
            scheduler: &mut self.scheduler,
        };
        self.map.remove_thing(id, &mut ctx)
    }

    /// Steps the creature with server id `creature_id`; the camera follows
    /// the local player.
    pub fn move_creature(&mut self, creature_id: CreatureId, to: Position) -> bool {
        let Some(creature) = self.map.creature_by_id(creature_id) else {
            return false;
        };
        let id = creature.id();
        let follow = creature.is_local_player();
        let mut ctx = LifecycleContext {
            now: self.clock.now(),
            catalog: &self.catalog,
            settings: &self.settings,
            scheduler: &mut self.scheduler,
        };
        let moved = self.map.move_creature(id, to, &mut ctx);
        if moved && follow {
            self.map.set_central_position(to);
        }
        moved
    }

    /// Drops the whole world and every pending event.
    pub fn clean(&mut self) {
        let mut ctx = LifecycleContext {
            now: self.clock.now(),
            catalog: &self.catalog,
            settings: &self.settings,
            scheduler: &mut self.scheduler,
        };
        self.map.clean(&mut ctx);
        self.light_view.clear();
    }

    /// Moves the clock forward and runs what became due.
    pub fn advance(&mut self, millis: u64) -> usize {
        self.clock.advance(millis);
        self.poll()
    }

    /// Runs every event due at the current time, including ones scheduled
    /// for "now" by the events themselves. Returns how many fired.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        loop {
            let events = self.scheduler.drain_ready(now);
            if events.is_empty() {
                break;
            }
            for event in events {
                fired += 1;
                let mut ctx = LifecycleContext {
                    now,
                    catalog: &self.catalog,
                    settings: &self.settings,
                    scheduler: &mut self.scheduler,
                };
                self.map.handle_event(event, &mut ctx);
            }
        }
        if fired > 0 {
            log::trace!(target: "scheduler", "{} events fired at {}", fired, now);
        }
        fired
    }

    /// Highest floor (smallest z) that still shows. Above ground everything
    /// up to floor 0 is visible until a tile over the camera closes the view.
    pub fn first_visible_floor(&self) -> u8 {
        let camera = self.camera();
        if !camera.is_valid() {
            return 0;
        }
        let mut first = if camera.z > SEA_FLOOR {
            camera
                .z
                .saturating_sub(AWARE_UNDERGROUND_FLOOR_RANGE)
                .max(SEA_FLOOR + 1)
        } else {
            0
        };

        for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
            let position = camera.translated(dx, dy, 0);
            let mut upper = position;
            let mut covered = position;
            while upper.up(1) && covered.covered_up(1) && upper.z >= first {
                if self.limits_view(upper) || self.limits_view(covered) {
                    first = upper.z + 1;
                    break;
                }
            }
        }
        first
    }

    pub fn last_visible_floor(&self) -> u8 {
        let camera = self.camera();
        if camera.z > SEA_FLOOR {
            camera
                .z
                .saturating_add(AWARE_UNDERGROUND_FLOOR_RANGE)
                .min(MAX_FLOOR)
        } else {
            SEA_FLOOR
        }
    }

    fn limits_view(&self, position: Position) -> bool {
        self.map
            .get_tile(position)
            .is_some_and(|tile| tile.has_ground(&self.catalog))
    }

    /// Issues one frame: floors bottom-up in diagonal order with the missiles
    /// of each floor, then floating texts and creature names, then the light
    /// map on top.
    pub fn draw(&mut self, pool: &mut dyn DrawPool) {
        let camera = self.camera();
        if !camera.is_valid() {
            return;
        }
        let now = self.clock.now();
        let viewport = self.viewport();
        let tile_pixels = self.settings.tile_pixels;
        let width = u32::from(viewport.size.width);
        let height = u32::from(viewport.size.height);

        self.light_view.set_enabled(self.settings.light_enabled);
        self.light_view.resize(width, height, tile_pixels);
        self.light_view.clear();

        let first_floor = self.first_visible_floor();
        let last_floor = self.last_visible_floor();
        let order = viewport.diagonal_order();
        let catalog: &ThingTypeCatalog = &self.catalog;

        {
            let probe = self.map.neighbors(catalog);
            let mut ctx = DrawContext {
                now,
                catalog,
                settings: &self.settings,
                central_position: camera,
                neighbors: Some(&probe),
                pool: &mut *pool,
            };
            for z in (first_floor..=last_floor).rev() {
                for &(view_x, view_y) in &order {
                    let position = viewport.to_world(view_x, view_y, z);
                    let Some(tile) = self.map.get_tile(position) else {
                        continue;
                    };
                    if z < last_floor && tile.is_fully_opaque(catalog) {
                        self.light_view.reset_shade(view_x, view_y);
                    }
                    tile.draw(&mut ctx, (view_x, view_y), &mut self.light_view);
                }

                for missile in self.map.missiles() {
                    let Some(position) = missile.position().filter(|position| position.z == z)
                    else {
                        continue;
                    };
                    if let Some((view_x, view_y)) = viewport.to_view(position) {
                        missile.draw(&mut ctx, TileDest::new(view_x, view_y, z));
                    }
                }
            }
        }

        let tile = tile_pixels as i32;
        let visible = Rect::new(0, 0, width as i32 * tile, height as i32 * tile);
        for text in self.map.animated_texts() {
            let Some(position) = text.position().filter(|position| position.z == camera.z) else {
                continue;
            };
            if let Some((view_x, view_y)) = viewport.to_view(position) {
                text.draw_text(
                    pool,
                    &mut self.metrics,
                    (view_x * tile, view_y * tile),
                    visible,
                    &self.settings,
                    now,
                );
            }
        }

        if self.settings.draw_creature_info {
            for creature in self.map.creatures() {
                let Some(position) = creature
                    .position()
                    .filter(|position| position.z == camera.z)
                else {
                    continue;
                };
                if let Some((view_x, view_y)) = viewport.to_view(position) {
                    creature.draw_information(
                        pool,
                        &mut self.metrics,
                        (view_x * tile, view_y * tile),
                        &self.settings,
                    );
                }
            }
        }

        if self.light_view.is_enabled() && self.light_view.is_dark() {
            self.light_view.update_pixels();
            self.light_view.draw(pool, visible);
        }
    }
}

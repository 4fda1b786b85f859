use crate::entities::effect::Effect;
use crate::entities::thing::{
    DrawContext, LifecycleContext, StackPriority, Thing, ThingBehavior, ThingId,
};
use crate::render::draw_pool::{DrawOrder, TileDest};
use crate::render::light_view::LightView;
use crate::world::position::Position;
use crate::world::thing_types::{ThingTypeCatalog, DEFAULT_GROUND_SPEED};

/// Client version from which newly added creatures go on top of the
/// creatures already standing on the tile.
const CREATURE_APPEND_VERSION: u16 = 854;

/// One map cell: an ordered stack of things plus the effects playing on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    position: Position,
    things: Vec<Thing>,
    effects: Vec<Effect>,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            things: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn things(&self) -> &[Thing] {
        &self.things
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn thing_count(&self) -> usize {
        self.things.len() + self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty() && self.effects.is_empty()
    }

    /// Places `thing` by stack priority and returns whatever no longer fits:
    /// the thing pushed past the tile limit, or a missile, which never
    /// lives on a tile.
    pub fn add_thing(&mut self, thing: Thing, ctx: &mut LifecycleContext<'_>) -> Option<Thing> {
        let mut thing = match thing {
            Thing::Effect(effect) => {
                self.add_effect(effect, ctx);
                return None;
            }
            Thing::Missile(_) => return Some(thing),
            other => other,
        };

        let catalog = ctx.catalog;
        let priority = thing.stack_priority(catalog);
        let mut append = priority <= StackPriority::OnTop;
        if ctx.settings.client_version >= CREATURE_APPEND_VERSION
            && priority == StackPriority::Creature
        {
            append = !append;
        }
        let index = self
            .things
            .iter()
            .position(|other| {
                let other_priority = other.stack_priority(catalog);
                if append {
                    other_priority > priority
                } else {
                    other_priority >= priority
                }
            })
            .unwrap_or(self.things.len());

        thing.set_position(self.position, catalog);
        self.things.insert(index, thing);

        let mut evicted = None;
        let max_things = ctx.settings.tile_max_things.max(1);
        if self.things.len() > max_things {
            let mut removed = self.things.remove(max_things);
            removed.clear_position();
            log::debug!(
                target: "game",
                "tile {:?} full, dropped {:?}",
                self.position,
                removed.id()
            );
            evicted = Some(removed);
        }
        self.update_stack_positions();
        evicted
    }

    /// Effects of the same kind queue up behind the one already playing.
    pub fn add_effect(&mut self, mut effect: Effect, ctx: &mut LifecycleContext<'_>) {
        for previous in &self.effects {
            if previous.client_id() == effect.client_id() {
                effect.wait_for(previous, ctx.catalog, ctx.settings, ctx.now);
            }
        }
        effect.set_position(self.position, ctx.catalog);
        effect.on_appear(ctx);

        let on_top = effect
            .thing_type(ctx.catalog)
            .map(|thing_type| thing_type.is_top_effect())
            .unwrap_or(false);
        if on_top {
            self.effects.push(effect);
        } else {
            self.effects.insert(0, effect);
        }
    }

    /// Takes a thing or effect off the tile; its stored position is cleared.
    pub fn remove_thing(&mut self, id: ThingId) -> Option<Thing> {
        if let Some(index) = self.things.iter().position(|thing| thing.id() == id) {
            let mut thing = self.things.remove(index);
            thing.clear_position();
            self.update_stack_positions();
            return Some(thing);
        }
        let index = self.effects.iter().position(|effect| effect.id() == id)?;
        let mut effect = self.effects.remove(index);
        effect.base_mut().clear();
        Some(Thing::Effect(effect))
    }

    fn update_stack_positions(&mut self) {
        for (index, thing) in self.things.iter_mut().enumerate() {
            thing.set_stack_pos(Some(index));
        }
    }

    pub fn contains(&self, id: ThingId) -> bool {
        self.things.iter().any(|thing| thing.id() == id)
            || self.effects.iter().any(|effect| effect.id() == id)
    }

    pub fn thing(&self, id: ThingId) -> Option<&Thing> {
        self.things.iter().find(|thing| thing.id() == id)
    }

    pub fn thing_mut(&mut self, id: ThingId) -> Option<&mut Thing> {
        self.things.iter_mut().find(|thing| thing.id() == id)
    }

    pub fn ground(&self, catalog: &ThingTypeCatalog) -> Option<&Thing> {
        self.things.first().filter(|thing| thing.is_ground(catalog))
    }

    pub fn ground_id(&self, catalog: &ThingTypeCatalog) -> Option<u16> {
        self.ground(catalog).map(|ground| ground.client_id())
    }

    pub fn has_ground(&self, catalog: &ThingTypeCatalog) -> bool {
        self.ground(catalog).is_some()
    }

    pub fn ground_speed(&self, catalog: &ThingTypeCatalog) -> u16 {
        self.ground(catalog)
            .and_then(|ground| ground.thing_type(catalog))
            .map(|thing_type| thing_type.ground_speed)
            .filter(|speed| *speed > 0)
            .unwrap_or(DEFAULT_GROUND_SPEED)
    }

    pub fn has_creatures(&self) -> bool {
        self.things.iter().any(Thing::is_creature)
    }

    pub fn creatures(&self) -> impl Iterator<Item = &Thing> {
        self.things.iter().filter(|thing| thing.is_creature())
    }

    pub fn contains_item(&self, client_id: u16) -> bool {
        self.things
            .iter()
            .any(|thing| thing.is_item() && thing.client_id() == client_id)
    }

    /// Blocks the view of the floors underneath.
    pub fn is_fully_opaque(&self, catalog: &ThingTypeCatalog) -> bool {
        self.things.iter().any(|thing| thing.is_full_ground(catalog))
    }

    pub fn has_light(&self, catalog: &ThingTypeCatalog) -> bool {
        self.things.iter().any(|thing| thing.light(catalog).is_some())
    }

    pub fn has_top_item(&self, catalog: &ThingTypeCatalog) -> bool {
        self.things.iter().any(|thing| thing.is_on_top(catalog))
    }

    pub fn has_common_item(&self, catalog: &ThingTypeCatalog) -> bool {
        self.things.iter().any(|thing| thing.is_common(catalog))
    }

    /// Issues the tile at screen tile `view`: ground, borders and bottom items
    /// raise the elevation for the common items and creatures above them;
    /// effects and top items draw flat.
    pub fn draw(&self, ctx: &mut DrawContext<'_>, view: (i32, i32), light_view: &mut LightView) {
        let catalog = ctx.catalog;
        let mut elevation = 0;

        for thing in &self.things {
            if !thing.is_ground(catalog)
                && !thing.is_ground_border(catalog)
                && !thing.is_on_bottom(catalog)
            {
                break;
            }
            self.draw_thing(thing, ctx, view, &mut elevation, light_view);
        }

        for thing in self.things.iter().rev().filter(|thing| thing.is_common(catalog)) {
            self.draw_thing(thing, ctx, view, &mut elevation, light_view);
        }

        for thing in self.things.iter().filter(|thing| thing.is_creature()) {
            self.draw_thing(thing, ctx, view, &mut elevation, light_view);
        }

        let flat = TileDest::new(view.0, view.1, self.position.z);
        for effect in &self.effects {
            ctx.pool.set_draw_order(DrawOrder::Fourth);
            effect.draw(ctx, flat);
            ctx.pool.reset_draw_order();
        }

        let mut top_elevation = 0;
        for thing in self.things.iter().filter(|thing| thing.is_on_top(catalog)) {
            self.draw_thing(thing, ctx, view, &mut top_elevation, light_view);
        }
    }

    fn draw_thing(
        &self,
        thing: &Thing,
        ctx: &mut DrawContext<'_>,
        view: (i32, i32),
        elevation: &mut u16,
        light_view: &mut LightView,
    ) {
        let catalog = ctx.catalog;
        let dest = TileDest::new(view.0, view.1, self.position.z)
            .with_elevation(i32::from(*elevation));

        let order = if thing.is_single_ground(catalog) {
            DrawOrder::First
        } else if thing.is_ground_border(catalog) {
            DrawOrder::Second
        } else {
            DrawOrder::Third
        };
        ctx.pool.set_draw_order(order);
        thing.draw(ctx, dest);
        ctx.pool.reset_draw_order();

        if let Some(light) = thing.light(catalog) {
            let tile = ctx.settings.tile_pixels as i32;
            let (offset_x, offset_y) = thing
                .as_creature()
                .map(|creature| creature.walk_offset())
                .unwrap_or((0, 0));
            let x = view.0 * tile + tile / 2 - i32::from(*elevation) + offset_x;
            let y = view.1 * tile + tile / 2 - i32::from(*elevation) + offset_y;
            light_view.add_light_source(x, y, light, 1.0);
        }

        if thing.has_elevation(catalog) {
            *elevation =
                (*elevation + thing.elevation(catalog)).min(ctx.settings.tile_max_elevation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderSettings;
    use crate::entities::creature::{Creature, CreatureId, CreatureKind};
    use crate::entities::item::Item;
    use crate::entities::missile::Missile;
    use crate::render::draw_pool::{DrawCommand, RecordingDrawPool};
    use crate::world::scheduler::Scheduler;
    use crate::world::thing_types::{Light, ThingCategory, ThingFlags, ThingType};

    const GROUND: u16 = 100;
    const BORDER: u16 = 101;
    const BOTTOM: u16 = 102;
    const TOP: u16 = 103;
    const COMMON: u16 = 104;
    const TORCH: u16 = 105;

    fn catalog() -> ThingTypeCatalog {
        let mut catalog = ThingTypeCatalog::new();
        let items = [
            ThingType::new(ThingCategory::Item, GROUND)
                .with_flags(ThingFlags::GROUND)
                .with_ground_speed(120),
            ThingType::new(ThingCategory::Item, BORDER).with_flags(ThingFlags::GROUND_BORDER),
            ThingType::new(ThingCategory::Item, BOTTOM)
                .with_flags(ThingFlags::ON_BOTTOM)
                .with_elevation(20),
            ThingType::new(ThingCategory::Item, TOP).with_flags(ThingFlags::ON_TOP),
            ThingType::new(ThingCategory::Item, COMMON).with_elevation(10),
            ThingType::new(ThingCategory::Item, TORCH).with_light(Light::new(4, 206)),
        ];
        for thing_type in items {
            catalog.insert(thing_type).expect("insert");
        }
        catalog
            .insert(ThingType::new(ThingCategory::Effect, 5).with_phases(6))
            .expect("insert");
        catalog
            .insert(
                ThingType::new(ThingCategory::Effect, 6)
                    .with_phases(2)
                    .with_flags(ThingFlags::TOP_EFFECT),
            )
            .expect("insert");
        catalog
            .insert(ThingType::new(ThingCategory::Creature, 1).with_patterns(4, 1, 1))
            .expect("insert");
        catalog
            .insert(ThingType::new(ThingCategory::Missile, 1))
            .expect("insert");
        catalog
    }

    fn item(id: u32, client_id: u16, catalog: &ThingTypeCatalog) -> Thing {
        Thing::Item(Item::new(ThingId(id), client_id, catalog))
    }

    fn creature(id: u32) -> Thing {
        Thing::Creature(
            Creature::new(ThingId(id), CreatureId(id), "Rat", CreatureKind::Monster)
                .with_look_type(1),
        )
    }

    fn ids(tile: &Tile) -> Vec<u32> {
        tile.things().iter().map(|thing| thing.id().0).collect()
    }

    #[test]
    fn stack_follows_priority_with_insertion_ties() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        let mut tile = Tile::new(Position::new(100, 100, 7));
        tile.add_thing(item(1, GROUND, &catalog), &mut ctx);
        tile.add_thing(item(2, COMMON, &catalog), &mut ctx);
        tile.add_thing(item(3, COMMON, &catalog), &mut ctx);
        tile.add_thing(item(4, TOP, &catalog), &mut ctx);
        tile.add_thing(creature(5), &mut ctx);
        tile.add_thing(creature(6), &mut ctx);
        tile.add_thing(item(7, BORDER, &catalog), &mut ctx);

        assert_eq!(ids(&tile), vec![1, 7, 4, 5, 6, 3, 2]);
        for (index, thing) in tile.things().iter().enumerate() {
            assert_eq!(thing.stack_pos(), Some(index));
            assert_eq!(thing.position(), Some(tile.position()));
        }
    }

    #[test]
    fn old_clients_put_new_creatures_below() {
        let catalog = catalog();
        let settings = RenderSettings {
            client_version: 800,
            ..RenderSettings::default()
        };
        let mut scheduler = Scheduler::new();
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        let mut tile = Tile::new(Position::new(100, 100, 7));
        tile.add_thing(creature(1), &mut ctx);
        tile.add_thing(creature(2), &mut ctx);
        assert_eq!(ids(&tile), vec![2, 1]);
    }

    #[test]
    fn overflow_evicts_past_the_limit() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        let mut tile = Tile::new(Position::new(100, 100, 7));
        for id in 1..=10 {
            assert!(tile.add_thing(item(id, COMMON, &catalog), &mut ctx).is_none());
        }
        let evicted = tile.add_thing(item(11, COMMON, &catalog), &mut ctx).expect("evicted");
        assert_eq!(evicted.id(), ThingId(1));
        assert_eq!(evicted.position(), None);
        assert_eq!(tile.things().len(), 10);
        assert_eq!(tile.things()[0].id(), ThingId(11));
    }

    #[test]
    fn missiles_are_handed_back() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        let mut tile = Tile::new(Position::new(100, 100, 7));
        let missile = Thing::Missile(Missile::new(ThingId(1), 1, &catalog));
        assert!(tile.add_thing(missile, &mut ctx).is_some());
        assert!(tile.is_empty());
    }

    #[test]
    fn effects_queue_and_order_by_top_flag() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut tile = Tile::new(Position::new(100, 100, 7));
        {
            let mut ctx = LifecycleContext {
                now: 0,
                catalog: &catalog,
                settings: &settings,
                scheduler: &mut scheduler,
            };
            tile.add_effect(Effect::new(ThingId(1), 5, &catalog), &mut ctx);
            tile.add_effect(Effect::new(ThingId(2), 6, &catalog), &mut ctx);
        }
        let mut ctx = LifecycleContext {
            now: 50,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        tile.add_effect(Effect::new(ThingId(3), 5, &catalog), &mut ctx);

        let order: Vec<u32> = tile.effects().iter().map(|effect| effect.id().0).collect();
        assert_eq!(order, vec![3, 1, 2]);
        // 6 phases * 100ms = 600ms; a third of it minus the 50ms already played.
        assert_eq!(tile.effects()[0].time_to_start_drawing(), 150);
        assert_eq!(tile.effects()[0].position(), Some(Position::new(100, 100, 7)));
    }

    #[test]
    fn removal_clears_position_and_reindexes() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        let mut tile = Tile::new(Position::new(100, 100, 7));
        tile.add_thing(item(1, GROUND, &catalog), &mut ctx);
        tile.add_thing(item(2, BOTTOM, &catalog), &mut ctx);
        tile.add_thing(item(3, COMMON, &catalog), &mut ctx);
        let removed = tile.remove_thing(ThingId(2)).expect("removed");
        assert_eq!(removed.position(), None);
        assert_eq!(tile.things()[1].stack_pos(), Some(1));
        assert!(tile.remove_thing(ThingId(2)).is_none());
        assert_eq!(tile.ground_speed(&catalog), 120);
    }

    #[test]
    fn draw_accumulates_elevation_and_registers_light() {
        let catalog = catalog();
        let settings = RenderSettings::default();
        let mut scheduler = Scheduler::new();
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            scheduler: &mut scheduler,
        };
        let mut tile = Tile::new(Position::new(100, 100, 7));
        tile.add_thing(item(1, GROUND, &catalog), &mut ctx);
        tile.add_thing(item(2, BOTTOM, &catalog), &mut ctx);
        tile.add_thing(item(3, COMMON, &catalog), &mut ctx);
        tile.add_thing(item(4, TORCH, &catalog), &mut ctx);
        tile.add_thing(item(5, TOP, &catalog), &mut ctx);

        let mut light_view = LightView::new();
        light_view.resize(18, 14, 32);
        light_view.set_global_light(Light::new(40, 215));

        let mut pool = RecordingDrawPool::new();
        let mut draw = DrawContext {
            now: 0,
            catalog: &catalog,
            settings: &settings,
            central_position: tile.position(),
            neighbors: None,
            pool: &mut pool,
        };
        tile.draw(&mut draw, (2, 3), &mut light_view);

        let sprites: Vec<_> = pool.sprites().collect();
        let drawn: Vec<u16> = sprites.iter().map(|sprite| sprite.client_id).collect();
        // Older common items first, so the newest ends up on top.
        assert_eq!(drawn, vec![GROUND, BOTTOM, COMMON, TORCH, TOP]);
        let elevations: Vec<i32> = sprites.iter().map(|sprite| sprite.dest.elevation_px).collect();
        assert_eq!(elevations, vec![0, 0, 20, 30, 0]);
        assert_eq!(pool.commands[0], DrawCommand::DrawOrder(DrawOrder::First));

        let sources = light_view.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!((sources[0].x, sources[0].y), (2 * 32 + 16 - 30, 3 * 32 + 16 - 30));
    }
}

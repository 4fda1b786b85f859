use std::collections::HashMap;

use crate::entities::animated_text::AnimatedText;
use crate::entities::creature::{Creature, CreatureId};
use crate::entities::missile::Missile;
use crate::entities::thing::{LifecycleContext, NeighborProbe, Thing, ThingBehavior, ThingId};
use crate::world::position::Position;
use crate::world::scheduler::ScheduledEvent;
use crate::world::thing_types::{ThingTypeCatalog, DEFAULT_GROUND_SPEED};
use crate::world::tile::Tile;

/// Client-side copy of the known world: tiles keyed by position, missiles in
/// flight and floating texts. Things are found again through their
/// `ThingId` when scheduled events fire.
#[derive(Debug, Default)]
pub struct ClientMap {
    tiles: HashMap<Position, Tile>,
    missiles: Vec<Missile>,
    animated_texts: Vec<AnimatedText>,
    central_position: Position,
    next_id: u32,
    index: HashMap<ThingId, Position>,
}

impl ClientMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh runtime id for a thing about to be placed.
    pub fn allocate_id(&mut self) -> ThingId {
        self.next_id = self.next_id.wrapping_add(1);
        ThingId(self.next_id)
    }

    pub fn central_position(&self) -> Position {
        self.central_position
    }

    pub fn set_central_position(&mut self, position: Position) {
        self.central_position = position;
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn get_tile(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn get_tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(&position)
    }

    pub fn get_or_create_tile(&mut self, position: Position) -> &mut Tile {
        self.tiles
            .entry(position)
            .or_insert_with(|| Tile::new(position))
    }

    pub fn missiles(&self) -> &[Missile] {
        &self.missiles
    }

    pub fn animated_texts(&self) -> &[AnimatedText] {
        &self.animated_texts
    }

    pub fn ground_speed_at(&self, position: Position, catalog: &ThingTypeCatalog) -> u16 {
        self.tiles
            .get(&position)
            .map(|tile| tile.ground_speed(catalog))
            .unwrap_or(DEFAULT_GROUND_SPEED)
    }

    pub fn position_of(&self, id: ThingId) -> Option<Position> {
        self.index.get(&id).copied()
    }

    pub fn thing(&self, id: ThingId) -> Option<&Thing> {
        let position = self.index.get(&id)?;
        self.tiles.get(position)?.thing(id)
    }

    pub fn creature(&self, id: ThingId) -> Option<&Creature> {
        self.thing(id)?.as_creature()
    }

    fn creature_mut(&mut self, id: ThingId) -> Option<&mut Creature> {
        let position = self.index.get(&id)?;
        self.tiles.get_mut(position)?.thing_mut(id)?.as_creature_mut()
    }

    /// Looks a creature up by its server id.
    pub fn creature_by_id(&self, creature_id: CreatureId) -> Option<&Creature> {
        self.tiles
            .values()
            .flat_map(|tile| tile.creatures())
            .filter_map(Thing::as_creature)
            .find(|creature| creature.creature_id() == creature_id)
    }

    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.tiles
            .values()
            .flat_map(|tile| tile.creatures())
            .filter_map(Thing::as_creature)
    }

    /// Places `thing` at `position`. Missiles fly from there to their own
    /// target through `add_missile` instead; one handed in here is dropped.
    pub fn add_thing(&mut self, thing: Thing, position: Position, ctx: &mut LifecycleContext<'_>) {
        if !position.is_valid() {
            log::warn!(target: "game", "refusing to place {:?} at invalid position", thing.id());
            return;
        }
        let id = thing.id();
        let is_creature = thing.is_creature();
        let tile = self.get_or_create_tile(position);
        let rejected = tile.add_thing(thing, ctx);
        let placed = tile.contains(id);
        if placed {
            self.index.insert(id, position);
        }
        if let Some(rejected) = rejected {
            self.index.remove(&rejected.id());
            log::debug!(target: "game", "{:?} did not fit on {:?}", rejected.id(), position);
        }

        if is_creature && placed {
            let ground_speed = self.ground_speed_at(position, ctx.catalog);
            if let Some(creature) = self.creature_mut(id) {
                creature.on_appear(None, ground_speed, ctx);
            }
        }
    }

    pub fn add_missile(
        &mut self,
        mut missile: Missile,
        from: Position,
        to: Position,
        ctx: &mut LifecycleContext<'_>,
    ) {
        if !from.is_valid() || !to.is_valid() {
            return;
        }
        missile.set_path(from, to, ctx);
        self.missiles.push(missile);
    }

    /// Numbers landing on the same tile while a previous one is still fresh
    /// add up instead of stacking.
    pub fn add_animated_text(
        &mut self,
        mut text: AnimatedText,
        position: Position,
        ctx: &mut LifecycleContext<'_>,
    ) {
        if !position.is_valid() {
            return;
        }
        text.set_position(position);
        for existing in self
            .animated_texts
            .iter_mut()
            .filter(|existing| existing.position() == Some(position))
        {
            if existing.merge(&text, ctx.settings, ctx.now) {
                return;
            }
        }
        text.on_appear(ctx);
        self.animated_texts.push(text);
    }

    /// Moves a creature one step and lets it animate the walk when the move
    /// is adjacent.
    pub fn move_creature(
        &mut self,
        id: ThingId,
        to: Position,
        ctx: &mut LifecycleContext<'_>,
    ) -> bool {
        let Some(from) = self.index.get(&id).copied() else {
            return false;
        };
        if from == to || !to.is_valid() {
            return false;
        }
        let Some(Thing::Creature(mut creature)) = self
            .tiles
            .get_mut(&from)
            .and_then(|tile| tile.remove_thing(id))
        else {
            return false;
        };
        self.index.remove(&id);
        creature.allow_appear_walk();

        let tile = self.get_or_create_tile(to);
        if let Some(rejected) = tile.add_thing(Thing::Creature(creature), ctx) {
            log::debug!(target: "game", "{:?} did not fit on {:?}", rejected.id(), to);
            if rejected.id() != id {
                self.index.remove(&rejected.id());
            }
        }
        if !self.tiles.get(&to).is_some_and(|tile| tile.contains(id)) {
            return false;
        }
        self.index.insert(id, to);

        let ground_speed = self.ground_speed_at(to, ctx.catalog);
        if let Some(creature) = self.creature_mut(id) {
            creature.on_appear(Some(from), ground_speed, ctx);
        }
        true
    }

    /// Takes a thing off the map, wherever it is.
    pub fn remove_thing(&mut self, id: ThingId, ctx: &mut LifecycleContext<'_>) -> Option<Thing> {
        if let Some(index) = self.missiles.iter().position(|missile| missile.id() == id) {
            return Some(Thing::Missile(self.missiles.remove(index)));
        }
        let position = self.index.remove(&id)?;
        let tile = self.tiles.get_mut(&position)?;
        let mut thing = tile.remove_thing(id)?;
        if tile.is_empty() {
            self.tiles.remove(&position);
        }
        if let Some(creature) = thing.as_creature_mut() {
            creature.on_disappear();
            creature.stop_walk(ctx.scheduler);
        }
        Some(thing)
    }

    pub fn remove_animated_text(&mut self, id: ThingId) -> Option<AnimatedText> {
        let index = self.animated_texts.iter().position(|text| text.id() == id)?;
        Some(self.animated_texts.remove(index))
    }

    /// Runs a fired event. Events whose target is already gone do nothing.
    pub fn handle_event(&mut self, event: ScheduledEvent, ctx: &mut LifecycleContext<'_>) {
        match event {
            ScheduledEvent::RemoveThing(id) => {
                self.remove_thing(id, ctx);
            }
            ScheduledEvent::RemoveAnimatedText(id) => {
                self.remove_animated_text(id);
            }
            ScheduledEvent::WalkUpdate(id) => {
                if let Some(creature) = self.creature_mut(id) {
                    creature.next_walk_update(ctx);
                }
            }
            ScheduledEvent::FinishWalkAnimation(id) => {
                if let Some(creature) = self.creature_mut(id) {
                    creature.finish_walk_animation(ctx.now, ctx.settings);
                }
            }
        }
    }

    /// Drops everything; pending events are discarded with it.
    pub fn clean(&mut self, ctx: &mut LifecycleContext<'_>) {
        let removed = self.tiles.len();
        self.tiles.clear();
        self.missiles.clear();
        self.animated_texts.clear();
        self.index.clear();
        ctx.scheduler.clear();
        log::info!(target: "game", "map cleaned, {} tiles dropped", removed);
    }

    /// Map view for sprite selection that needs to look at neighbouring tiles.
    pub fn neighbors<'a>(&'a self, catalog: &'a ThingTypeCatalog) -> MapNeighbors<'a> {
        MapNeighbors { map: self, catalog }
    }
}

pub struct MapNeighbors<'a> {
    map: &'a ClientMap,
    catalog: &'a ThingTypeCatalog,
}

impl NeighborProbe for MapNeighbors<'_> {
    fn has_item(&self, position: Position, client_id: u16) -> bool {
        self.map
            .get_tile(position)
            .is_some_and(|tile| tile.contains_item(client_id))
    }

    fn ground_id(&self, position: Position) -> Option<u16> {
        self.map
            .get_tile(position)
            .and_then(|tile| tile.ground_id(self.catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderSettings;
    use crate::entities::creature::CreatureKind;
    use crate::entities::item::Item;
    use crate::world::scheduler::Scheduler;
    use crate::world::thing_types::{ThingCategory, ThingFlags, ThingType};

    const GRASS: u16 = 102;
    const WATER: u16 = 103;
    const ARROW: u16 = 5;

    fn catalog() -> ThingTypeCatalog {
        let mut catalog = ThingTypeCatalog::new();
        catalog
            .insert(
                ThingType::new(ThingCategory::Item, GRASS)
                    .with_flags(ThingFlags::GROUND)
                    .with_ground_speed(100),
            )
            .expect("insert");
        catalog
            .insert(ThingType::new(ThingCategory::Item, WATER).with_flags(ThingFlags::GROUND))
            .expect("insert");
        catalog
            .insert(
                ThingType::new(ThingCategory::Creature, 128)
                    .with_patterns(4, 1, 1)
                    .with_phases(3),
            )
            .expect("insert");
        catalog
            .insert(ThingType::new(ThingCategory::Missile, ARROW).with_patterns(3, 3, 1))
            .expect("insert");
        catalog
    }

    struct Fixture {
        catalog: ThingTypeCatalog,
        settings: RenderSettings,
        scheduler: Scheduler,
        map: ClientMap,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: catalog(),
                settings: RenderSettings::default(),
                scheduler: Scheduler::new(),
                map: ClientMap::new(),
            }
        }

        fn ground(&mut self, position: Position) {
            self.ground_of(GRASS, position);
        }

        fn ground_of(&mut self, client_id: u16, position: Position) {
            let id = self.map.allocate_id();
            let ground = Item::new(id, client_id, &self.catalog);
            let mut ctx = LifecycleContext {
                now: 0,
                catalog: &self.catalog,
                settings: &self.settings,
                scheduler: &mut self.scheduler,
            };
            self.map.add_thing(Thing::Item(ground), position, &mut ctx);
        }

        fn creature(&mut self, position: Position) -> ThingId {
            let id = self.map.allocate_id();
            let creature = Creature::new(id, CreatureId(0x4000_0001), "Rat", CreatureKind::Monster)
                .with_look_type(128)
                .with_speed(220);
            let mut ctx = LifecycleContext {
                now: 0,
                catalog: &self.catalog,
                settings: &self.settings,
                scheduler: &mut self.scheduler,
            };
            self.map.add_thing(Thing::Creature(creature), position, &mut ctx);
            id
        }

        fn run_until(&mut self, until: u64) {
            let mut now = 0;
            while let Some(fire_at) = self.scheduler.next_fire_time() {
                if fire_at > until {
                    break;
                }
                now = now.max(fire_at);
                for event in self.scheduler.drain_ready(now) {
                    let mut ctx = LifecycleContext {
                        now,
                        catalog: &self.catalog,
                        settings: &self.settings,
                        scheduler: &mut self.scheduler,
                    };
                    self.map.handle_event(event, &mut ctx);
                }
            }
        }
    }

    #[test]
    fn allocated_ids_are_unique() {
        let mut map = ClientMap::new();
        let first = map.allocate_id();
        let second = map.allocate_id();
        assert_ne!(first, second);
    }

    #[test]
    fn ground_speed_falls_back_without_tile() {
        let mut fixture = Fixture::new();
        let here = Position::new(100, 100, 7);
        fixture.ground(here);
        assert_eq!(fixture.map.ground_speed_at(here, &fixture.catalog), 100);
        assert_eq!(
            fixture.map.ground_speed_at(Position::new(1, 1, 7), &fixture.catalog),
            DEFAULT_GROUND_SPEED
        );
    }

    #[test]
    fn creature_walks_to_adjacent_tile() {
        let mut fixture = Fixture::new();
        let from = Position::new(100, 100, 7);
        let to = Position::new(101, 100, 7);
        fixture.ground(from);
        fixture.ground(to);
        let id = fixture.creature(from);

        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &fixture.catalog,
            settings: &fixture.settings,
            scheduler: &mut fixture.scheduler,
        };
        assert!(fixture.map.move_creature(id, to, &mut ctx));
        assert_eq!(fixture.map.position_of(id), Some(to));
        assert!(fixture.map.get_tile(from).is_some_and(|tile| !tile.has_creatures()));

        let creature = fixture.map.creature(id).expect("creature");
        assert!(creature.is_walking());
        assert_eq!(creature.walk_offset(), (-32, 0));

        fixture.run_until(2_000);
        let creature = fixture.map.creature(id).expect("creature");
        assert!(!creature.is_walking());
        assert_eq!(creature.walk_offset(), (0, 0));
        assert_eq!(creature.walk_animation_phase(), 0);
        assert!(fixture.scheduler.is_empty());
    }

    #[test]
    fn distant_move_snaps() {
        let mut fixture = Fixture::new();
        let from = Position::new(100, 100, 7);
        let id = fixture.creature(from);
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &fixture.catalog,
            settings: &fixture.settings,
            scheduler: &mut fixture.scheduler,
        };
        assert!(fixture.map.move_creature(id, Position::new(110, 100, 7), &mut ctx));
        assert!(!fixture.map.creature(id).expect("creature").is_walking());
    }

    #[test]
    fn creature_lookup_by_server_id() {
        let mut fixture = Fixture::new();
        fixture.creature(Position::new(100, 100, 7));
        assert!(fixture.map.creature_by_id(CreatureId(0x4000_0001)).is_some());
        assert!(fixture.map.creature_by_id(CreatureId(9)).is_none());
    }

    #[test]
    fn missile_is_removed_after_flight() {
        let mut fixture = Fixture::new();
        let id = fixture.map.allocate_id();
        let missile = Missile::new(id, ARROW, &fixture.catalog);
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &fixture.catalog,
            settings: &fixture.settings,
            scheduler: &mut fixture.scheduler,
        };
        fixture
            .map
            .add_missile(missile, Position::new(100, 100, 7), Position::new(104, 100, 7), &mut ctx);
        assert_eq!(fixture.map.missiles().len(), 1);
        fixture.run_until(199);
        assert_eq!(fixture.map.missiles().len(), 1);
        fixture.run_until(200);
        assert!(fixture.map.missiles().is_empty());
    }

    #[test]
    fn texts_on_same_tile_merge() {
        let mut fixture = Fixture::new();
        let here = Position::new(100, 100, 7);
        for value in ["10", "15"] {
            let id = fixture.map.allocate_id();
            let mut ctx = LifecycleContext {
                now: 100,
                catalog: &fixture.catalog,
                settings: &fixture.settings,
                scheduler: &mut fixture.scheduler,
            };
            fixture
                .map
                .add_animated_text(AnimatedText::new(id, value, 180), here, &mut ctx);
        }
        assert_eq!(fixture.map.animated_texts().len(), 1);
        assert_eq!(fixture.map.animated_texts()[0].text(), "25");
        fixture.run_until(1_100);
        assert!(fixture.map.animated_texts().is_empty());
    }

    #[test]
    fn stale_events_are_ignored() {
        let mut fixture = Fixture::new();
        let here = Position::new(100, 100, 7);
        let id = fixture.creature(here);
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &fixture.catalog,
            settings: &fixture.settings,
            scheduler: &mut fixture.scheduler,
        };
        assert!(fixture.map.remove_thing(id, &mut ctx).is_some());
        fixture.map.handle_event(ScheduledEvent::WalkUpdate(id), &mut ctx);
        fixture.map.handle_event(ScheduledEvent::RemoveThing(ThingId(999)), &mut ctx);
        assert!(fixture.map.get_tile(here).is_none());
    }

    #[test]
    fn neighbor_probe_sees_items_and_ground() {
        let mut fixture = Fixture::new();
        let here = Position::new(100, 100, 7);
        fixture.ground(here);
        let probe = fixture.map.neighbors(&fixture.catalog);
        assert!(probe.has_item(here, GRASS));
        assert!(probe.has_ground(here));
        assert!(!probe.has_ground(Position::new(101, 100, 7)));
    }

    #[test]
    fn neighbor_probe_compares_ground_identity() {
        let mut fixture = Fixture::new();
        let here = Position::new(100, 100, 7);
        let shore = Position::new(101, 100, 7);
        fixture.ground(here);
        fixture.ground_of(WATER, shore);
        let probe = fixture.map.neighbors(&fixture.catalog);
        assert_eq!(probe.ground_id(here), Some(GRASS));
        assert_eq!(probe.ground_id(shore), Some(WATER));
        assert!(probe.shares_ground(here, GRASS));
        assert!(!probe.shares_ground(shore, GRASS));
        assert!(!probe.shares_ground(Position::new(99, 100, 7), GRASS));
    }

    #[test]
    fn clean_drops_tiles_and_events() {
        let mut fixture = Fixture::new();
        fixture.ground(Position::new(100, 100, 7));
        let mut ctx = LifecycleContext {
            now: 0,
            catalog: &fixture.catalog,
            settings: &fixture.settings,
            scheduler: &mut fixture.scheduler,
        };
        fixture.map.clean(&mut ctx);
        assert_eq!(fixture.map.tile_count(), 0);
        assert!(fixture.scheduler.is_empty());
    }
}

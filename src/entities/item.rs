use crate::animation::pattern::{
    border_pattern, cycle_phase, fluid_pattern, neighbor_mask, position_pattern, stackable_pattern,
    PatternIndex,
};
use crate::entities::thing::{DrawContext, ThingBase, ThingBehavior, ThingId};
use crate::render::color::Rgb;
use crate::render::draw_pool::{SpriteDraw, TileDest};
use crate::world::position::Position;
use crate::world::thing_types::{ThingCategory, ThingType, ThingTypeCatalog};

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    base: ThingBase,
    client_id: u16,
    count_or_subtype: u16,
    pattern: PatternIndex,
}

impl Item {
    pub fn new(id: ThingId, client_id: u16, catalog: &ThingTypeCatalog) -> Self {
        let mut item = Self {
            base: ThingBase::new(id),
            client_id: 0,
            count_or_subtype: 1,
            pattern: PatternIndex::default(),
        };
        item.set_id(client_id, catalog);
        item
    }

    pub fn with_count(mut self, count_or_subtype: u16, catalog: &ThingTypeCatalog) -> Self {
        self.set_count_or_subtype(count_or_subtype, catalog);
        self
    }

    pub fn count_or_subtype(&self) -> u16 {
        self.count_or_subtype
    }

    pub fn set_count_or_subtype(&mut self, value: u16, catalog: &ThingTypeCatalog) {
        self.count_or_subtype = value;
        self.update_patterns(catalog);
    }

    pub fn set_position(&mut self, position: Position, catalog: &ThingTypeCatalog) {
        self.base.set_position(position);
        self.update_patterns(catalog);
    }

    /// Pattern chosen from the item's own state. Border stitching depends on
    /// the neighbours and is resolved while drawing.
    pub fn pattern(&self) -> PatternIndex {
        self.pattern
    }

    fn update_patterns(&mut self, catalog: &ThingTypeCatalog) {
        self.pattern = PatternIndex::default();
        let Some(thing_type) = self.drawable_type(catalog) else {
            return;
        };
        let (px, py, pz) = (thing_type.pattern_x, thing_type.pattern_y, thing_type.pattern_z);
        if thing_type.is_stackable() && px == 4 && py == 2 {
            self.pattern = stackable_pattern(u32::from(self.count_or_subtype));
            return;
        }
        if thing_type.is_splash() || thing_type.is_fluid_container() {
            self.pattern = fluid_pattern(u32::from(self.count_or_subtype), px, py);
            return;
        }
        if let Some(position) = self.base.position() {
            self.pattern = position_pattern(position, px, py, pz);
        }
    }

    fn uses_border_stitching(thing_type: &ThingType) -> bool {
        thing_type.pattern_x >= 4
            && thing_type.pattern_y >= 4
            && !thing_type.is_stackable()
            && !thing_type.is_splash()
            && !thing_type.is_fluid_container()
    }

    pub fn draw_pattern(&self, thing_type: &ThingType, ctx: &DrawContext<'_>) -> PatternIndex {
        if !Self::uses_border_stitching(thing_type) {
            return self.pattern;
        }
        let (Some(neighbors), Some(position)) = (ctx.neighbors, self.base.position()) else {
            return self.pattern;
        };
        let client_id = self.client_id;
        let own_ground = thing_type
            .is_ground_border()
            .then(|| neighbors.ground_id(position));
        let mask = neighbor_mask(position, |neighbor| match own_ground {
            Some(Some(ground_id)) => neighbors.shares_ground(neighbor, ground_id),
            Some(None) => false,
            None => neighbors.has_item(neighbor, client_id),
        });
        border_pattern(mask)
    }

    pub fn animation_phase(
        &self,
        thing_type: &ThingType,
        now: u64,
        cycle_ms: u64,
        animate: bool,
    ) -> u32 {
        let phases = thing_type.animation_phases;
        if phases <= 1 {
            return 0;
        }
        if !animate {
            return phases - 1;
        }
        if let Some(animator) = thing_type
            .animator
            .as_ref()
            .filter(|animator| animator.synchronized)
        {
            return animator.synchronous_phase_at(now).min(phases - 1);
        }
        cycle_phase(phases, now, cycle_ms)
    }
}

impl ThingBehavior for Item {
    fn base(&self) -> &ThingBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ThingBase {
        &mut self.base
    }

    fn category(&self) -> ThingCategory {
        ThingCategory::Item
    }

    fn client_id(&self) -> u16 {
        self.client_id
    }

    fn set_id(&mut self, id: u16, catalog: &ThingTypeCatalog) {
        self.client_id = if catalog.is_valid_dat_id(id, ThingCategory::Item) {
            id
        } else {
            0
        };
        self.update_patterns(catalog);
    }

    fn draw(&self, ctx: &mut DrawContext<'_>, dest: TileDest) {
        let Some(thing_type) = self.drawable_type(ctx.catalog) else {
            return;
        };
        let pattern = self.draw_pattern(thing_type, ctx);
        let phase = self.animation_phase(thing_type, ctx.now, ctx.settings.item_cycle_ms, true);
        ctx.pool.add_sprite(SpriteDraw {
            category: ThingCategory::Item,
            client_id: self.client_id,
            dest,
            pattern,
            phase,
            color: Rgb::WHITE,
        });
    }
}

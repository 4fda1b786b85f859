use crate::config::RenderSettings;
use crate::entities::creature::Creature;
use crate::entities::effect::Effect;
use crate::entities::item::Item;
use crate::entities::missile::Missile;
use crate::render::draw_pool::{DrawPool, TileDest};
use crate::world::position::Position;
use crate::world::scheduler::Scheduler;
use crate::world::thing_types::{Light, ThingCategory, ThingType, ThingTypeCatalog};

/// Runtime instance id handed out by the map; scheduled events refer to
/// things through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ThingId(pub u32);

/// Order of a thing inside its tile stack, bottom first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackPriority {
    Ground = 0,
    GroundBorder = 1,
    OnBottom = 2,
    OnTop = 3,
    Creature = 4,
    Common = 5,
}

/// State shared by every kind: identity and where the thing currently sits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThingBase {
    pub id: ThingId,
    position: Option<Position>,
    stack_pos: Option<usize>,
}

impl ThingBase {
    pub fn new(id: ThingId) -> Self {
        Self {
            id,
            position: None,
            stack_pos: None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position.is_valid().then_some(position);
    }

    pub fn stack_pos(&self) -> Option<usize> {
        self.stack_pos
    }

    pub fn set_stack_pos(&mut self, stack_pos: Option<usize>) {
        self.stack_pos = stack_pos;
    }

    pub fn clear(&mut self) {
        self.position = None;
        self.stack_pos = None;
    }
}

/// Everything a lifecycle hook may touch.
pub struct LifecycleContext<'a> {
    pub now: u64,
    pub catalog: &'a ThingTypeCatalog,
    pub settings: &'a RenderSettings,
    pub scheduler: &'a mut Scheduler,
}

/// Map queries needed while picking sprites.
pub trait NeighborProbe {
    fn has_item(&self, position: Position, client_id: u16) -> bool;

    /// Client id of the tile's ground item.
    fn ground_id(&self, position: Position) -> Option<u16>;

    fn has_ground(&self, position: Position) -> bool {
        self.ground_id(position).is_some()
    }

    fn shares_ground(&self, position: Position, ground_id: u16) -> bool {
        self.ground_id(position) == Some(ground_id)
    }
}

pub struct DrawContext<'a> {
    pub now: u64,
    pub catalog: &'a ThingTypeCatalog,
    pub settings: &'a RenderSettings,
    pub central_position: Position,
    pub neighbors: Option<&'a dyn NeighborProbe>,
    pub pool: &'a mut dyn DrawPool,
}

/// Per-kind contract. Drawing never fails: a missing, null or phaseless
/// descriptor simply draws nothing.
pub trait ThingBehavior {
    fn base(&self) -> &ThingBase;

    fn base_mut(&mut self) -> &mut ThingBase;

    fn category(&self) -> ThingCategory;

    fn client_id(&self) -> u16;

    fn set_id(&mut self, id: u16, catalog: &ThingTypeCatalog);

    fn draw(&self, ctx: &mut DrawContext<'_>, dest: TileDest);

    fn thing_type<'c>(&self, catalog: &'c ThingTypeCatalog) -> Option<&'c ThingType> {
        catalog.get(self.category(), self.client_id())
    }

    fn drawable_type<'c>(&self, catalog: &'c ThingTypeCatalog) -> Option<&'c ThingType> {
        self.thing_type(catalog)
            .filter(|thing_type| thing_type.is_drawable())
    }

    fn id(&self) -> ThingId {
        self.base().id
    }

    fn position(&self) -> Option<Position> {
        self.base().position()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Thing {
    Item(Item),
    Effect(Effect),
    Missile(Missile),
    Creature(Creature),
}

impl Thing {
    pub fn behavior(&self) -> &dyn ThingBehavior {
        match self {
            Thing::Item(item) => item,
            Thing::Effect(effect) => effect,
            Thing::Missile(missile) => missile,
            Thing::Creature(creature) => creature,
        }
    }

    pub fn behavior_mut(&mut self) -> &mut dyn ThingBehavior {
        match self {
            Thing::Item(item) => item,
            Thing::Effect(effect) => effect,
            Thing::Missile(missile) => missile,
            Thing::Creature(creature) => creature,
        }
    }

    pub fn id(&self) -> ThingId {
        self.behavior().id()
    }

    pub fn client_id(&self) -> u16 {
        self.behavior().client_id()
    }

    pub fn position(&self) -> Option<Position> {
        self.behavior().position()
    }

    pub fn stack_pos(&self) -> Option<usize> {
        self.behavior().base().stack_pos()
    }

    pub fn set_stack_pos(&mut self, stack_pos: Option<usize>) {
        self.behavior_mut().base_mut().set_stack_pos(stack_pos);
    }

    pub fn set_position(&mut self, position: Position, catalog: &ThingTypeCatalog) {
        match self {
            Thing::Item(item) => item.set_position(position, catalog),
            Thing::Effect(effect) => effect.set_position(position, catalog),
            Thing::Missile(missile) => missile.base_mut().set_position(position),
            Thing::Creature(creature) => creature.base_mut().set_position(position),
        }
    }

    /// Called when the thing leaves its tile.
    pub fn clear_position(&mut self) {
        self.behavior_mut().base_mut().clear();
    }

    pub fn thing_type<'c>(&self, catalog: &'c ThingTypeCatalog) -> Option<&'c ThingType> {
        self.behavior().thing_type(catalog)
    }

    pub fn is_item(&self) -> bool {
        matches!(self, Thing::Item(_))
    }

    pub fn is_effect(&self) -> bool {
        matches!(self, Thing::Effect(_))
    }

    pub fn is_missile(&self) -> bool {
        matches!(self, Thing::Missile(_))
    }

    pub fn is_creature(&self) -> bool {
        matches!(self, Thing::Creature(_))
    }

    pub fn is_npc(&self) -> bool {
        self.as_creature().map(Creature::is_npc).unwrap_or(false)
    }

    pub fn is_monster(&self) -> bool {
        self.as_creature().map(Creature::is_monster).unwrap_or(false)
    }

    pub fn is_player(&self) -> bool {
        self.as_creature().map(Creature::is_player).unwrap_or(false)
    }

    pub fn is_local_player(&self) -> bool {
        self.as_creature()
            .map(Creature::is_local_player)
            .unwrap_or(false)
    }

    /// Descriptor of an item; stacking flags only ever come from items.
    fn item_type<'c>(&self, catalog: &'c ThingTypeCatalog) -> Option<&'c ThingType> {
        match self {
            Thing::Item(item) => item.thing_type(catalog),
            _ => None,
        }
    }

    pub fn is_ground(&self, catalog: &ThingTypeCatalog) -> bool {
        self.item_type(catalog)
            .map(ThingType::is_ground)
            .unwrap_or(false)
    }

    pub fn is_ground_border(&self, catalog: &ThingTypeCatalog) -> bool {
        self.item_type(catalog)
            .map(ThingType::is_ground_border)
            .unwrap_or(false)
    }

    pub fn is_on_bottom(&self, catalog: &ThingTypeCatalog) -> bool {
        self.item_type(catalog)
            .map(ThingType::is_on_bottom)
            .unwrap_or(false)
    }

    pub fn is_on_top(&self, catalog: &ThingTypeCatalog) -> bool {
        self.item_type(catalog)
            .map(ThingType::is_on_top)
            .unwrap_or(false)
    }

    pub fn is_full_ground(&self, catalog: &ThingTypeCatalog) -> bool {
        self.item_type(catalog)
            .map(ThingType::is_full_ground)
            .unwrap_or(false)
    }

    pub fn is_single_ground(&self, catalog: &ThingTypeCatalog) -> bool {
        self.item_type(catalog)
            .map(ThingType::is_single_ground)
            .unwrap_or(false)
    }

    pub fn stack_priority(&self, catalog: &ThingTypeCatalog) -> StackPriority {
        if self.is_ground(catalog) {
            StackPriority::Ground
        } else if self.is_ground_border(catalog) {
            StackPriority::GroundBorder
        } else if self.is_on_bottom(catalog) {
            StackPriority::OnBottom
        } else if self.is_on_top(catalog) {
            StackPriority::OnTop
        } else if self.is_creature() {
            StackPriority::Creature
        } else {
            StackPriority::Common
        }
    }

    pub fn is_common(&self, catalog: &ThingTypeCatalog) -> bool {
        self.is_item() && self.stack_priority(catalog) == StackPriority::Common
    }

    pub fn elevation(&self, catalog: &ThingTypeCatalog) -> u16 {
        self.item_type(catalog)
            .map(|thing_type| thing_type.elevation)
            .unwrap_or(0)
    }

    pub fn has_elevation(&self, catalog: &ThingTypeCatalog) -> bool {
        self.elevation(catalog) > 0
    }

    pub fn light(&self, catalog: &ThingTypeCatalog) -> Option<Light> {
        match self {
            Thing::Item(item) => item
                .thing_type(catalog)
                .and_then(|thing_type| thing_type.light)
                .filter(|light| light.intensity > 0),
            Thing::Creature(creature) => Some(creature.light()).filter(|light| light.intensity > 0),
            _ => None,
        }
    }

    pub fn draw(&self, ctx: &mut DrawContext<'_>, dest: TileDest) {
        self.behavior().draw(ctx, dest);
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Thing::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_effect(&self) -> Option<&Effect> {
        match self {
            Thing::Effect(effect) => Some(effect),
            _ => None,
        }
    }

    pub fn as_missile(&self) -> Option<&Missile> {
        match self {
            Thing::Missile(missile) => Some(missile),
            _ => None,
        }
    }

    pub fn as_creature(&self) -> Option<&Creature> {
        match self {
            Thing::Creature(creature) => Some(creature),
            _ => None,
        }
    }

    pub fn as_creature_mut(&mut self) -> Option<&mut Creature> {
        match self {
            Thing::Creature(creature) => Some(creature),
            _ => None,
        }
    }
}

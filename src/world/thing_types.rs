use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::animation::animator::Animator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThingCategory {
    Item,
    Creature,
    Effect,
    Missile,
}

impl ThingCategory {
    pub const ALL: [ThingCategory; 4] = [
        ThingCategory::Item,
        ThingCategory::Creature,
        ThingCategory::Effect,
        ThingCategory::Missile,
    ];

    fn index(self) -> usize {
        match self {
            ThingCategory::Item => 0,
            ThingCategory::Creature => 1,
            ThingCategory::Effect => 2,
            ThingCategory::Missile => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ThingCategory::Item => "item",
            ThingCategory::Creature => "creature",
            ThingCategory::Effect => "effect",
            ThingCategory::Missile => "missile",
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ThingFlags: u32 {
        const GROUND = 1 << 0;
        const GROUND_BORDER = 1 << 1;
        const ON_BOTTOM = 1 << 2;
        const ON_TOP = 1 << 3;
        const FULL_GROUND = 1 << 4;
        const STACKABLE = 1 << 5;
        const SPLASH = 1 << 6;
        const FLUID_CONTAINER = 1 << 7;
        const ANIMATE_ALWAYS = 1 << 8;
        const TOP_EFFECT = 1 << 9;
        const HANGABLE = 1 << 10;
    }
}

pub fn flag_from_name(name: &str) -> Option<ThingFlags> {
    let flag = match name.trim().to_ascii_lowercase().as_str() {
        "ground" => ThingFlags::GROUND,
        "ground_border" => ThingFlags::GROUND_BORDER,
        "on_bottom" => ThingFlags::ON_BOTTOM,
        "on_top" => ThingFlags::ON_TOP,
        "full_ground" => ThingFlags::FULL_GROUND,
        "stackable" => ThingFlags::STACKABLE,
        "splash" => ThingFlags::SPLASH,
        "fluid_container" => ThingFlags::FLUID_CONTAINER,
        "animate_always" => ThingFlags::ANIMATE_ALWAYS,
        "top_effect" => ThingFlags::TOP_EFFECT,
        "hangable" => ThingFlags::HANGABLE,
        _ => return None,
    };
    Some(flag)
}

/// Light emitted by a descriptor or a creature; `color` indexes the 216-color
/// palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Light {
    pub intensity: u8,
    pub color: u8,
}

impl Light {
    pub fn new(intensity: u8, color: u8) -> Self {
        Self { intensity, color }
    }
}

pub const DEFAULT_GROUND_SPEED: u16 = 150;

/// Legacy per-id timing quirks: (category, id, tick multiplier).
pub const LEGACY_TICK_MULTIPLIERS: &[(ThingCategory, u16, u32)] = &[(ThingCategory::Effect, 33, 4)];

pub fn legacy_tick_multiplier(category: ThingCategory, id: u16) -> Option<u32> {
    LEGACY_TICK_MULTIPLIERS
        .iter()
        .find(|(entry_category, entry_id, _)| *entry_category == category && *entry_id == id)
        .map(|(_, _, multiplier)| *multiplier)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThingType {
    pub id: u16,
    pub category: ThingCategory,
    pub null: bool,
    pub pattern_x: u32,
    pub pattern_y: u32,
    pub pattern_z: u32,
    pub animation_phases: u32,
    pub width: u8,
    pub height: u8,
    pub elevation: u16,
    pub displacement: (i32, i32),
    pub flags: ThingFlags,
    pub light: Option<Light>,
    pub ground_speed: u16,
    pub animator: Option<Animator>,
    pub tick_multiplier: u32,
}

impl ThingType {
    pub fn new(category: ThingCategory, id: u16) -> Self {
        Self {
            id,
            category,
            null: false,
            pattern_x: 1,
            pattern_y: 1,
            pattern_z: 1,
            animation_phases: 1,
            width: 1,
            height: 1,
            elevation: 0,
            displacement: (0, 0),
            flags: ThingFlags::empty(),
            light: None,
            ground_speed: DEFAULT_GROUND_SPEED,
            animator: None,
            tick_multiplier: legacy_tick_multiplier(category, id).unwrap_or(1),
        }
    }

    /// Placeholder occupying an id slot; never drawn.
    pub fn null(category: ThingCategory, id: u16) -> Self {
        Self {
            null: true,
            animation_phases: 0,
            ..Self::new(category, id)
        }
    }

    pub fn with_patterns(mut self, x: u32, y: u32, z: u32) -> Self {
        self.pattern_x = x;
        self.pattern_y = y;
        self.pattern_z = z;
        self
    }

    pub fn with_phases(mut self, phases: u32) -> Self {
        self.animation_phases = phases;
        self
    }

    pub fn with_flags(mut self, flags: ThingFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_elevation(mut self, elevation: u16) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_ground_speed(mut self, speed: u16) -> Self {
        self.ground_speed = speed;
        self
    }

    pub fn with_animator(mut self, animator: Animator) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn is_drawable(&self) -> bool {
        !self.null && self.animation_phases > 0
    }

    pub fn has_flag(&self, flag: ThingFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_ground(&self) -> bool {
        self.has_flag(ThingFlags::GROUND)
    }

    pub fn is_ground_border(&self) -> bool {
        self.has_flag(ThingFlags::GROUND_BORDER)
    }

    pub fn is_on_bottom(&self) -> bool {
        self.has_flag(ThingFlags::ON_BOTTOM)
    }

    pub fn is_on_top(&self) -> bool {
        self.has_flag(ThingFlags::ON_TOP)
    }

    pub fn is_full_ground(&self) -> bool {
        self.has_flag(ThingFlags::FULL_GROUND)
    }

    pub fn is_single_ground(&self) -> bool {
        self.is_ground() && self.width == 1 && self.height == 1
    }

    pub fn is_stackable(&self) -> bool {
        self.has_flag(ThingFlags::STACKABLE)
    }

    pub fn is_splash(&self) -> bool {
        self.has_flag(ThingFlags::SPLASH)
    }

    pub fn is_fluid_container(&self) -> bool {
        self.has_flag(ThingFlags::FLUID_CONTAINER)
    }

    pub fn is_hangable(&self) -> bool {
        self.has_flag(ThingFlags::HANGABLE)
    }

    pub fn is_animate_always(&self) -> bool {
        self.has_flag(ThingFlags::ANIMATE_ALWAYS)
    }

    pub fn is_top_effect(&self) -> bool {
        self.has_flag(ThingFlags::TOP_EFFECT)
    }

    pub fn has_elevation(&self) -> bool {
        self.elevation > 0
    }

    pub fn has_light(&self) -> bool {
        self.light.map(|light| light.intensity > 0).unwrap_or(false)
    }
}

#[derive(Debug)]
pub enum CatalogError {
    ReadError(PathBuf, String),
    ParseError(String),
    UnknownFlag { category: ThingCategory, id: u16, flag: String },
    Duplicate { category: ThingCategory, id: u16 },
    InvalidId { category: ThingCategory, id: u16 },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::ReadError(path, msg) => {
                write!(f, "Failed to read {}: {}", path.display(), msg)
            }
            CatalogError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CatalogError::UnknownFlag { category, id, flag } => {
                write!(f, "{} {}: unknown flag '{}'", category.name(), id, flag)
            }
            CatalogError::Duplicate { category, id } => {
                write!(f, "{} {} defined twice", category.name(), id)
            }
            CatalogError::InvalidId { category, id } => {
                write!(f, "{} id {} is reserved", category.name(), id)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Read-only registry of descriptors, one id-indexed slot list per category.
/// Slot 0 is always a null placeholder.
#[derive(Debug, Clone)]
pub struct ThingTypeCatalog {
    types: [Vec<ThingType>; 4],
}

impl Default for ThingTypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ThingTypeCatalog {
    pub fn new() -> Self {
        Self {
            types: ThingCategory::ALL.map(|category| vec![ThingType::null(category, 0)]),
        }
    }

    pub fn insert(&mut self, thing_type: ThingType) -> Result<(), CatalogError> {
        let category = thing_type.category;
        let id = thing_type.id;
        if id == 0 {
            return Err(CatalogError::InvalidId { category, id });
        }
        let slots = &mut self.types[category.index()];
        let index = usize::from(id);
        if index < slots.len() && !slots[index].is_null() {
            return Err(CatalogError::Duplicate { category, id });
        }
        while slots.len() <= index {
            let filler = slots.len() as u16;
            slots.push(ThingType::null(category, filler));
        }
        slots[index] = thing_type;
        Ok(())
    }

    pub fn is_valid_dat_id(&self, id: u16, category: ThingCategory) -> bool {
        id >= 1 && usize::from(id) < self.types[category.index()].len()
    }

    pub fn get(&self, category: ThingCategory, id: u16) -> Option<&ThingType> {
        if !self.is_valid_dat_id(id, category) {
            return None;
        }
        self.types[category.index()].get(usize::from(id))
    }

    pub fn get_item(&self, id: u16) -> Option<&ThingType> {
        self.get(ThingCategory::Item, id)
    }

    pub fn get_creature(&self, id: u16) -> Option<&ThingType> {
        self.get(ThingCategory::Creature, id)
    }

    pub fn get_effect(&self, id: u16) -> Option<&ThingType> {
        self.get(ThingCategory::Effect, id)
    }

    pub fn get_missile(&self, id: u16) -> Option<&ThingType> {
        self.get(ThingCategory::Missile, id)
    }

    /// Number of slots, placeholders included.
    pub fn len(&self, category: ThingCategory) -> usize {
        self.types[category.index()].len()
    }

    pub fn defined(&self, category: ThingCategory) -> usize {
        self.types[category.index()]
            .iter()
            .filter(|thing_type| !thing_type.is_null())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        ThingCategory::ALL
            .iter()
            .all(|category| self.defined(*category) == 0)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::ReadError(path.to_path_buf(), e.to_string()))?;
        let catalog = Self::parse(&content)?;
        log::info!(
            target: "game",
            "thing catalog {}: items={} creatures={} effects={} missiles={}",
            path.display(),
            catalog.defined(ThingCategory::Item),
            catalog.defined(ThingCategory::Creature),
            catalog.defined(ThingCategory::Effect),
            catalog.defined(ThingCategory::Missile)
        );
        Ok(catalog)
    }

    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_yaml::from_str(content).map_err(|e| CatalogError::ParseError(e.to_string()))?;
        let mut catalog = Self::new();
        for (category, entries) in [
            (ThingCategory::Item, file.items),
            (ThingCategory::Creature, file.creatures),
            (ThingCategory::Effect, file.effects),
            (ThingCategory::Missile, file.missiles),
        ] {
            for entry in entries {
                catalog.insert(entry.into_thing_type(category)?)?;
            }
        }
        Ok(catalog)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<ThingTypeEntry>,
    #[serde(default)]
    creatures: Vec<ThingTypeEntry>,
    #[serde(default)]
    effects: Vec<ThingTypeEntry>,
    #[serde(default)]
    missiles: Vec<ThingTypeEntry>,
}

#[derive(Debug, Deserialize)]
struct ThingTypeEntry {
    id: u16,
    #[serde(default)]
    patterns: Option<[u32; 3]>,
    #[serde(default)]
    phases: Option<u32>,
    #[serde(default)]
    size: Option<[u8; 2]>,
    #[serde(default)]
    elevation: u16,
    #[serde(default)]
    displacement: Option<[i32; 2]>,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    light: Option<Light>,
    #[serde(default)]
    ground_speed: Option<u16>,
    #[serde(default)]
    animator: Option<Animator>,
    #[serde(default)]
    tick_multiplier: Option<u32>,
}

impl ThingTypeEntry {
    fn into_thing_type(self, category: ThingCategory) -> Result<ThingType, CatalogError> {
        let mut thing_type = ThingType::new(category, self.id);
        if let Some([x, y, z]) = self.patterns {
            thing_type = thing_type.with_patterns(x, y, z);
        }
        if let Some([width, height]) = self.size {
            thing_type.width = width;
            thing_type.height = height;
        }
        if let Some([dx, dy]) = self.displacement {
            thing_type.displacement = (dx, dy);
        }
        for name in &self.flags {
            let Some(flag) = flag_from_name(name) else {
                return Err(CatalogError::UnknownFlag {
                    category,
                    id: self.id,
                    flag: name.clone(),
                });
            };
            thing_type.flags |= flag;
        }
        thing_type.elevation = self.elevation;
        thing_type.light = self.light;
        if let Some(speed) = self.ground_speed {
            thing_type.ground_speed = speed;
        }
        let phases = self
            .phases
            .or_else(|| self.animator.as_ref().map(Animator::animation_phases))
            .unwrap_or(1);
        thing_type.animation_phases = phases;
        thing_type.animator = self.animator;
        if let Some(multiplier) = self.tick_multiplier {
            thing_type.tick_multiplier = multiplier.max(1);
        }
        Ok(thing_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
items:
  - id: 100
    flags: [ground, full_ground]
    ground_speed: 120
  - id: 102
    patterns: [4, 2, 1]
    flags: [stackable]
  - id: 105
    light: { intensity: 4, color: 206 }
  - id: 106
    flags: [hangable]
effects:
  - id: 33
    phases: 6
  - id: 1
    patterns: [2, 2, 1]
    animator:
      phase_durations: [[100, 100], [100, 150]]
missiles:
  - id: 3
    patterns: [3, 3, 1]
"#;

    #[test]
    fn parse_catalog_from_yaml() {
        let catalog = ThingTypeCatalog::parse(CATALOG).expect("parse");
        let ground = catalog.get_item(100).expect("ground");
        assert!(ground.is_ground());
        assert!(ground.is_full_ground());
        assert!(ground.is_single_ground());
        assert_eq!(ground.ground_speed, 120);

        assert!(catalog.get_item(102).expect("coins").is_stackable());
        assert!(catalog.get_item(105).expect("torch").has_light());
        let painting = catalog.get_item(106).expect("painting");
        assert!(painting.is_hangable());
        assert!(!painting.is_stackable());

        let filler = catalog.get_item(101).expect("slot exists");
        assert!(filler.is_null());
        assert!(!filler.is_drawable());

        let animated = catalog.get_effect(1).expect("effect");
        assert_eq!(animated.animation_phases, 2);
        assert!(animated.animator.is_some());
        assert_eq!(catalog.get_effect(33).expect("legacy").tick_multiplier, 4);
        assert_eq!(catalog.defined(ThingCategory::Missile), 1);
    }

    #[test]
    fn validity_is_per_category() {
        let catalog = ThingTypeCatalog::parse(CATALOG).expect("parse");
        assert!(catalog.is_valid_dat_id(3, ThingCategory::Missile));
        assert!(catalog.is_valid_dat_id(3, ThingCategory::Effect));
        assert!(!catalog.is_valid_dat_id(34, ThingCategory::Effect));
        assert!(!catalog.is_valid_dat_id(4, ThingCategory::Missile));
        assert!(!catalog.is_valid_dat_id(0, ThingCategory::Item));
        assert!(catalog.get_missile(4).is_none());
        assert!(catalog.get_creature(1).is_none());
    }

    #[test]
    fn rejects_bad_entries() {
        let mut catalog = ThingTypeCatalog::new();
        catalog
            .insert(ThingType::new(ThingCategory::Item, 100))
            .expect("insert");
        assert!(matches!(
            catalog.insert(ThingType::new(ThingCategory::Item, 100)),
            Err(CatalogError::Duplicate { .. })
        ));
        assert!(matches!(
            catalog.insert(ThingType::new(ThingCategory::Item, 0)),
            Err(CatalogError::InvalidId { .. })
        ));
        let unknown = "items:\n  - id: 5\n    flags: [sparkly]\n";
        assert!(matches!(
            ThingTypeCatalog::parse(unknown),
            Err(CatalogError::UnknownFlag { .. })
        ));
    }
}

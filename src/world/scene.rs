use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::entities::animated_text::AnimatedText;
use crate::entities::creature::{Creature, CreatureId, CreatureKind};
use crate::entities::effect::Effect;
use crate::entities::item::Item;
use crate::entities::missile::Missile;
use crate::entities::outfit::{Addons, Outfit};
use crate::entities::player::Player;
use crate::entities::thing::{Thing, ThingId};
use crate::render::map_view::MapView;
use crate::world::position::{Direction, Position};
use crate::world::thing_types::{Light, ThingCategory};

#[derive(Debug)]
pub enum SceneError {
    ReadError(PathBuf, String),
    ParseError(String),
    InvalidPosition(Position),
    UnknownThing { category: ThingCategory, id: u16 },
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::ReadError(path, msg) => {
                write!(f, "Failed to read {}: {}", path.display(), msg)
            }
            SceneError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SceneError::InvalidPosition(position) => {
                write!(f, "invalid position {}/{}/{}", position.x, position.y, position.z)
            }
            SceneError::UnknownThing { category, id } => {
                write!(f, "scene references unknown {} {}", category.name(), id)
            }
        }
    }
}

impl std::error::Error for SceneError {}

/// Static world snapshot plus timed creature steps, read from `scene.yml`.
#[derive(Debug, Default, Deserialize)]
pub struct Scene {
    pub camera: Option<Position>,
    #[serde(default)]
    pub global_light: Option<Light>,
    #[serde(default)]
    pub tiles: Vec<SceneTile>,
    #[serde(default)]
    pub creatures: Vec<SceneCreature>,
    #[serde(default)]
    pub effects: Vec<SceneEffect>,
    #[serde(default)]
    pub missiles: Vec<SceneMissile>,
    #[serde(default)]
    pub texts: Vec<SceneText>,
    #[serde(default)]
    pub steps: Vec<SceneStep>,
}

#[derive(Debug, Deserialize)]
pub struct SceneTile {
    pub position: Position,
    #[serde(default)]
    pub items: Vec<SceneItem>,
}

#[derive(Debug, Deserialize)]
pub struct SceneItem {
    pub id: u16,
    #[serde(default)]
    pub count: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneCreatureKind {
    Npc,
    Monster,
    Player,
    LocalPlayer,
}

#[derive(Debug, Deserialize)]
pub struct SceneCreature {
    pub id: u32,
    pub name: String,
    pub kind: SceneCreatureKind,
    pub position: Position,
    pub look_type: u16,
    #[serde(default)]
    pub head: u8,
    #[serde(default)]
    pub body: u8,
    #[serde(default)]
    pub legs: u8,
    #[serde(default)]
    pub feet: u8,
    #[serde(default)]
    pub addons: u8,
    #[serde(default)]
    pub mount: u16,
    #[serde(default)]
    pub vocation: u8,
    #[serde(default)]
    pub speed: Option<u16>,
    #[serde(default)]
    pub health: Option<u8>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub light: Option<Light>,
}

#[derive(Debug, Deserialize)]
pub struct SceneEffect {
    pub id: u16,
    pub position: Position,
    #[serde(default)]
    pub at_ms: u64,
    #[serde(default)]
    pub shader: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SceneMissile {
    pub id: u16,
    pub from: Position,
    pub to: Position,
    #[serde(default)]
    pub at_ms: u64,
    #[serde(default)]
    pub shader: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SceneText {
    pub text: String,
    pub color: u16,
    pub position: Position,
    #[serde(default)]
    pub at_ms: u64,
}

/// Moves creature `creature` to `to` once the clock reaches `at_ms`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SceneStep {
    pub creature: u32,
    pub to: Position,
    pub at_ms: u64,
}

/// Something the scene makes happen at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    Effect(usize),
    Missile(usize),
    Text(usize),
    Step(usize),
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SceneError::ReadError(path.to_path_buf(), e.to_string()))?;
        let scene = Self::parse(&content)?;
        log::info!(
            target: "game",
            "scene {}: tiles={} creatures={} effects={} missiles={} texts={} steps={}",
            path.display(),
            scene.tiles.len(),
            scene.creatures.len(),
            scene.effects.len(),
            scene.missiles.len(),
            scene.texts.len(),
            scene.steps.len()
        );
        Ok(scene)
    }

    pub fn parse(content: &str) -> Result<Self, SceneError> {
        serde_yaml::from_str(content).map_err(|e| SceneError::ParseError(e.to_string()))
    }

    /// Places the static part of the scene: camera, light, tiles and
    /// creatures. Timed entries are played through `play`.
    pub fn apply(&self, view: &mut MapView) -> Result<(), SceneError> {
        if let Some(camera) = self.camera {
            if !camera.is_valid() {
                return Err(SceneError::InvalidPosition(camera));
            }
            view.set_camera(camera);
        }
        if let Some(light) = self.global_light {
            view.set_global_light(light);
        }

        for tile in &self.tiles {
            check_position(tile.position)?;
            for entry in &tile.items {
                check_known(view, ThingCategory::Item, entry.id)?;
                let id = view.allocate_id();
                let mut item = Item::new(id, entry.id, view.catalog());
                if let Some(count) = entry.count {
                    item = item.with_count(count, view.catalog());
                }
                view.add_thing(Thing::Item(item), tile.position);
            }
        }

        for entry in &self.creatures {
            check_position(entry.position)?;
            check_known(view, ThingCategory::Creature, entry.look_type)?;
            let creature = build_creature(view.allocate_id(), entry);
            view.add_thing(Thing::Creature(creature), entry.position);
        }
        Ok(())
    }

    /// Fires every timed entry due in `(from, to]`, in time order. Entries
    /// at 0 are due on the first call with `from` unset.
    pub fn play(&self, view: &mut MapView, from: Option<u64>, to: u64) -> Result<(), SceneError> {
        let due = |at: u64| from.map_or(at <= to, |from| at > from && at <= to);
        let mut cues: Vec<(u64, Cue)> = Vec::new();
        for (index, entry) in self.effects.iter().enumerate() {
            cues.push((entry.at_ms, Cue::Effect(index)));
        }
        for (index, entry) in self.missiles.iter().enumerate() {
            cues.push((entry.at_ms, Cue::Missile(index)));
        }
        for (index, entry) in self.texts.iter().enumerate() {
            cues.push((entry.at_ms, Cue::Text(index)));
        }
        for (index, entry) in self.steps.iter().enumerate() {
            cues.push((entry.at_ms, Cue::Step(index)));
        }
        cues.retain(|(at, _)| due(*at));
        cues.sort_by_key(|(at, _)| *at);

        for (_, cue) in cues {
            match cue {
                Cue::Effect(index) => {
                    let entry = &self.effects[index];
                    check_position(entry.position)?;
                    check_known(view, ThingCategory::Effect, entry.id)?;
                    let mut effect = Effect::new(view.allocate_id(), entry.id, view.catalog());
                    if let Some(shader) = entry.shader.as_deref() {
                        effect = effect.with_shader(shader);
                    }
                    view.add_thing(Thing::Effect(effect), entry.position);
                }
                Cue::Missile(index) => {
                    let entry = &self.missiles[index];
                    check_position(entry.from)?;
                    check_position(entry.to)?;
                    check_known(view, ThingCategory::Missile, entry.id)?;
                    let mut missile = Missile::new(view.allocate_id(), entry.id, view.catalog());
                    if let Some(shader) = entry.shader.as_deref() {
                        missile = missile.with_shader(shader);
                    }
                    view.add_missile(missile, entry.from, entry.to);
                }
                Cue::Text(index) => {
                    let entry = &self.texts[index];
                    check_position(entry.position)?;
                    let text = AnimatedText::new(view.allocate_id(), &entry.text, entry.color);
                    view.add_animated_text(text, entry.position);
                }
                Cue::Step(index) => {
                    let step = self.steps[index];
                    check_position(step.to)?;
                    if !view.move_creature(CreatureId(step.creature), step.to) {
                        log::warn!(
                            target: "game",
                            "scene step for creature {} ignored",
                            step.creature
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Time of the last timed entry.
    pub fn duration_ms(&self) -> u64 {
        let effects = self.effects.iter().map(|e| e.at_ms);
        let missiles = self.missiles.iter().map(|m| m.at_ms);
        let texts = self.texts.iter().map(|t| t.at_ms);
        let steps = self.steps.iter().map(|s| s.at_ms);
        effects.chain(missiles).chain(texts).chain(steps).max().unwrap_or(0)
    }
}

fn check_position(position: Position) -> Result<(), SceneError> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(SceneError::InvalidPosition(position))
    }
}

fn check_known(view: &MapView, category: ThingCategory, id: u16) -> Result<(), SceneError> {
    if view.catalog().is_valid_dat_id(id, category) {
        Ok(())
    } else {
        Err(SceneError::UnknownThing { category, id })
    }
}

fn build_creature(id: ThingId, entry: &SceneCreature) -> Creature {
    let kind = match entry.kind {
        SceneCreatureKind::Npc => CreatureKind::Npc,
        SceneCreatureKind::Monster => CreatureKind::Monster,
        SceneCreatureKind::Player => CreatureKind::Player(Player::new(entry.vocation)),
        SceneCreatureKind::LocalPlayer => CreatureKind::Player(Player::local(entry.vocation)),
    };
    let mut outfit = Outfit::new(entry.look_type);
    outfit.set_head(entry.head);
    outfit.set_body(entry.body);
    outfit.set_legs(entry.legs);
    outfit.set_feet(entry.feet);
    outfit.set_addons(Addons::from_bits_truncate(entry.addons));
    outfit.set_mount(entry.mount);

    let mut creature = Creature::new(id, CreatureId(entry.id), &entry.name, kind);
    creature.set_outfit(outfit);
    if let Some(speed) = entry.speed {
        creature.set_base_speed(speed);
        creature.set_speed(speed);
    }
    if let Some(health) = entry.health {
        creature.set_health_percent(health);
    }
    if let Some(direction) = entry.direction {
        creature.set_direction(direction);
    }
    if let Some(light) = entry.light {
        creature.set_light(light);
    }
    creature
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
camera: { x: 100, y: 100, z: 7 }
global_light: { intensity: 40, color: 215 }
tiles:
  - position: { x: 100, y: 100, z: 7 }
    items:
      - id: 102
      - id: 2148
        count: 37
creatures:
  - id: 268435457
    name: Knight
    kind: local_player
    position: { x: 100, y: 100, z: 7 }
    look_type: 128
    head: 78
    addons: 3
    vocation: 4
    direction: east
steps:
  - creature: 268435457
    to: { x: 101, y: 100, z: 7 }
    at_ms: 500
texts:
  - text: "12"
    color: 180
    position: { x: 100, y: 100, z: 7 }
missiles:
  - id: 5
    from: { x: 100, y: 100, z: 7 }
    to: { x: 103, y: 100, z: 7 }
    at_ms: 100
    shader: Glow
"#;

    #[test]
    fn parses_every_section() {
        let scene = Scene::parse(SCENE).expect("scene");
        assert_eq!(scene.camera, Some(Position::new(100, 100, 7)));
        assert_eq!(scene.global_light, Some(Light::new(40, 215)));
        assert_eq!(scene.tiles[0].items.len(), 2);
        assert_eq!(scene.tiles[0].items[1].count, Some(37));
        assert_eq!(scene.creatures[0].kind, SceneCreatureKind::LocalPlayer);
        assert_eq!(scene.creatures[0].direction, Some(Direction::East));
        assert_eq!(scene.duration_ms(), 500);
        assert_eq!(scene.missiles[0].shader.as_deref(), Some("Glow"));
        assert!(scene.effects.is_empty());
    }

    #[test]
    fn creature_entry_builds_outfit_and_kind() {
        let scene = Scene::parse(SCENE).expect("scene");
        let creature = build_creature(ThingId(1), &scene.creatures[0]);
        assert!(creature.is_local_player());
        assert_eq!(creature.outfit().look_type(), 128);
        assert_eq!(creature.outfit().head_color(), Outfit::get_color(78));
        assert_eq!(creature.outfit().addons(), Addons::FIRST | Addons::SECOND);
        assert_eq!(creature.direction(), Direction::East);
        assert!(creature.player().is_some_and(|player| player.is_mage()));
    }

    #[test]
    fn malformed_scene_is_a_parse_error() {
        let err = Scene::parse("tiles: 7").expect_err("should fail");
        assert!(matches!(err, SceneError::ParseError(_)));
    }
}

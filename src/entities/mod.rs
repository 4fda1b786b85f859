pub mod animated_text;
pub mod creature;
pub mod effect;
pub mod item;
pub mod missile;
pub mod outfit;
pub mod player;
pub mod thing;

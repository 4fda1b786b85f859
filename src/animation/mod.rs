pub mod animator;
pub mod pattern;

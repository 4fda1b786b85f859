pub mod map;
pub mod position;
pub mod scene;
pub mod scheduler;
pub mod thing_types;
pub mod tile;
pub mod time;
pub mod viewport;

pub mod color;
pub mod draw_pool;
pub mod light_view;
pub mod map_view;
pub mod text;

mod render;

pub use render::cmd_render;

pub mod bounds;
pub mod error;
pub mod extract;
pub mod field;
pub mod grid;
pub mod mesh;
pub mod plugin;
pub mod tables;
pub mod types;

pub use plugin::MetaballsPlugin;

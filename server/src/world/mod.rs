// grid_map_server/server/src/world/mod.rs
pub mod cell;
pub mod coords;
pub mod grid;
pub mod grid_index;
pub mod loader;
pub mod reference_list;
pub mod visitor;

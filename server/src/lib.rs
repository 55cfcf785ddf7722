// grid_map_server/server/src/lib.rs

pub mod core;
pub mod concurrent;
pub mod world;
pub mod server;
pub mod operational;

pub use crate::core::error::{GridError, GridResult};
pub use crate::core::types::{CategoryMask, CellCoord, GridCoord, ObjectCategory, ObjectGuid, Position};
pub use crate::world::grid_index::GridIndex;

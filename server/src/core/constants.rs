// grid_map_server/server/src/core/constants.rs
use std::time::Duration;

pub const SERVER_TICK_RATE: u64 = 20;
pub const SLOW_TICK_LOG_MS: u64 = 40; // warn if a map tick exceeds this

// Grid geometry. Kept in f32 so mapped coordinates match the legacy tables bit for bit.
pub const MAX_NUMBER_OF_CELLS: u32 = 8;
pub const MAX_NUMBER_OF_GRIDS: u32 = 64;

pub const SIZE_OF_GRIDS: f32 = 533.3333;
pub const CENTER_GRID_ID: u32 = MAX_NUMBER_OF_GRIDS / 2;
pub const CENTER_GRID_OFFSET: f32 = SIZE_OF_GRIDS / 2.0;

pub const SIZE_OF_GRID_CELL: f32 = SIZE_OF_GRIDS / MAX_NUMBER_OF_CELLS as f32;
pub const CENTER_GRID_CELL_ID: u32 = MAX_NUMBER_OF_CELLS * MAX_NUMBER_OF_GRIDS / 2;
pub const CENTER_GRID_CELL_OFFSET: f32 = SIZE_OF_GRID_CELL / 2.0;

pub const TOTAL_NUMBER_OF_CELLS_PER_MAP: u32 = MAX_NUMBER_OF_GRIDS * MAX_NUMBER_OF_CELLS;

pub const MAP_SIZE: f32 = SIZE_OF_GRIDS * MAX_NUMBER_OF_GRIDS as f32;
pub const MAP_HALFSIZE: f32 = MAP_SIZE / 2.0;
pub const MAP_COORD_LIMIT: f32 = MAP_HALFSIZE - 0.5;

// Grid lifecycle
pub const MIN_GRID_DELAY: Duration = Duration::from_secs(60);
pub const MIN_MAP_UPDATE_DELAY: Duration = Duration::from_millis(1);

// Visibility
pub const DEFAULT_VISIBILITY_DISTANCE: f32 = 90.0;
pub const MAX_VISIBILITY_DISTANCE: f32 = SIZE_OF_GRIDS;

// Deferred work
pub const MAX_COMMANDS_PER_TICK: usize = 4096;

// grid_map_server/server/src/world/coords.rs
//! Mapping from continuous world positions to grid and cell coordinates.
//!
//! The arithmetic runs in `f64` on `f32` inputs and rounds with `+0.5` followed by
//! truncation, which reproduces the values stored in existing spawn tables. Callers
//! validate positions with [`is_valid_map_coord`] before mapping them; the compute
//! functions never clamp on their own.

use crate::core::constants::{
    CENTER_GRID_CELL_ID, CENTER_GRID_CELL_OFFSET, CENTER_GRID_ID, CENTER_GRID_OFFSET, MAP_COORD_LIMIT,
    SIZE_OF_GRIDS, SIZE_OF_GRID_CELL,
};
use crate::core::types::{CellCoord, CoordPair, GridCoord};

#[inline]
fn compute<const LIMIT: u32>(x: f32, y: f32, center_offset: f32, size: f32, center_val: u32) -> CoordPair<LIMIT> {
    let x_offset = (f64::from(x) - f64::from(center_offset)) / f64::from(size);
    let y_offset = (f64::from(y) - f64::from(center_offset)) / f64::from(size);

    // `as u32` truncates toward zero and saturates, so out-of-range input lands on
    // an invalid (or zero) coordinate instead of wrapping.
    let x_val = (x_offset + f64::from(center_val) + 0.5) as u32;
    let y_val = (y_offset + f64::from(center_val) + 0.5) as u32;
    CoordPair::new(x_val, y_val)
}

#[inline]
pub fn compute_grid_coord(x: f32, y: f32) -> GridCoord {
    compute(x, y, CENTER_GRID_OFFSET, SIZE_OF_GRIDS, CENTER_GRID_ID)
}

#[inline]
pub fn compute_cell_coord(x: f32, y: f32) -> CellCoord {
    compute(x, y, CENTER_GRID_CELL_OFFSET, SIZE_OF_GRID_CELL, CENTER_GRID_CELL_ID)
}

/// Same as [`compute_cell_coord`] but also returns the position's offset from the
/// cell origin.
pub fn compute_cell_coord_with_offset(x: f32, y: f32) -> (CellCoord, f32, f32) {
    let x_offset = (f64::from(x) - f64::from(CENTER_GRID_CELL_OFFSET)) / f64::from(SIZE_OF_GRID_CELL);
    let y_offset = (f64::from(y) - f64::from(CENTER_GRID_CELL_OFFSET)) / f64::from(SIZE_OF_GRID_CELL);

    let x_val = (x_offset + f64::from(CENTER_GRID_CELL_ID) + 0.5) as u32;
    let y_val = (y_offset + f64::from(CENTER_GRID_CELL_ID) + 0.5) as u32;
    let x_off = (x_offset as f32 - x_val as f32 + CENTER_GRID_CELL_ID as f32) * SIZE_OF_GRID_CELL;
    let y_off = (y_offset as f32 - y_val as f32 + CENTER_GRID_CELL_ID as f32) * SIZE_OF_GRID_CELL;
    (CellCoord::new(x_val, y_val), x_off, y_off)
}

/// Clamps a single world coordinate into the valid map range.
#[inline]
pub fn normalize_map_coord(c: f32) -> f32 {
    if c > MAP_COORD_LIMIT {
        MAP_COORD_LIMIT
    } else if c < -MAP_COORD_LIMIT {
        -MAP_COORD_LIMIT
    } else {
        c
    }
}

#[inline]
pub fn is_valid_coord(c: f32) -> bool {
    c.is_finite() && c.abs() <= MAP_COORD_LIMIT
}

#[inline]
pub fn is_valid_map_coord(x: f32, y: f32) -> bool {
    is_valid_coord(x) && is_valid_coord(y)
}

#[inline]
pub fn is_valid_map_coord_xyz(x: f32, y: f32, z: f32) -> bool {
    is_valid_map_coord(x, y) && is_valid_coord(z)
}

#[inline]
pub fn is_valid_map_coord_xyzo(x: f32, y: f32, z: f32, o: f32) -> bool {
    is_valid_map_coord_xyz(x, y, z) && o.is_finite()
}

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellArea {
    pub low_bound: CellCoord,
    pub high_bound: CellCoord,
}

impl CellArea {
    pub fn new(low_bound: CellCoord, high_bound: CellCoord) -> Self {
        CellArea { low_bound, high_bound }
    }

    /// Cells overlapped by the square of half-width `radius` centred on (x, y).
    pub fn around(x: f32, y: f32, radius: f32) -> Self {
        if radius <= 0.0 {
            let center = compute_cell_coord(x, y).normalize();
            return CellArea::new(center, center);
        }
        let low = compute_cell_coord(x - radius, y - radius).normalize();
        let high = compute_cell_coord(x + radius, y + radius).normalize();
        CellArea::new(low, high)
    }

    /// The 3x3 block centred on `cell`, cut at the map edge.
    pub fn neighborhood(cell: CellCoord) -> Self {
        let center = cell.normalize();
        let mut low = center;
        let mut high = center;
        low.dec_x(1);
        low.dec_y(1);
        high.inc_x(1);
        high.inc_y(1);
        CellArea::new(low, high)
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        (self.low_bound.x..=self.high_bound.x).contains(&cell.x)
            && (self.low_bound.y..=self.high_bound.y).contains(&cell.y)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let w = (self.high_bound.x - self.low_bound.x + 1) as usize;
        let h = (self.high_bound.y - self.low_bound.y + 1) as usize;
        w * h
    }

    /// True for inverted bounds only; a valid area holds at least one cell.
    pub fn is_empty(&self) -> bool {
        self.low_bound.x > self.high_bound.x || self.low_bound.y > self.high_bound.y
    }

    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let (lx, hx) = (self.low_bound.x, self.high_bound.x);
        (self.low_bound.y..=self.high_bound.y).flat_map(move |y| (lx..=hx).map(move |x| CellCoord::new(x, y)))
    }

    /// Distinct grids touched by this area, row by row.
    pub fn grids(&self) -> impl Iterator<Item = GridCoord> {
        let low = self.low_bound.grid_coord();
        let high = self.high_bound.grid_coord();
        (low.y..=high.y).flat_map(move |y| (low.x..=high.x).map(move |x| GridCoord::new(x, y)))
    }
}

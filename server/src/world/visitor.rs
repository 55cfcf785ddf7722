// grid_map_server/server/src/world/visitor.rs
//! Traversal of indexed objects over one cell, one grid, or any set of cells.
//!
//! The visiting operation gets the whole `GridIndex` back and may spawn, despawn
//! or relocate anything while the walk is in progress. Every object matching
//! the mask is handed to the operation at most once per call, even when it is
//! relocated into a cell the walk has not reached yet. Objects despawned before
//! the walk reaches them are not visited. No order is promised.

use crate::core::constants::MAX_NUMBER_OF_CELLS;
use crate::core::types::{CategoryMask, CellCoord, GridCoord, NearbyObject};
use crate::world::coords::CellArea;
use crate::world::grid_index::GridIndex;
use ahash::AHashSet;
use smallvec::SmallVec;
use tracing::trace;

/// Operation applied to each visited object.
pub trait ObjectVisitor {
    fn visit(&mut self, index: &mut GridIndex, object: &NearbyObject);
}

impl<F> ObjectVisitor for F
where
    F: FnMut(&mut GridIndex, &NearbyObject),
{
    fn visit(&mut self, index: &mut GridIndex, object: &NearbyObject) {
        self(index, object)
    }
}

/// Collects read-only snapshots, e.g. for "who is near me" queries answered to
/// other subsystems.
#[derive(Debug, Default)]
pub struct CollectVisitor {
    pub objects: Vec<NearbyObject>,
}

impl ObjectVisitor for CollectVisitor {
    fn visit(&mut self, _index: &mut GridIndex, object: &NearbyObject) {
        self.objects.push(*object);
    }
}

impl GridIndex {
    pub fn visit_cell<V: ObjectVisitor>(&mut self, cell: CellCoord, mask: CategoryMask, visitor: &mut V) -> usize {
        self.visit_cells([cell], mask, visitor)
    }

    pub fn visit_grid<V: ObjectVisitor>(&mut self, coord: GridCoord, mask: CategoryMask, visitor: &mut V) -> usize {
        let Some(grid) = self.grids.get(&coord) else { return 0 };
        if grid.is_empty() {
            return 0;
        }
        let side = MAX_NUMBER_OF_CELLS as usize;
        let cells: Vec<CellCoord> = (0..side).flat_map(|y| (0..side).map(move |x| coord.cell_at(x, y))).collect();
        self.visit_cells(cells, mask, visitor)
    }

    pub fn visit_area<V: ObjectVisitor>(&mut self, area: CellArea, mask: CategoryMask, visitor: &mut V) -> usize {
        self.visit_cells(area.cells(), mask, visitor)
    }

    /// Visits the 3x3 block of cells around `cell`.
    pub fn visit_neighborhood<V: ObjectVisitor>(&mut self, cell: CellCoord, mask: CategoryMask, visitor: &mut V) -> usize {
        self.visit_area(CellArea::neighborhood(cell), mask, visitor)
    }

    pub fn visit_cells<I, V>(&mut self, cells: I, mask: CategoryMask, visitor: &mut V) -> usize
    where
        I: IntoIterator<Item = CellCoord>,
        V: ObjectVisitor,
    {
        let mut targets: SmallVec<[CellCoord; 9]> = SmallVec::new();
        for cell in cells {
            let cell = cell.normalize();
            if !targets.contains(&cell) {
                targets.push(cell);
            }
        }

        let mut seen: AHashSet<_> = AHashSet::new();
        let mut visited = 0;
        for cell in targets {
            let grid_coord = cell.grid_coord();
            match self.grids.get_mut(&grid_coord) {
                Some(grid) if grid.get_cell(cell).is_some_and(|c| !c.is_empty()) => grid.begin_visit(),
                _ => continue,
            }

            for category in mask.categories() {
                let cursor = self
                    .grids
                    .get_mut(&grid_coord)
                    .and_then(|g| g.get_cell_mut(cell))
                    .map(|c| c.list_mut(category))
                    .filter(|l| !l.is_empty())
                    .map(|l| l.begin_pass());
                let Some(mut cursor) = cursor else { continue };

                loop {
                    let next = self
                        .grids
                        .get(&grid_coord)
                        .and_then(|g| g.get_cell(cell))
                        .and_then(|c| c.list(category).advance(&mut cursor).copied());
                    let Some(guid) = next else { break };
                    if !seen.insert(guid) {
                        continue;
                    }
                    let Some(object) = self.objects.get(&guid).map(|o| o.snapshot(guid)) else { continue };
                    visitor.visit(self, &object);
                    visited += 1;
                }

                if let Some(list) = self.grids.get_mut(&grid_coord).and_then(|g| g.get_cell_mut(cell)).map(|c| c.list_mut(category)) {
                    list.end_pass(cursor);
                }
            }

            if let Some(grid) = self.grids.get_mut(&grid_coord) {
                grid.end_visit();
            }
        }
        trace!(map_id = self.map_id(), visited, "cells visited");
        visited
    }
}

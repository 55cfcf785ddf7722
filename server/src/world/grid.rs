// grid_map_server/server/src/world/grid.rs
use crate::core::constants::MAX_NUMBER_OF_CELLS;
use crate::core::error::{GridError, GridResult};
use crate::core::types::{CategoryMask, CellCoord, GridCoord, ObjectCategory, ObjectGuid};
use crate::world::cell::Cell;
use crate::world::reference_list::Reference;
use std::time::Duration;
use tracing::{debug, trace};

const CELLS_PER_SIDE: usize = MAX_NUMBER_OF_CELLS as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridState {
    NotLoaded,
    Loading,
    Active,
    Unloading,
}

/// Outcome of asking a grid to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    /// Grid was not loaded; static content must be fetched.
    Started,
    /// Already loading or active, nothing to do.
    AlreadyLoaded,
    /// A pending unload was cancelled and the grid is active again.
    UnloadCancelled,
}

/// One coarse map region: an 8x8 matrix of cells plus its load state.
#[derive(Debug)]
pub struct Grid {
    coord: GridCoord,
    state: GridState,
    cells: Vec<Cell>,
    live_count: usize,
    idle_time: Duration,
    unload_lock: bool,
    visit_depth: u32,
}

impl Grid {
    pub fn new(coord: GridCoord) -> Self {
        Grid {
            coord,
            state: GridState::NotLoaded,
            cells: (0..CELLS_PER_SIDE * CELLS_PER_SIDE).map(|_| Cell::new()).collect(),
            live_count: 0,
            idle_time: Duration::ZERO,
            unload_lock: false,
            visit_depth: 0,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn state(&self) -> GridState {
        self.state
    }

    #[inline]
    fn local_index(&self, cell: CellCoord) -> Option<usize> {
        if cell.grid_coord() != self.coord {
            return None;
        }
        let (x, y) = cell.local();
        Some(y * CELLS_PER_SIDE + x)
    }

    pub fn get_cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.local_index(cell).map(|i| &self.cells[i])
    }

    pub fn get_cell_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        self.local_index(cell).map(move |i| &mut self.cells[i])
    }

    /// Active objects linked into this grid. Only these block unloading.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn object_count(&self) -> usize {
        self.cells.iter().map(Cell::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    pub fn set_unload_lock(&mut self, locked: bool) {
        self.unload_lock = locked;
    }

    pub fn is_unload_locked(&self) -> bool {
        self.unload_lock
    }

    pub fn idle_time(&self) -> Duration {
        self.idle_time
    }

    pub fn is_being_visited(&self) -> bool {
        self.visit_depth > 0
    }

    pub(crate) fn link(
        &mut self,
        cell: CellCoord,
        category: ObjectCategory,
        reference: &mut Reference,
        guid: ObjectGuid,
        active: bool,
    ) -> GridResult<()> {
        let coord = self.coord;
        let Some(target) = self.get_cell_mut(cell) else {
            return Err(GridError::GridNotLoaded(coord));
        };
        target.insert(category, reference, guid)?;
        if active {
            self.live_count += 1;
        }
        Ok(())
    }

    pub(crate) fn unlink(
        &mut self,
        cell: CellCoord,
        category: ObjectCategory,
        reference: &mut Reference,
        active: bool,
    ) -> GridResult<bool> {
        let Some(target) = self.get_cell_mut(cell) else {
            return Ok(false);
        };
        let removed = target.remove(category, reference)?;
        if removed && active {
            self.live_count = self.live_count.saturating_sub(1);
        }
        Ok(removed)
    }

    // --- load state machine ---

    pub fn request_load(&mut self) -> LoadRequest {
        match self.state {
            GridState::NotLoaded => {
                self.state = GridState::Loading;
                debug!(grid = ?self.coord, "grid loading");
                LoadRequest::Started
            }
            GridState::Loading | GridState::Active => LoadRequest::AlreadyLoaded,
            GridState::Unloading => {
                self.state = GridState::Active;
                self.idle_time = Duration::ZERO;
                debug!(grid = ?self.coord, "grid unload cancelled");
                LoadRequest::UnloadCancelled
            }
        }
    }

    pub fn finish_loading(&mut self) {
        if self.state == GridState::Loading {
            self.state = GridState::Active;
            self.idle_time = Duration::ZERO;
            debug!(grid = ?self.coord, objects = self.object_count(), "grid active");
        }
    }

    /// Player proximity seen this tick.
    pub fn mark_needed(&mut self) {
        self.idle_time = Duration::ZERO;
    }

    /// Accumulates time without player proximity. Returns true once the grid may
    /// start unloading.
    pub fn tick_idle(&mut self, diff: Duration, min_delay: Duration) -> bool {
        if self.state != GridState::Active {
            return false;
        }
        self.idle_time = self.idle_time.saturating_add(diff);
        self.can_unload() && self.idle_time >= min_delay
    }

    pub fn can_unload(&self) -> bool {
        self.live_count == 0 && !self.is_unload_locked()
    }

    pub fn begin_unloading(&mut self) -> bool {
        if self.state == GridState::Active && self.can_unload() {
            self.state = GridState::Unloading;
            debug!(grid = ?self.coord, idle = ?self.idle_time, "grid unloading");
            true
        } else {
            false
        }
    }

    /// Unloading grids are torn down only once nothing is traversing them.
    pub fn ready_for_teardown(&self) -> bool {
        self.state == GridState::Unloading && self.visit_depth == 0 && self.can_unload()
    }

    pub(crate) fn mark_not_loaded(&mut self) {
        self.state = GridState::NotLoaded;
    }

    // --- traversal ---

    pub(crate) fn begin_visit(&mut self) {
        self.visit_depth += 1;
    }

    pub(crate) fn end_visit(&mut self) {
        self.visit_depth = self.visit_depth.saturating_sub(1);
    }

    /// Read-only walk over every cell. Structural changes during a visit go
    /// through the grid index visitor instead, which keeps the counters right.
    pub fn visit<F>(&mut self, mask: CategoryMask, mut op: F) -> usize
    where
        F: FnMut(CellCoord, ObjectCategory, ObjectGuid),
    {
        self.begin_visit();
        let coord = self.coord;
        let mut visited = 0;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let at = coord.cell_at(i % CELLS_PER_SIDE, i / CELLS_PER_SIDE);
            visited += cell.visit(mask, |_, category, guid| op(at, category, guid));
        }
        self.end_visit();
        trace!(grid = ?coord, visited, "grid visited");
        visited
    }

    /// Every object guid linked anywhere in the grid.
    pub fn collect_objects(&self) -> Vec<(CellCoord, ObjectCategory, ObjectGuid)> {
        let mut out = Vec::with_capacity(self.object_count());
        for (i, cell) in self.cells.iter().enumerate() {
            let at = self.coord.cell_at(i % CELLS_PER_SIDE, i / CELLS_PER_SIDE);
            for category in ObjectCategory::ALL {
                out.extend(cell.list(category).iter().map(|guid| (at, category, *guid)));
            }
        }
        out
    }
}

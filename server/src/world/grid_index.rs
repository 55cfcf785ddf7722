// grid_map_server/server/src/world/grid_index.rs
//! Per-map registry of grids and of the objects linked into them.
//!
//! Only the worker currently ticking the owning map touches a `GridIndex`; every
//! mutating method takes `&mut self`, so that discipline is checked by the borrow
//! checker rather than by locks.

use crate::core::config::GridConfig;
use crate::core::error::{GridError, GridResult};
use crate::core::types::{
    CategoryMask, CellCoord, GridCoord, MapId, NearbyObject, ObjectCategory, ObjectGuid, Position, SpawnRecord,
};
use crate::operational::monitoring::metrics as grid_metrics;
use crate::world::coords::{compute_cell_coord, is_valid_map_coord, CellArea};
use crate::world::grid::{Grid, GridState, LoadRequest};
use crate::world::loader::GridLoader;
use crate::world::reference_list::Reference;
use ahash::{AHashMap, AHashSet};
use crossbeam::channel::{unbounded, Receiver, Sender};
use rayon::ThreadPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Location record of one indexed object. The reference is the only link into
/// the cell list.
#[derive(Debug)]
pub(crate) struct IndexedObject {
    pub(crate) category: ObjectCategory,
    pub(crate) position: Position,
    pub(crate) cell: CellCoord,
    pub(crate) active: bool,
    pub(crate) reference: Reference,
}

impl IndexedObject {
    pub(crate) fn snapshot(&self, guid: ObjectGuid) -> NearbyObject {
        NearbyObject { guid, category: self.category, position: self.position, cell: self.cell }
    }
}

#[derive(Debug)]
struct LoadResult {
    coord: GridCoord,
    result: GridResult<Vec<SpawnRecord>>,
}

/// What happened to the grid set during one `update`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub loaded: Vec<GridCoord>,
    pub unloaded: Vec<GridCoord>,
    pub despawned: Vec<ObjectGuid>,
    pub load_failures: usize,
    pub commands_processed: usize,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.loaded.extend(other.loaded);
        self.unloaded.extend(other.unloaded);
        self.despawned.extend(other.despawned);
        self.load_failures += other.load_failures;
        self.commands_processed += other.commands_processed;
    }

    pub fn is_quiet(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty() && self.despawned.is_empty() && self.load_failures == 0
    }
}

pub struct GridIndex {
    map_id: MapId,
    config: GridConfig,
    pub(crate) grids: AHashMap<GridCoord, Grid>,
    pub(crate) objects: AHashMap<ObjectGuid, IndexedObject>,
    active_objects: AHashSet<ObjectGuid>,
    loader: Arc<dyn GridLoader>,
    io_pool: Option<Arc<ThreadPool>>,
    load_tx: Sender<LoadResult>,
    load_rx: Receiver<LoadResult>,
    loads_in_flight: usize,
}

impl std::fmt::Debug for GridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridIndex")
            .field("map_id", &self.map_id)
            .field("grids", &self.grids.len())
            .field("objects", &self.objects.len())
            .field("loads_in_flight", &self.loads_in_flight)
            .finish()
    }
}

impl GridIndex {
    pub fn new(map_id: MapId, config: GridConfig, loader: Arc<dyn GridLoader>) -> Self {
        let (load_tx, load_rx) = unbounded();
        GridIndex {
            map_id,
            config,
            grids: AHashMap::new(),
            objects: AHashMap::new(),
            active_objects: AHashSet::new(),
            loader,
            io_pool: None,
            load_tx,
            load_rx,
            loads_in_flight: 0,
        }
    }

    /// Static content loads run on `pool` instead of inline.
    pub fn with_io_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.io_pool = Some(pool);
        self
    }

    pub fn map_id(&self) -> MapId {
        self.map_id
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn grid(&self, coord: GridCoord) -> Option<&Grid> {
        self.grids.get(&coord)
    }

    pub fn grid_mut(&mut self, coord: GridCoord) -> Option<&mut Grid> {
        self.grids.get_mut(&coord)
    }

    pub fn grid_state(&self, coord: GridCoord) -> GridState {
        self.grids.get(&coord).map_or(GridState::NotLoaded, Grid::state)
    }

    pub fn loaded_grid_count(&self) -> usize {
        self.grids.len()
    }

    pub fn grid_coords(&self) -> Vec<GridCoord> {
        self.grids.keys().copied().collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn loads_in_flight(&self) -> usize {
        self.loads_in_flight
    }

    pub fn contains(&self, guid: ObjectGuid) -> bool {
        self.objects.contains_key(&guid)
    }

    pub fn object(&self, guid: ObjectGuid) -> Option<NearbyObject> {
        self.objects.get(&guid).map(|o| o.snapshot(guid))
    }

    pub fn cell_of(&self, guid: ObjectGuid) -> Option<CellCoord> {
        self.objects.get(&guid).map(|o| o.cell)
    }

    fn clamp_grid(&self, coord: GridCoord) -> GridCoord {
        if coord.is_coord_valid() {
            return coord;
        }
        let clamped = coord.normalize();
        warn!(map_id = self.map_id, ?coord, ?clamped, "grid coordinate outside the map, clamped");
        clamped
    }

    fn cell_for(&self, position: &Position) -> GridResult<CellCoord> {
        if !is_valid_map_coord(position.x, position.y) {
            return Err(GridError::InvalidCoordinate { x: position.x, y: position.y });
        }
        let cell = compute_cell_coord(position.x, position.y);
        if cell.is_coord_valid() {
            return Ok(cell);
        }
        let clamped = cell.normalize();
        warn!(map_id = self.map_id, ?cell, ?clamped, "cell coordinate outside the map, clamped");
        Ok(clamped)
    }

    /// Makes sure the grid exists and is loading or active. Repeated calls are
    /// no-ops; a call on an unloading grid cancels the unload.
    pub fn ensure_loaded(&mut self, coord: GridCoord) -> GridState {
        let coord = self.clamp_grid(coord);
        let grid = self.grids.entry(coord).or_insert_with(|| Grid::new(coord));
        match grid.request_load() {
            LoadRequest::Started => self.issue_load(coord),
            LoadRequest::AlreadyLoaded => {}
            LoadRequest::UnloadCancelled => {
                debug!(map_id = self.map_id, ?coord, "pending unload cancelled by load request");
            }
        }
        self.grid_state(coord)
    }

    fn issue_load(&mut self, coord: GridCoord) {
        let loader = Arc::clone(&self.loader);
        let tx = self.load_tx.clone();
        let map_id = self.map_id;
        let job = move || {
            let result = loader.load_grid(map_id, coord);
            // The receiver lives as long as the index; a send failure only means the
            // map was dropped while loading.
            let _ = tx.send(LoadResult { coord, result });
        };

        self.loads_in_flight += 1;
        grid_metrics::record_grid_load_started(map_id);
        match (&self.io_pool, self.config.load_in_background) {
            (Some(pool), true) => pool.spawn(job),
            (None, true) => {
                debug!(map_id, ?coord, "no io pool attached, loading grid inline");
                job()
            }
            _ => job(),
        }
    }

    fn apply_load_results(&mut self, report: &mut TickReport) {
        while let Ok(LoadResult { coord, result }) = self.load_rx.try_recv() {
            self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
            if self.grid_state(coord) != GridState::Loading {
                warn!(map_id = self.map_id, ?coord, "load result for a grid that is not loading, dropped");
                continue;
            }
            match result {
                Ok(records) => {
                    let count = records.len();
                    for record in records {
                        self.spawn_static(coord, record);
                    }
                    if let Some(grid) = self.grids.get_mut(&coord) {
                        grid.finish_loading();
                    }
                    debug!(map_id = self.map_id, ?coord, spawns = count, "grid loaded");
                    report.loaded.push(coord);
                }
                Err(e) => {
                    error!(map_id = self.map_id, ?coord, error = %e, "grid load failed");
                    report.load_failures += 1;
                    let Some(grid) = self.grids.get_mut(&coord) else { continue };
                    if grid.is_empty() {
                        // Nothing linked yet: forget the grid so the next need retries.
                        self.grids.remove(&coord);
                    } else {
                        grid.finish_loading();
                    }
                }
            }
        }
    }

    fn spawn_static(&mut self, coord: GridCoord, record: SpawnRecord) {
        let guid = record.guid;
        match self.cell_for(&record.position) {
            Ok(cell) if cell.grid_coord() != coord => {
                warn!(map_id = self.map_id, %guid, ?coord, ?cell, "static spawn lies outside its grid, skipped");
                return;
            }
            Err(e) => {
                warn!(map_id = self.map_id, %guid, error = %e, "static spawn has invalid position, skipped");
                return;
            }
            Ok(_) => {}
        }
        if let Err(e) = self.spawn(record) {
            warn!(map_id = self.map_id, %guid, error = %e, "static spawn rejected");
        }
    }

    /// Links a new object into the cell at its position. The target grid is
    /// requested if it is not loaded yet.
    pub fn spawn(&mut self, record: SpawnRecord) -> GridResult<CellCoord> {
        let SpawnRecord { guid, category, position, active } = record;
        if self.objects.contains_key(&guid) {
            error!(map_id = self.map_id, %guid, "object spawned twice");
            return Err(GridError::DuplicateObject(guid).fail_loudly());
        }
        let cell = match self.cell_for(&position) {
            Ok(cell) => cell,
            Err(e) => {
                warn!(map_id = self.map_id, %guid, x = position.x, y = position.y, "spawn at invalid position rejected");
                return Err(e);
            }
        };
        let active = active || category == ObjectCategory::Player;

        let grid_coord = cell.grid_coord();
        self.ensure_loaded(grid_coord);
        let grid = self.grids.get_mut(&grid_coord).ok_or(GridError::GridNotLoaded(grid_coord))?;

        let mut reference = Reference::new();
        grid.link(cell, category, &mut reference, guid, active)?;
        self.objects.insert(guid, IndexedObject { category, position, cell, active, reference });
        if active {
            self.active_objects.insert(guid);
        }
        trace!(map_id = self.map_id, %guid, ?category, ?cell, "object spawned");
        Ok(cell)
    }

    /// Unlinks and forgets an object. Unknown guids are reported, not ignored.
    pub fn despawn(&mut self, guid: ObjectGuid) -> GridResult<()> {
        let Some(mut object) = self.objects.remove(&guid) else {
            return Err(GridError::UnknownObject(guid));
        };
        self.active_objects.remove(&guid);
        let grid_coord = object.cell.grid_coord();
        if let Some(grid) = self.grids.get_mut(&grid_coord) {
            grid.unlink(object.cell, object.category, &mut object.reference, object.active)?;
        }
        trace!(map_id = self.map_id, %guid, "object despawned");
        Ok(())
    }

    /// Moves an object to `position`, relinking it when the cell changes. An
    /// invalid position is rejected and the object keeps its current cell.
    pub fn relocate(&mut self, guid: ObjectGuid, position: Position) -> GridResult<CellCoord> {
        let new_cell = match self.cell_for(&position) {
            Ok(cell) => cell,
            Err(e) => {
                warn!(map_id = self.map_id, %guid, x = position.x, y = position.y, "relocation to invalid position rejected");
                return Err(e);
            }
        };
        let Some(old_cell) = self.objects.get(&guid).map(|o| o.cell) else {
            return Err(GridError::UnknownObject(guid));
        };

        if old_cell == new_cell {
            if let Some(object) = self.objects.get_mut(&guid) {
                object.position = position;
            }
            return Ok(new_cell);
        }

        let new_grid = new_cell.grid_coord();
        self.ensure_loaded(new_grid);

        let Some(object) = self.objects.get_mut(&guid) else {
            return Err(GridError::UnknownObject(guid));
        };
        if let Some(grid) = self.grids.get_mut(&old_cell.grid_coord()) {
            grid.unlink(old_cell, object.category, &mut object.reference, object.active)?;
        }
        let grid = self.grids.get_mut(&new_grid).ok_or(GridError::GridNotLoaded(new_grid))?;
        grid.link(new_cell, object.category, &mut object.reference, guid, object.active)?;
        object.cell = new_cell;
        object.position = position;

        grid_metrics::record_relocation(self.map_id);
        trace!(map_id = self.map_id, %guid, from = ?old_cell, to = ?new_cell, "object relocated");
        Ok(new_cell)
    }

    /// Marks an already spawned object as active or passive.
    pub fn set_active(&mut self, guid: ObjectGuid, active: bool) -> GridResult<()> {
        let object = self.objects.get_mut(&guid).ok_or(GridError::UnknownObject(guid))?;
        if object.active == active || object.category == ObjectCategory::Player {
            return Ok(());
        }
        let grid_coord = object.cell.grid_coord();
        let grid = self.grids.get_mut(&grid_coord).ok_or(GridError::GridNotLoaded(grid_coord))?;
        grid.unlink(object.cell, object.category, &mut object.reference, object.active)?;
        grid.link(object.cell, object.category, &mut object.reference, guid, active)?;
        object.active = active;
        if active {
            self.active_objects.insert(guid);
        } else {
            self.active_objects.remove(&guid);
        }
        Ok(())
    }

    /// Grids within visibility range of any active object.
    pub fn grids_in_proximity(&self) -> AHashSet<GridCoord> {
        let radius = self.config.visibility_distance;
        let mut needed = AHashSet::new();
        for guid in &self.active_objects {
            if let Some(object) = self.objects.get(guid) {
                needed.extend(CellArea::around(object.position.x, object.position.y, radius).grids());
            }
        }
        needed
    }

    /// Once-per-tick grid maintenance: apply finished loads, load grids near
    /// active objects, age idle grids and tear down the ones that qualify.
    pub fn update(&mut self, diff: Duration) -> TickReport {
        let mut report = TickReport::default();
        self.apply_load_results(&mut report);

        let needed = self.grids_in_proximity();
        let min_delay = self.config.min_grid_delay();
        let unload_enabled = self.config.grid_unload;
        let mut teardown = Vec::new();

        for (coord, grid) in self.grids.iter_mut() {
            if needed.contains(coord) {
                grid.mark_needed();
                continue;
            }
            match grid.state() {
                GridState::Active => {
                    if grid.tick_idle(diff, min_delay) && unload_enabled {
                        grid.begin_unloading();
                    }
                }
                GridState::Unloading => {
                    if grid.ready_for_teardown() {
                        teardown.push(*coord);
                    } else if !grid.can_unload() {
                        // An active object arrived without going through proximity.
                        grid.request_load();
                    }
                }
                GridState::Loading | GridState::NotLoaded => {}
            }
        }

        for coord in needed {
            self.ensure_loaded(coord);
        }

        for coord in teardown {
            self.unload_grid(coord, &mut report);
        }

        grid_metrics::record_grid_counts(self.map_id, self.grids.len(), self.objects.len());
        report
    }

    fn unload_grid(&mut self, coord: GridCoord, report: &mut TickReport) {
        let Some(mut grid) = self.grids.remove(&coord) else { return };
        for (_, _, guid) in grid.collect_objects() {
            if let Some(mut object) = self.objects.remove(&guid) {
                self.active_objects.remove(&guid);
                if let Err(e) = grid.unlink(object.cell, object.category, &mut object.reference, object.active) {
                    error!(map_id = self.map_id, %guid, error = %e, "unlink during grid teardown failed");
                }
                report.despawned.push(guid);
            }
        }
        grid.mark_not_loaded();
        report.unloaded.push(coord);
        grid_metrics::record_grid_unloaded(self.map_id);
        info!(map_id = self.map_id, ?coord, despawned = report.despawned.len(), "grid unloaded");
    }

    /// Snapshot of objects of `mask` within `radius` of `position`.
    pub fn nearby(&self, position: &Position, radius: f32, mask: CategoryMask) -> Vec<NearbyObject> {
        if !is_valid_map_coord(position.x, position.y) || !(radius >= 0.0) {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let area = CellArea::around(position.x, position.y, radius);
        let mut out = Vec::new();
        for cell in area.cells() {
            let Some(grid) = self.grids.get(&cell.grid_coord()) else { continue };
            let Some(cell_ref) = grid.get_cell(cell) else { continue };
            for category in mask.categories() {
                for guid in cell_ref.list(category).iter() {
                    let Some(object) = self.objects.get(guid) else { continue };
                    if object.position.distance_2d_sq(position) <= radius_sq {
                        out.push(object.snapshot(*guid));
                    }
                }
            }
        }
        out
    }
}

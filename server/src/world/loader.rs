// grid_map_server/server/src/world/loader.rs
//! Sources of static grid content (terrain spawns, fixed game objects).

use crate::core::error::{GridError, GridResult};
use crate::core::types::{GridCoord, MapId, SpawnRecord};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Produces the static spawns of one grid. Called from IO worker threads.
pub trait GridLoader: Send + Sync {
    fn load_grid(&self, map_id: MapId, coord: GridCoord) -> GridResult<Vec<SpawnRecord>>;
}

/// Reads `<root>/<map_id>/<gx>_<gy>.json`, a JSON array of spawn records.
/// A missing file means the grid has no static content.
#[derive(Debug, Clone)]
pub struct FileGridLoader {
    root: PathBuf,
}

impl FileGridLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileGridLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grid_path(&self, map_id: MapId, coord: GridCoord) -> PathBuf {
        self.root.join(map_id.to_string()).join(format!("{:02}_{:02}.json", coord.x, coord.y))
    }
}

impl GridLoader for FileGridLoader {
    fn load_grid(&self, map_id: MapId, coord: GridCoord) -> GridResult<Vec<SpawnRecord>> {
        let path = self.grid_path(map_id, coord);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(map_id, ?coord, "no spawn file for grid");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let records: Vec<SpawnRecord> = serde_json::from_str(&text)
            .map_err(|e| GridError::LoadFailed { coord, reason: format!("{}: {}", path.display(), e) })?;
        debug!(map_id, ?coord, count = records.len(), path = %path.display(), "loaded grid spawns");
        Ok(records)
    }
}

/// In-memory spawn table.
#[derive(Debug, Default)]
pub struct StaticGridLoader {
    spawns: RwLock<AHashMap<(MapId, GridCoord), Vec<SpawnRecord>>>,
    loads: AtomicUsize,
}

impl StaticGridLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, map_id: MapId, coord: GridCoord, record: SpawnRecord) {
        self.spawns.write().entry((map_id, coord)).or_default().push(record);
    }

    /// Number of `load_grid` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl GridLoader for StaticGridLoader {
    fn load_grid(&self, map_id: MapId, coord: GridCoord) -> GridResult<Vec<SpawnRecord>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.spawns.read().get(&(map_id, coord)).cloned().unwrap_or_default())
    }
}

// grid_map_server/server/src/server/map.rs
use crate::concurrent::work_queue::{MapCommand, MapWorkQueue};
use crate::core::config::GridConfig;
use crate::core::constants::MAX_COMMANDS_PER_TICK;
use crate::core::types::{CategoryMask, GridCoord, MapId, NearbyObject, ObjectGuid, Position, SpawnRecord};
use crate::operational::monitoring::metrics as grid_metrics;
use crate::world::grid_index::{GridIndex, TickReport};
use crate::world::loader::GridLoader;
use crossbeam::channel::{bounded, Receiver};
use rayon::ThreadPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Thread-safe front door to a map. Requests are queued and applied by the
/// map's owning worker at its next tick.
#[derive(Debug, Clone)]
pub struct MapHandle {
    map_id: MapId,
    queue: MapWorkQueue,
}

impl MapHandle {
    pub fn map_id(&self) -> MapId {
        self.map_id
    }

    pub fn send(&self, command: MapCommand) {
        self.queue.push(command);
    }

    pub fn ensure_loaded(&self, coord: GridCoord) {
        self.send(MapCommand::EnsureLoaded(coord));
    }

    pub fn spawn(&self, record: SpawnRecord) {
        self.send(MapCommand::Spawn(record));
    }

    pub fn despawn(&self, guid: ObjectGuid) {
        self.send(MapCommand::Despawn(guid));
    }

    pub fn relocate(&self, guid: ObjectGuid, position: Position) {
        self.send(MapCommand::Relocate { guid, position });
    }

    /// Queues a proximity query. The answer arrives on the returned channel once
    /// the map has ticked.
    pub fn query_nearby(&self, position: Position, radius: f32, mask: CategoryMask) -> Receiver<Vec<NearbyObject>> {
        let (reply, rx) = bounded(1);
        self.send(MapCommand::QueryNearby { position, radius, mask, reply });
        rx
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// One map: its grid index plus the queue of work posted from other threads.
#[derive(Debug)]
pub struct Map {
    id: MapId,
    index: GridIndex,
    queue: MapWorkQueue,
    ticks: u64,
}

impl Map {
    pub fn new(id: MapId, config: GridConfig, loader: Arc<dyn GridLoader>) -> Self {
        Map { id, index: GridIndex::new(id, config, loader), queue: MapWorkQueue::new(), ticks: 0 }
    }

    pub fn with_io_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.index = self.index.with_io_pool(pool);
        self
    }

    pub fn id(&self) -> MapId {
        self.id
    }

    pub fn handle(&self) -> MapHandle {
        MapHandle { map_id: self.id, queue: self.queue.clone() }
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut GridIndex {
        &mut self.index
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Applies queued commands, then advances grid lifecycles by `diff`.
    pub fn update(&mut self, diff: Duration) -> TickReport {
        let start = Instant::now();
        let commands = self.queue.pop_batch(MAX_COMMANDS_PER_TICK);
        let commands_processed = commands.len();
        for command in commands {
            self.execute(command);
        }

        let mut report = self.index.update(diff);
        report.commands_processed = commands_processed;
        self.ticks += 1;

        grid_metrics::record_tick_time(self.id, start.elapsed().as_secs_f64());
        if !report.is_quiet() {
            debug!(
                map_id = self.id,
                loaded = report.loaded.len(),
                unloaded = report.unloaded.len(),
                commands = commands_processed,
                "map tick"
            );
        }
        report
    }

    fn execute(&mut self, command: MapCommand) {
        let outcome = match command {
            MapCommand::EnsureLoaded(coord) => {
                self.index.ensure_loaded(coord);
                Ok(())
            }
            MapCommand::Spawn(record) => self.index.spawn(record).map(|_| ()),
            MapCommand::Despawn(guid) => self.index.despawn(guid),
            MapCommand::Relocate { guid, position } => self.index.relocate(guid, position).map(|_| ()),
            MapCommand::QueryNearby { position, radius, mask, reply } => {
                // The requester may have given up waiting.
                let _ = reply.send(self.index.nearby(&position, radius, mask));
                Ok(())
            }
        };
        match outcome {
            Err(e) if e.is_protocol_violation() => {
                error!(map_id = self.id, error = %e, "queued map command broke the linking protocol");
                e.fail_loudly();
            }
            Err(e) => warn!(map_id = self.id, error = %e, "queued map command failed"),
            Ok(()) => {}
        }
    }
}

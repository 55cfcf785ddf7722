// grid_map_server/server/src/concurrent/work_queue.rs
use crate::core::types::{CategoryMask, GridCoord, NearbyObject, ObjectGuid, Position, SpawnRecord};
use crossbeam::channel::Sender;
use crossbeam_queue::SegQueue;
use std::sync::Arc;

/// Work marshalled onto a map's owning worker. Executed in FIFO order at the
/// start of the map's next tick.
#[derive(Debug)]
pub enum MapCommand {
    EnsureLoaded(GridCoord),
    Spawn(SpawnRecord),
    Despawn(ObjectGuid),
    Relocate { guid: ObjectGuid, position: Position },
    QueryNearby {
        position: Position,
        radius: f32,
        mask: CategoryMask,
        reply: Sender<Vec<NearbyObject>>,
    },
}

// Lock-free multi-producer queue, drained only by the map's tick.
#[derive(Debug, Clone)]
pub struct MapWorkQueue {
    queue: Arc<SegQueue<MapCommand>>,
}

impl MapWorkQueue {
    pub fn new() -> Self {
        MapWorkQueue { queue: Arc::new(SegQueue::new()) }
    }

    pub fn push(&self, command: MapCommand) {
        self.queue.push(command);
    }

    pub fn pop(&self) -> Option<MapCommand> {
        self.queue.pop()
    }

    pub fn pop_batch(&self, max_count: usize) -> Vec<MapCommand> {
        let mut batch = Vec::with_capacity(max_count.min(self.queue.len()));
        while batch.len() < max_count {
            match self.queue.pop() {
                Some(command) => batch.push(command),
                None => break,
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl Default for MapWorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

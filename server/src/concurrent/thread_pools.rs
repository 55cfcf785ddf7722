// grid_map_server/server/src/concurrent/thread_pools.rs
use crate::core::config::ServerConfig;
use crate::core::error::{GridError, GridResult};
use crate::server::map::Map;
use crate::world::grid_index::TickReport;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct ThreadPoolSystem {
    /// Advances maps; each map is borrowed by exactly one worker per tick.
    pub map_pool: Arc<ThreadPool>,
    /// Static grid content loading.
    pub io_pool: Arc<ThreadPool>,
}

impl ThreadPoolSystem {
    pub fn new(config: &ServerConfig) -> GridResult<Self> {
        let map_pool = Self::create_pool("map-update", config.thread_pools.map_update_threads)?;
        let io_pool = Self::create_pool("grid-io", config.thread_pools.io_threads)?;
        info!(
            "Thread pools ready: {} map workers, {} io workers",
            map_pool.current_num_threads(),
            io_pool.current_num_threads()
        );
        Ok(ThreadPoolSystem { map_pool: Arc::new(map_pool), io_pool: Arc::new(io_pool) })
    }

    fn create_pool(name_str: &str, num_threads: usize) -> GridResult<ThreadPool> {
        let name = name_str.to_string();
        let threads = if num_threads == 0 {
            warn!("Thread pool '{}' configured with 0 threads. Creating a minimal pool.", name_str);
            1
        } else {
            num_threads
        };
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{}-{}", name, i))
            .build()
            .map_err(|e| GridError::Config(format!("Failed to build {} pool: {}", name_str, e)))
    }

    /// Ticks every map in parallel. Independent maps run concurrently; a single
    /// map is never split across workers.
    pub fn update_maps(&self, maps: &mut [Map], diff: Duration) -> Vec<TickReport> {
        self.map_pool.install(|| maps.par_iter_mut().map(|map| map.update(diff)).collect())
    }
}

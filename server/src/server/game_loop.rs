// grid_map_server/server/src/server/game_loop.rs
use super::map::{Map, MapHandle};
use crate::concurrent::thread_pools::ThreadPoolSystem;
use crate::core::config::ServerConfig;
use crate::core::constants::SLOW_TICK_LOG_MS;
use crate::core::error::GridResult;
use crate::core::types::MapId;
use crate::world::grid_index::TickReport;
use crate::world::loader::GridLoader;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Owns every map and advances them at the configured tick rate.
pub struct WorldServer {
    config: Arc<ServerConfig>,
    pools: ThreadPoolSystem,
    maps: Vec<Map>,
    frame_counter: u64,
}

impl WorldServer {
    pub fn new(config: Arc<ServerConfig>, loader: Arc<dyn GridLoader>) -> GridResult<Self> {
        config.validate()?;
        let pools = ThreadPoolSystem::new(&config)?;
        let maps = config
            .map_ids
            .iter()
            .map(|&id| Map::new(id, config.grid.clone(), Arc::clone(&loader)).with_io_pool(Arc::clone(&pools.io_pool)))
            .collect();
        info!("World server created with maps {:?}", config.map_ids);
        Ok(WorldServer { config, pools, maps, frame_counter: 0 })
    }

    pub fn handle(&self, map_id: MapId) -> Option<MapHandle> {
        self.maps.iter().find(|m| m.id() == map_id).map(Map::handle)
    }

    pub fn map(&self, map_id: MapId) -> Option<&Map> {
        self.maps.iter().find(|m| m.id() == map_id)
    }

    pub fn map_mut(&mut self, map_id: MapId) -> Option<&mut Map> {
        self.maps.iter_mut().find(|m| m.id() == map_id)
    }

    pub fn frame(&self) -> u64 {
        self.frame_counter
    }

    /// One synchronous step over all maps.
    pub fn tick(&mut self, diff: Duration) -> TickReport {
        let frame_start_time = Instant::now();
        let mut total = TickReport::default();
        for report in self.pools.update_maps(&mut self.maps, diff) {
            total.merge(report);
        }
        self.frame_counter += 1;

        let frame_time = frame_start_time.elapsed();
        if frame_time > Duration::from_millis(SLOW_TICK_LOG_MS) {
            warn!("Frame {} took too long: {:?}", self.frame_counter, frame_time);
        }
        total
    }

    /// Ticks until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let tick_duration = self.config.tick_duration();
        let mut tick_timer = interval(tick_duration);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick_time = Instant::now();
        tokio::pin!(shutdown);

        info!("World loop started. Tick rate: {}ms", tick_duration.as_millis());
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tick_timer.tick() => {
                    let now = Instant::now();
                    let diff = now.duration_since(last_tick_time);
                    last_tick_time = now;

                    // Map updates are CPU bound; keep them off the async workers.
                    let report = tokio::task::block_in_place(|| self.tick(diff));
                    if !report.is_quiet() {
                        debug!(
                            "Frame {}: {} grids loaded, {} unloaded, {} load failures",
                            self.frame_counter,
                            report.loaded.len(),
                            report.unloaded.len(),
                            report.load_failures
                        );
                    }
                    if self.frame_counter % (self.config.tick_rate * 60).max(1) == 0 {
                        let grids: usize = self.maps.iter().map(|m| m.index().loaded_grid_count()).sum();
                        info!("World loop running - Frame: {}, grids in memory: {}", self.frame_counter, grids);
                    }
                }
            }
        }
        info!("World loop stopped after {} frames.", self.frame_counter);
    }
}

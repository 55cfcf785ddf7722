// grid_map_server/server/src/core/config.rs
use crate::core::constants::{
    DEFAULT_VISIBILITY_DISTANCE, MAX_VISIBILITY_DISTANCE, MIN_GRID_DELAY, MIN_MAP_UPDATE_DELAY, SERVER_TICK_RATE,
};
use crate::core::error::{GridError, GridResult};
use crate::core::types::MapId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    pub map_update_threads: usize,
    pub io_threads: usize,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        ThreadPoolConfig {
            map_update_threads: num_cpus::get().clamp(1, 8),
            io_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Radius around each active player whose grids are kept loaded.
    pub visibility_distance: f32,
    /// When false, grids of this map never unload once active.
    pub grid_unload: bool,
    pub min_grid_delay_ms: u64,
    /// Load static grid content on the IO pool instead of inline.
    pub load_in_background: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            visibility_distance: DEFAULT_VISIBILITY_DISTANCE,
            grid_unload: true,
            min_grid_delay_ms: MIN_GRID_DELAY.as_millis() as u64,
            load_in_background: true,
        }
    }
}

impl GridConfig {
    pub fn min_grid_delay(&self) -> Duration {
        Duration::from_millis(self.min_grid_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub tick_rate: u64,
    pub map_ids: Vec<MapId>,
    pub grid: GridConfig,
    pub thread_pools: ThreadPoolConfig,
    pub spawn_data_dir: PathBuf,
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            tick_rate: SERVER_TICK_RATE,
            map_ids: vec![0, 1],
            grid: GridConfig::default(),
            thread_pools: ThreadPoolConfig::default(),
            spawn_data_dir: PathBuf::from("data/spawns"),
            metrics_port: None,
        }
    }
}

impl ServerConfig {
    pub fn from_yaml_str(text: &str) -> GridResult<Self> {
        let config: ServerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> GridResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> GridResult<()> {
        if self.tick_rate == 0 {
            return Err(GridError::Config("tick_rate must be greater than zero".into()));
        }
        if self.thread_pools.map_update_threads == 0 {
            return Err(GridError::Config("thread_pools.map_update_threads must be greater than zero".into()));
        }
        if !(self.grid.visibility_distance >= 0.0 && self.grid.visibility_distance <= MAX_VISIBILITY_DISTANCE) {
            return Err(GridError::Config(format!(
                "grid.visibility_distance must be within [0, {}], got {}",
                MAX_VISIBILITY_DISTANCE, self.grid.visibility_distance
            )));
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(1000 / self.tick_rate.max(1)).max(MIN_MAP_UPDATE_DELAY)
    }
}

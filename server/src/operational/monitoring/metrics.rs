// grid_map_server/server/src/operational/monitoring/metrics.rs
use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Instant;

use crate::core::types::MapId;

pub struct MetricsSystem {
    start_time: Instant,
}

impl MetricsSystem {
    pub fn new(port: u16) -> Result<Self> {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;

        describe_counter!("grid_loads_total", "Grids that entered the loading state");
        describe_counter!("grid_unloads_total", "Grids torn down after the idle delay");
        describe_counter!("object_relocations_total", "Objects that changed cell");
        describe_gauge!("grids_loaded", "Grids currently held in memory");
        describe_gauge!("objects_indexed", "Objects currently linked into a cell");
        describe_histogram!("map_tick_time_seconds", "Map update time in seconds");

        Ok(MetricsSystem { start_time: Instant::now() })
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

// Without an installed recorder these are no-ops, so library code and tests
// can call them unconditionally.

pub fn record_grid_load_started(map_id: MapId) {
    counter!("grid_loads_total", "map_id" => map_id.to_string()).increment(1);
}

pub fn record_grid_unloaded(map_id: MapId) {
    counter!("grid_unloads_total", "map_id" => map_id.to_string()).increment(1);
}

pub fn record_relocation(map_id: MapId) {
    counter!("object_relocations_total", "map_id" => map_id.to_string()).increment(1);
}

pub fn record_grid_counts(map_id: MapId, grids: usize, objects: usize) {
    gauge!("grids_loaded", "map_id" => map_id.to_string()).set(grids as f64);
    gauge!("objects_indexed", "map_id" => map_id.to_string()).set(objects as f64);
}

pub fn record_tick_time(map_id: MapId, duration: f64) {
    histogram!("map_tick_time_seconds", "map_id" => map_id.to_string()).record(duration);
}

// Logging setup
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "grid_map_server_core=info,grid_map_server=info,warn".into()))
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

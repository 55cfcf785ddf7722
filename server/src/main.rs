// grid_map_server/server/src/main.rs
use grid_map_server_core::core::config::ServerConfig;
use grid_map_server_core::operational::monitoring::metrics::{init_logging, MetricsSystem};
use grid_map_server_core::server::game_loop::WorldServer;
use grid_map_server_core::world::loader::FileGridLoader;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const CONFIG_ENV_VAR: &str = "GRID_MAP_SERVER_CONFIG";

fn config_path() -> Option<PathBuf> {
    std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV_VAR).ok()).map(PathBuf::from)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        if let Some(location) = panic_info.location() {
            eprintln!("Location: {}:{}:{}", location.file(), location.line(), location.column());
        }
        eprintln!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
    }));

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }

    info!("Grid map server starting up...");

    let config = match config_path() {
        Some(path) => ServerConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => {
            warn!("No configuration file given, using defaults");
            ServerConfig::default()
        }
    };
    let config = Arc::new(config);
    info!("Server configuration loaded. Tick rate: {}, maps: {:?}", config.tick_rate, config.map_ids);

    let metrics = match config.metrics_port {
        Some(port) => match MetricsSystem::new(port) {
            Ok(system) => {
                info!("Prometheus metrics served on 0.0.0.0:{}", port);
                Some(system)
            }
            Err(e) => {
                error!("Metrics disabled: {:?}", e);
                None
            }
        },
        None => None,
    };

    let loader = Arc::new(FileGridLoader::new(config.spawn_data_dir.clone()));
    info!("Static spawns read from {}", config.spawn_data_dir.display());

    let mut world = WorldServer::new(Arc::clone(&config), loader).context("World server initialization failed")?;

    world
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    match metrics {
        Some(system) => info!("Grid map server shut down after {:.0}s.", system.uptime_secs()),
        None => info!("Grid map server shut down."),
    }
    Ok(())
}

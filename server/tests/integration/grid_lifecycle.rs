// grid_map_server/server/tests/integration/grid_lifecycle.rs

use grid_map_server_core::core::config::GridConfig;
use grid_map_server_core::core::types::{GridCoord, ObjectCategory, ObjectGuid, Position, SpawnRecord};
use grid_map_server_core::server::map::Map;
use grid_map_server_core::world::grid::GridState;
use grid_map_server_core::world::grid_index::GridIndex;
use grid_map_server_core::world::loader::StaticGridLoader;

use rayon::ThreadPoolBuilder;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const CENTER: GridCoord = GridCoord { x: 32, y: 32 };

fn grid_config(background: bool) -> GridConfig {
    GridConfig { min_grid_delay_ms: 1_000, load_in_background: background, ..GridConfig::default() }
}

fn creature(guid: u64, x: f32, y: f32) -> SpawnRecord {
    SpawnRecord { guid: ObjectGuid(guid), category: ObjectCategory::Creature, position: Position::new(x, y), active: false }
}

fn idle_until_unloading(index: &mut GridIndex, coord: GridCoord) {
    index.update(Duration::from_millis(600));
    assert_eq!(index.grid_state(coord), GridState::Active);
    index.update(Duration::from_millis(500));
    assert_eq!(index.grid_state(coord), GridState::Unloading);
}

#[test]
fn concurrent_load_requests_load_once() {
    let loader = Arc::new(StaticGridLoader::new());
    loader.add(0, CENTER, creature(1, 20.0, 20.0));
    let mut map = Map::new(0, grid_config(false), loader.clone());

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let handle = map.handle();
            thread::spawn(move || {
                for _ in 0..10 {
                    handle.ensure_loaded(CENTER);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let report = map.update(Duration::ZERO);
    assert_eq!(report.commands_processed, 20);
    assert_eq!(report.loaded, vec![CENTER]);
    assert_eq!(map.index().loaded_grid_count(), 1);
    assert_eq!(loader.load_count(), 1);
    assert_eq!(map.index().object_count(), 1);
}

#[test]
fn idle_grid_unloads_after_delay() {
    let loader = Arc::new(StaticGridLoader::new());
    loader.add(0, CENTER, creature(1, 20.0, 20.0));
    let mut index = GridIndex::new(0, grid_config(false), loader);

    index.ensure_loaded(CENTER);
    index.update(Duration::ZERO);
    assert_eq!(index.grid_state(CENTER), GridState::Active);

    idle_until_unloading(&mut index, CENTER);

    let report = index.update(Duration::from_millis(50));
    assert_eq!(report.unloaded, vec![CENTER]);
    assert_eq!(report.despawned, vec![ObjectGuid(1)]);
    assert_eq!(index.grid_state(CENTER), GridState::NotLoaded);
    assert!(!index.contains(ObjectGuid(1)));
    assert_eq!(index.loaded_grid_count(), 0);
}

#[test]
fn reload_cancels_pending_unload_without_losing_objects() {
    let loader = Arc::new(StaticGridLoader::new());
    let mut index = GridIndex::new(0, grid_config(false), loader.clone());
    index.spawn(creature(5, 30.0, 30.0)).unwrap();
    index.update(Duration::ZERO);
    idle_until_unloading(&mut index, CENTER);

    assert_eq!(index.ensure_loaded(CENTER), GridState::Active);
    let report = index.update(Duration::from_millis(50));
    assert!(report.unloaded.is_empty());
    assert!(index.contains(ObjectGuid(5)));
    assert_eq!(index.grid(CENTER).unwrap().object_count(), 1);
    assert_eq!(loader.load_count(), 1);
}

#[test]
fn player_keeps_grid_loaded() {
    let mut index = GridIndex::new(0, grid_config(false), Arc::new(StaticGridLoader::new()));
    index.spawn(SpawnRecord {
        guid: ObjectGuid(1),
        category: ObjectCategory::Player,
        position: Position::new(250.0, 250.0),
        active: false,
    })
    .unwrap();
    for _ in 0..10 {
        index.update(Duration::from_secs(1));
    }
    assert_eq!(index.grid_state(CENTER), GridState::Active);
    assert_eq!(index.grid(CENTER).unwrap().live_count(), 1);

    index.despawn(ObjectGuid(1)).unwrap();
    idle_until_unloading(&mut index, CENTER);
}

#[test]
fn unload_lock_and_disabled_unloading_keep_grids() {
    let mut index = GridIndex::new(0, grid_config(false), Arc::new(StaticGridLoader::new()));
    index.ensure_loaded(CENTER);
    index.update(Duration::ZERO);
    index.grid_mut(CENTER).unwrap().set_unload_lock(true);
    index.update(Duration::from_secs(5));
    assert_eq!(index.grid_state(CENTER), GridState::Active);

    let config = GridConfig { grid_unload: false, ..grid_config(false) };
    let mut index = GridIndex::new(0, config, Arc::new(StaticGridLoader::new()));
    index.ensure_loaded(CENTER);
    index.update(Duration::ZERO);
    index.update(Duration::from_secs(5));
    index.update(Duration::from_secs(5));
    assert_eq!(index.grid_state(CENTER), GridState::Active);
}

#[test]
fn background_load_completes_on_later_tick() {
    let loader = Arc::new(StaticGridLoader::new());
    loader.add(0, CENTER, creature(9, 1.0, 1.0));
    let pool = Arc::new(ThreadPoolBuilder::new().num_threads(1).build().unwrap());
    let mut index = GridIndex::new(0, grid_config(true), loader).with_io_pool(pool);

    assert_eq!(index.ensure_loaded(CENTER), GridState::Loading);
    let deadline = Instant::now() + Duration::from_secs(5);
    while index.grid_state(CENTER) != GridState::Active {
        assert!(Instant::now() < deadline, "background load never completed");
        index.update(Duration::ZERO);
        thread::sleep(Duration::from_millis(5));
    }
    assert!(index.contains(ObjectGuid(9)));
    assert_eq!(index.loads_in_flight(), 0);
}

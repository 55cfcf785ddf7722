// grid_map_server/server/tests/integration/relocation.rs

use grid_map_server_core::core::config::GridConfig;
use grid_map_server_core::core::constants::SIZE_OF_GRIDS;
use grid_map_server_core::core::types::{CategoryMask, NearbyObject, ObjectCategory, ObjectGuid, Position, SpawnRecord};
use grid_map_server_core::server::map::Map;
use grid_map_server_core::world::coords::compute_cell_coord;
use grid_map_server_core::world::grid::GridState;
use grid_map_server_core::world::grid_index::GridIndex;
use grid_map_server_core::world::loader::StaticGridLoader;
use grid_map_server_core::GridError;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn index() -> GridIndex {
    let config = GridConfig { load_in_background: false, ..GridConfig::default() };
    GridIndex::new(0, config, Arc::new(StaticGridLoader::new()))
}

fn record(guid: u64, category: ObjectCategory, x: f32, y: f32) -> SpawnRecord {
    SpawnRecord { guid: ObjectGuid(guid), category, position: Position::new(x, y), active: false }
}

#[test]
fn relocated_object_is_visited_once_across_both_cells() {
    let mut index = index();
    let a = index.spawn(record(1, ObjectCategory::Creature, 10.0, 10.0)).unwrap();
    index.spawn(record(2, ObjectCategory::Creature, 12.0, 10.0)).unwrap();
    let b = compute_cell_coord(80.0, 10.0);
    index.spawn(record(3, ObjectCategory::Creature, 80.0, 10.0)).unwrap();
    assert_ne!(a, b);

    let mut visits: Vec<ObjectGuid> = Vec::new();
    let visited = index.visit_cells([a, b], CategoryMask::all(), &mut |idx: &mut GridIndex, obj: &NearbyObject| {
        visits.push(obj.guid);
        if obj.cell == a {
            idx.relocate(obj.guid, Position::new(80.0, 12.0)).unwrap();
        }
    });

    visits.sort();
    assert_eq!(visits, vec![ObjectGuid(1), ObjectGuid(2), ObjectGuid(3)]);
    assert_eq!(visited, 3);
    for guid in [1, 2, 3] {
        assert_eq!(index.cell_of(ObjectGuid(guid)), Some(b));
    }
    let grid = index.grid(b.grid_coord()).unwrap();
    assert_eq!(grid.get_cell(b).unwrap().count(ObjectCategory::Creature), 3);
    assert!(grid.get_cell(a).unwrap().is_empty());
}

#[test]
fn relocation_across_grid_border_loads_target() {
    let mut index = index();
    index.spawn(record(1, ObjectCategory::Player, 10.0, 10.0)).unwrap();
    let far = Position::new(SIZE_OF_GRIDS * 3.5, 10.0);
    let cell = index.relocate(ObjectGuid(1), far).unwrap();
    assert_ne!(index.grid_state(cell.grid_coord()), GridState::NotLoaded);
    assert_eq!(index.grid(cell.grid_coord()).unwrap().live_count(), 1);

    index.update(Duration::ZERO);
    assert_eq!(index.grid_state(cell.grid_coord()), GridState::Active);
    let origin = compute_cell_coord(10.0, 10.0).grid_coord();
    assert_eq!(index.grid(origin).unwrap().live_count(), 0);
}

#[test]
fn invalid_move_is_rejected_and_object_stays() {
    let mut index = index();
    let cell = index.spawn(record(4, ObjectCategory::Creature, -100.0, 50.0)).unwrap();
    for bad in [Position::new(f32::INFINITY, 0.0), Position::new(0.0, -1.0e6)] {
        assert!(matches!(index.relocate(ObjectGuid(4), bad), Err(GridError::InvalidCoordinate { .. })));
    }
    assert_eq!(index.cell_of(ObjectGuid(4)), Some(cell));
    let snapshot = index.object(ObjectGuid(4)).unwrap();
    assert_eq!(snapshot.position, Position::new(-100.0, 50.0));
    assert!(matches!(index.relocate(ObjectGuid(77), Position::new(0.0, 0.0)), Err(GridError::UnknownObject(_))));
}

#[test]
fn move_within_cell_updates_position_only() {
    let mut index = index();
    let cell = index.spawn(record(5, ObjectCategory::GameObject, 1.0, 1.0)).unwrap();
    assert_eq!(index.relocate(ObjectGuid(5), Position::new(2.0, 2.0)).unwrap(), cell);
    assert_eq!(index.object(ObjectGuid(5)).unwrap().position, Position::new(2.0, 2.0));
    assert_eq!(index.grid(cell.grid_coord()).unwrap().get_cell(cell).unwrap().len(), 1);
}

#[test]
fn queued_moves_and_queries_from_other_threads() {
    let config = GridConfig { load_in_background: false, ..GridConfig::default() };
    let mut map = Map::new(3, config, Arc::new(StaticGridLoader::new()));
    let handle = map.handle();

    let producer = {
        let handle = handle.clone();
        thread::spawn(move || {
            handle.spawn(record(1, ObjectCategory::Player, 0.0, 0.0));
            handle.spawn(record(2, ObjectCategory::Creature, 200.0, 0.0));
            handle.relocate(ObjectGuid(2), Position::new(5.0, 5.0));
        })
    };
    producer.join().unwrap();

    let reply = handle.query_nearby(Position::new(0.0, 0.0), 20.0, CategoryMask::CREATURE);
    map.update(Duration::from_millis(50));

    let found = reply.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].guid, ObjectGuid(2));
    assert_eq!(found[0].category, ObjectCategory::Creature);
}

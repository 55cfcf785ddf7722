// grid_map_server/server/tests/performance/visit_stress.rs

use grid_map_server_core::core::config::GridConfig;
use grid_map_server_core::core::types::{CategoryMask, NearbyObject, ObjectCategory, ObjectGuid, Position, SpawnRecord};
use grid_map_server_core::world::coords::CellArea;
use grid_map_server_core::world::grid_index::GridIndex;
use grid_map_server_core::world::loader::StaticGridLoader;

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

const OBJECTS: u64 = 2_000;
const ROUNDS: usize = 200;
const SPREAD: f32 = 600.0;

fn populate(rng: &mut StdRng) -> GridIndex {
    let config = GridConfig { load_in_background: false, min_grid_delay_ms: 500, ..GridConfig::default() };
    let mut index = GridIndex::new(0, config, Arc::new(StaticGridLoader::new()));
    for guid in 0..OBJECTS {
        // Players would pin their grids in memory.
        let category = match ObjectCategory::ALL[rng.gen_range(0..ObjectCategory::COUNT)] {
            ObjectCategory::Player => ObjectCategory::Creature,
            other => other,
        };
        let position = Position::new(rng.gen_range(-SPREAD..SPREAD), rng.gen_range(-SPREAD..SPREAD));
        index.spawn(SpawnRecord { guid: ObjectGuid(guid), category, position, active: false }).unwrap();
    }
    index
}

fn assert_consistent(index: &GridIndex) {
    let linked: usize = index.grid_coords().into_iter().filter_map(|c| index.grid(c)).map(|g| g.object_count()).sum();
    assert_eq!(linked, index.object_count());
    for coord in index.grid_coords() {
        assert!(!index.grid(coord).unwrap().is_being_visited());
    }
}

#[test]
fn random_mutation_during_visits_keeps_index_consistent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut index = populate(&mut rng);
    let mut next_guid = OBJECTS;
    let start = Instant::now();

    for round in 0..ROUNDS {
        let center = Position::new(rng.gen_range(-SPREAD..SPREAD), rng.gen_range(-SPREAD..SPREAD));
        let area = CellArea::around(center.x, center.y, rng.gen_range(0.0..200.0));
        let mut seen = AHashSet::new();
        let mut actions = StdRng::seed_from_u64(round as u64);

        index.visit_area(area, CategoryMask::all(), &mut |idx: &mut GridIndex, obj: &NearbyObject| {
            assert!(seen.insert(obj.guid), "{} visited twice", obj.guid);
            match actions.gen_range(0..4) {
                0 => {
                    idx.despawn(obj.guid).unwrap();
                }
                1 => {
                    let to = Position::new(actions.gen_range(-SPREAD..SPREAD), actions.gen_range(-SPREAD..SPREAD));
                    idx.relocate(obj.guid, to).unwrap();
                }
                2 => {
                    idx.spawn(SpawnRecord {
                        guid: ObjectGuid(next_guid),
                        category: obj.category,
                        position: obj.position,
                        active: false,
                    })
                    .unwrap();
                    next_guid += 1;
                }
                _ => {}
            }
        });

        if round % 20 == 0 {
            index.update(Duration::from_millis(50));
        }
        assert_consistent(&index);
    }

    println!("{} visit rounds over {} objects took {:?}", ROUNDS, index.object_count(), start.elapsed());
}

#[test]
fn idle_maps_shed_all_grids() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut index = populate(&mut rng);
    index.update(Duration::ZERO);
    assert!(index.loaded_grid_count() > 0);

    for _ in 0..3 {
        index.update(Duration::from_millis(500));
    }
    assert_eq!(index.loaded_grid_count(), 0);
    assert_eq!(index.object_count(), 0);
}

// grid_map_server/server/benches/cell_visit.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_map_server_core::core::config::GridConfig;
use grid_map_server_core::core::types::{CategoryMask, NearbyObject, ObjectCategory, ObjectGuid, Position, SpawnRecord};
use grid_map_server_core::world::coords::{compute_cell_coord, compute_grid_coord};
use grid_map_server_core::world::grid_index::GridIndex;
use grid_map_server_core::world::loader::StaticGridLoader;
use std::sync::Arc;

fn crowded_index(objects: u64) -> GridIndex {
    let config = GridConfig { load_in_background: false, ..GridConfig::default() };
    let mut index = GridIndex::new(0, config, Arc::new(StaticGridLoader::new()));
    for guid in 0..objects {
        let category = ObjectCategory::ALL[(guid as usize) % ObjectCategory::COUNT];
        let offset = (guid % 60) as f32;
        index
            .spawn(SpawnRecord {
                guid: ObjectGuid(guid),
                category,
                position: Position::new(1.0 + offset, 1.0 + offset * 0.5),
                active: false,
            })
            .expect("spawn");
    }
    index
}

fn bench_coordinate_mapping(c: &mut Criterion) {
    c.bench_function("compute_cell_and_grid", |b| {
        b.iter(|| {
            let cell = compute_cell_coord(black_box(1234.5), black_box(-987.25));
            let grid = compute_grid_coord(black_box(1234.5), black_box(-987.25));
            black_box((cell, grid))
        })
    });
}

fn bench_neighborhood_visit(c: &mut Criterion) {
    let mut group = c.benchmark_group("visit_neighborhood");
    for &objects in &[100u64, 1_000, 10_000] {
        let mut index = crowded_index(objects);
        let center = compute_cell_coord(10.0, 10.0);
        group.bench_with_input(BenchmarkId::from_parameter(objects), &objects, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                index.visit_neighborhood(center, CategoryMask::all(), &mut |_: &mut GridIndex, obj: &NearbyObject| {
                    sum = sum.wrapping_add(obj.guid.0);
                });
                black_box(sum)
            })
        });
    }
    group.finish();
}

fn bench_relocation(c: &mut Criterion) {
    let mut index = crowded_index(1_000);
    let mut flip = false;
    c.bench_function("relocate_across_cells", |b| {
        b.iter(|| {
            flip = !flip;
            let x = if flip { 100.0 } else { 5.0 };
            black_box(index.relocate(ObjectGuid(0), Position::new(x, 5.0)).expect("relocate"))
        })
    });
}

criterion_group!(benches, bench_coordinate_mapping, bench_neighborhood_visit, bench_relocation);
criterion_main!(benches);

//! Benchmarks for naive, single-tree and dual-tree neighbor search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use oxiknn::{KnnModel, PointSet, TreeType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn random_points(n: usize, dim: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let pts: Vec<Vec<f64>> = (0..n).map(|_| (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect()).collect();
    PointSet::from_points(&pts).unwrap()
}

/// Benchmark tree construction for every tree type
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.measurement_time(Duration::from_secs(5));

    let references = random_points(2000, 3, 1);
    group.throughput(Throughput::Elements(references.len() as u64));
    for tree_type in TreeType::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(tree_type), &references, |b, refs| {
            b.iter(|| {
                let mut model = KnnModel::new(tree_type, false);
                model.build_model(refs.clone(), 20, false, false).unwrap();
                black_box(model);
            });
        });
    }

    group.finish();
}

/// Benchmark query search in each mode for every tree type
fn bench_search_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.measurement_time(Duration::from_secs(5));

    let references = random_points(2000, 3, 2);
    let queries = random_points(200, 3, 3);
    group.throughput(Throughput::Elements(queries.len() as u64));

    for tree_type in TreeType::ALL {
        for (label, naive, single) in [("naive", true, false), ("single", false, true), ("dual", false, false)] {
            let mut model = KnnModel::new(tree_type, false);
            model.build_model(references.clone(), 20, naive, single).unwrap();
            group.bench_function(BenchmarkId::new(label, tree_type), |b| {
                b.iter(|| black_box(model.search(&queries, 5).unwrap()));
            });
        }
    }

    group.finish();
}

/// Benchmark all-k-nearest-neighbors over the reference set
fn bench_self_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("self_search");
    group.measurement_time(Duration::from_secs(5));

    let references = random_points(1000, 2, 4);
    for tree_type in [TreeType::KdTree, TreeType::BallTree, TreeType::CoverTree] {
        let mut model = KnnModel::new(tree_type, false);
        model.build_model(references.clone(), 20, false, false).unwrap();
        group.bench_function(BenchmarkId::from_parameter(tree_type), |b| {
            b.iter(|| black_box(model.search_self(3).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_search_modes, bench_self_search);
criterion_main!(benches);

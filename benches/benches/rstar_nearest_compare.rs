// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sapling_geom::Vector;
use sapling_tree::Tree;

use rstar::RTree;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_points(count: usize, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| {
            [
                rng.next_f64() * 100.0,
                rng.next_f64() * 100.0,
                rng.next_f64() * 100.0,
            ]
        })
        .collect()
}

fn bench_rstar_nearest_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rstar_nearest_compare");
    for &n in &[1_000usize, 10_000] {
        let points = gen_points(n, 0xCAFE_F00D_DEAD_BEEF);
        let queries = gen_points(256, 0xC1A5_7E55_9999_ABCD);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("sapling_incremental_build_n{n}"), |b| {
            b.iter_batched(
                Tree::new,
                |mut tree| {
                    for p in &points {
                        let id = tree.create(*p).unwrap();
                        tree.index_insert(id).unwrap();
                    }
                    black_box(tree.index_len());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("rstar_incremental_build_n{n}"), |b| {
            b.iter_batched(
                RTree::<[f64; 3]>::new,
                |mut tree| {
                    for p in &points {
                        tree.insert(*p);
                    }
                    black_box(tree.size());
                },
                BatchSize::SmallInput,
            );
        });

        let mut sapling = Tree::new();
        for p in &points {
            let id = sapling.create(*p).unwrap();
            sapling.index_insert(id).unwrap();
        }
        let rtree = RTree::bulk_load(points.clone());
        let sapling_queries: Vec<Vector> = queries.iter().copied().map(Vector::from).collect();

        group.bench_function(format!("sapling_nearest_n{n}"), |b| {
            b.iter(|| {
                for q in &sapling_queries {
                    black_box(sapling.nearest(q).unwrap());
                }
            });
        });

        group.bench_function(format!("rstar_nearest_n{n}"), |b| {
            b.iter(|| {
                for q in &queries {
                    black_box(rtree.nearest_neighbor(q));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rstar_nearest_compare);
criterion_main!(benches);

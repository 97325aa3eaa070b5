// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sapling_geom::Vector;
use sapling_tree::{NodeId, Tree};

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

fn gen_points(count: usize, extent: f64, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| {
            [
                rng.next_f64() * extent,
                rng.next_f64() * extent,
                rng.next_f64() * extent,
            ]
        })
        .collect()
}

/// Grow a planner-shaped tree: every point hangs off its nearest predecessor.
fn grow(points: &[[f64; 3]]) -> (Tree, Vec<NodeId>) {
    let mut tree = Tree::new();
    let mut ids = Vec::with_capacity(points.len());
    let origin = tree.add_origin(points[0]).unwrap();
    ids.push(origin);
    for p in &points[1..] {
        let parent = tree.nearest(&Vector::from(*p)).unwrap().unwrap().id;
        ids.push(tree.add_child(parent, *p).unwrap());
    }
    (tree, ids)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("kd_insert");
    for &n in &[1_000usize, 10_000] {
        let points = gen_points(n, 100.0, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("insert_n{n}"), |b| {
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
        group.bench_function(format!("grow_planner_n{n}"), |b| {
            b.iter(|| black_box(grow(&points).0.len()));
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("kd_query");
    for &n in &[1_000usize, 10_000] {
        let points = gen_points(n, 100.0, 0xBADC_F00D_1234_5678);
        let (tree, _) = grow(&points);
        let queries: Vec<Vector> = gen_points(256, 100.0, 0xC1A5_7E55_9999_ABCD)
            .into_iter()
            .map(Vector::from)
            .collect();
        group.throughput(Throughput::Elements(queries.len() as u64));

        group.bench_function(format!("nearest_indexed_n{n}"), |b| {
            b.iter(|| {
                for q in &queries {
                    black_box(tree.nearest(q).unwrap());
                }
            });
        });
        group.bench_function(format!("nearest_brute_force_n{n}"), |b| {
            b.iter(|| {
                for q in &queries {
                    black_box(tree.nearest_brute_force(q).unwrap());
                }
            });
        });
        group.bench_function(format!("range_indexed_r5_n{n}"), |b| {
            b.iter(|| {
                let hits: usize = queries
                    .iter()
                    .map(|q| tree.range_search(q, 5.0).unwrap().len())
                    .sum();
                black_box(hits);
            });
        });
        group.bench_function(format!("range_brute_force_r5_n{n}"), |b| {
            b.iter(|| {
                let hits: usize = queries
                    .iter()
                    .map(|q| tree.range_search_brute_force(q, 5.0).unwrap().len())
                    .sum();
                black_box(hits);
            });
        });
    }
    group.finish();
}

fn bench_deletion(c: &mut Criterion) {
    let mut group = c.benchmark_group("kd_delete");
    let n = 2_000usize;
    let points = gen_points(n, 100.0, 0xDEAD_BEEF_0BAD_CAFE);
    let (tree, ids) = grow(&points);
    // Every other non-origin node.
    let victims: Vec<NodeId> = ids[1..].iter().copied().step_by(2).collect();
    group.throughput(Throughput::Elements(victims.len() as u64));

    group.bench_function(format!("index_remove_half_n{n}"), |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                for &id in &victims {
                    tree.index_remove(id).unwrap();
                }
                black_box(tree.index_len());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function(format!("index_reconstruct_half_n{n}"), |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                for &id in &victims {
                    tree.index_reconstruct(id).unwrap();
                }
                black_box(tree.index_len());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function(format!("remove_branch_children_of_origin_n{n}"), |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                let origin = tree.origin().unwrap();
                let children = tree.children(origin).unwrap().to_vec();
                for child in children {
                    tree.remove_branch(child).unwrap();
                }
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_queries, bench_deletion);
criterion_main!(benches);

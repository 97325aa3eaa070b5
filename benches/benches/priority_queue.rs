// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
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

/// Unqueued nodes with random costs; states are irrelevant to the queue.
fn setup(n: usize, seed: u64) -> (Tree, Vec<NodeId>) {
    let mut rng = Rng::new(seed);
    let mut tree = Tree::new();
    let ids = (0..n)
        .map(|_| {
            let id = tree.create([0.0, 0.0, 0.0]).unwrap();
            tree.set_cost(id, rng.next_f64() * 1_000.0).unwrap();
            id
        })
        .collect();
    (tree, ids)
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_queue");
    for &n in &[1_000usize, 10_000] {
        let (tree, ids) = setup(n, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("push_drain_n{n}"), |b| {
            b.iter_batched(
                || tree.clone(),
                |mut tree| {
                    for &id in &ids {
                        tree.push(id).unwrap();
                    }
                    while let Some(id) = tree.pop_min() {
                        black_box(id);
                    }
                },
                BatchSize::SmallInput,
            );
        });

        let mut queued = tree.clone();
        for &id in &ids {
            queued.push(id).unwrap();
        }
        group.bench_function(format!("update_key_n{n}"), |b| {
            b.iter_batched(
                || (queued.clone(), Rng::new(0xBADC_F00D_1234_5678)),
                |(mut tree, mut rng)| {
                    for &id in &ids {
                        tree.set_cost(id, rng.next_f64() * 1_000.0).unwrap();
                        tree.update_key(id).unwrap();
                    }
                    black_box(tree.peek_min());
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("remove_arbitrary_n{n}"), |b| {
            b.iter_batched(
                || queued.clone(),
                |mut tree| {
                    for &id in ids.iter().rev() {
                        tree.remove_from_queue(id).unwrap();
                    }
                    black_box(tree.queue_len());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queue);
criterion_main!(benches);

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! KD-tree basics.
//!
//! Index four points, run nearest and radius queries, then remove points
//! with both deletion strategies.
//!
//! Run:
//! - `cargo run -p sapling_demos --example kd_basics`

use sapling_geom::Vector;
use sapling_tree::{Membership, Tree};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let mut tree = Tree::new();
    let ids: Vec<_> = [
        [0.0, 0.0, 0.0],
        [1.0, 1.0, 1.0],
        [2.0, 0.0, 0.0],
        [0.0, 2.0, 0.0],
    ]
    .into_iter()
    .map(|p| {
        let id = tree.create(p).unwrap();
        tree.index_insert(id).unwrap();
        id
    })
    .collect();

    for &id in &ids {
        let node = tree.node(id).unwrap();
        println!(
            "{:?} at {} splits on axis {}",
            id,
            node.state(),
            node.split_dim()
        );
    }

    let query = Vector::from([1.1, 1.0, 1.0]);
    let hit = tree.nearest(&query).unwrap().unwrap();
    println!("nearest to {query}: {:?} (distance {:.3})", hit.id, hit.distance);
    assert_eq!(hit.id, ids[1]);

    let origin = Vector::zeros(3);
    for radius in [1.5, 1.8] {
        let near = tree.range_search(&origin, radius).unwrap();
        println!("within {radius} of {origin}: {near:?}");
    }

    // In-place removal keeps the rest of the tree where it was.
    tree.index_remove(ids[1]).unwrap();
    assert!(!tree.membership(ids[1]).unwrap().contains(Membership::INDEXED));
    // Reconstruction reinserts everything below the removed node.
    tree.index_reconstruct(ids[0]).unwrap();
    println!(
        "after removals: root {:?}, {} indexed",
        tree.index_root(),
        tree.index_len()
    );
    tree.validate().unwrap();
}

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Planner-style growth.
//!
//! Grow an RRT*-like tree in the unit square: steer toward random samples,
//! pick the cheapest parent among neighbors, rewire, keep a cost-ordered
//! frontier, and prune a branch.
//!
//! Run:
//! - `cargo run -p sapling_demos --example planner_growth`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sapling_geom::Vector;
use sapling_tree::{Membership, NodeId, Tree, TreeConfig};

const STEP: f64 = 0.05;
const NEIGHBOR_RADIUS: f64 = 0.12;
const SAMPLES: usize = 2_000;

fn steer(from: &Vector, toward: &Vector) -> Vector {
    let delta = toward.checked_sub(from).unwrap();
    let len = delta.norm();
    if len <= STEP {
        toward.clone()
    } else {
        from.checked_add(&delta.scaled(STEP / len)).unwrap()
    }
}

fn edge_cost(tree: &Tree, a: NodeId, b: NodeId) -> f64 {
    let sa = tree.node(a).unwrap().state();
    let sb = tree.node(b).unwrap().state();
    sa.distance(sb).unwrap()
}

/// Recompute costs below `id` after it was rewired.
fn propagate_costs(tree: &mut Tree, id: NodeId) {
    let mut stack = vec![id];
    while let Some(n) = stack.pop() {
        let base = tree.node(n).unwrap().cost();
        let children = tree.children(n).unwrap().to_vec();
        for c in children {
            tree.set_cost(c, base + edge_cost(tree, n, c)).unwrap();
            if tree.membership(c).unwrap().contains(Membership::QUEUED) {
                tree.update_key(c).unwrap();
            }
            stack.push(c);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut rng = StdRng::seed_from_u64(0x5A91_1265);
    let mut tree = Tree::with_config(TreeConfig::with_dims(2)).unwrap();
    let origin = tree.add_origin([0.5, 0.5]).unwrap();
    let mut rewires = 0_usize;

    for _ in 0..SAMPLES {
        let sample = Vector::from([rng.random_range(0.0..1.0), rng.random_range(0.0..1.0)]);
        let nearest = tree.nearest(&sample).unwrap().unwrap();
        let state = steer(tree.node(nearest.id).unwrap().state(), &sample);

        // Cheapest parent among the neighborhood.
        let neighbors = tree.range_search(&state, NEIGHBOR_RADIUS).unwrap();
        let mut best = (nearest.id, f64::INFINITY);
        for &n in &neighbors {
            let node = tree.node(n).unwrap();
            let cost = node.cost() + node.state().distance(&state).unwrap();
            if cost < best.1 {
                best = (n, cost);
            }
        }
        if best.1.is_infinite() {
            let node = tree.node(nearest.id).unwrap();
            best.1 = node.cost() + node.state().distance(&state).unwrap();
        }

        let id = tree.add_child(best.0, state).unwrap();
        tree.set_cost(id, best.1).unwrap();
        tree.push(id).unwrap();

        // Rewire neighbors that are cheaper to reach through the new node.
        for n in neighbors {
            if n == best.0 || n == origin {
                continue;
            }
            let through_new = best.1 + edge_cost(&tree, id, n);
            if through_new < tree.node(n).unwrap().cost() && tree.reparent(n, id).is_ok() {
                tree.set_cost(n, through_new).unwrap();
                if tree.membership(n).unwrap().contains(Membership::QUEUED) {
                    tree.update_key(n).unwrap();
                }
                propagate_costs(&mut tree, n);
                rewires += 1;
            }
        }
    }

    println!(
        "grew {} nodes ({} rewires), {} on the frontier",
        tree.len(),
        rewires,
        tree.queue_len()
    );
    for _ in 0..3 {
        if let Some(id) = tree.pop_min() {
            let node = tree.node(id).unwrap();
            println!("cheapest frontier node {:?} at {} cost {:.3}", id, node.state(), node.cost());
        }
    }

    // Prune the first branch of the origin.
    if let Some(&branch) = tree.children(origin).unwrap().first() {
        let freed = tree.remove_branch(branch).unwrap();
        println!("pruned branch {branch:?}: {freed} nodes freed, {} remain", tree.len());
    }
    tree.validate().unwrap();
}

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sapling Tree: an incremental KD-tree and an addressable priority queue over one node arena.
//!
//! Sapling Tree is the bookkeeping core for tree-growing search algorithms such as
//! sampling-based motion planners (RRT, RRT*, FMT).
//!
//! - Stores nodes in a generational arena; [`NodeId`]s are small copyable handles.
//! - Indexes node coordinates in a KD-tree for nearest-neighbor and radius queries.
//! - Orders candidate nodes by a caller-assigned cost in a binary heap that supports
//!   removal and re-keying of arbitrary members.
//! - Links nodes into a logical parent/child tree rooted at an *origin*, and removes
//!   whole branches from all three structures at once.
//!
//! It does not sample, check collisions, or compute path costs.
//! Callers decide where points go and what they cost; this crate keeps the
//! structures consistent.
//!
//! ## API overview
//!
//! - [`Tree`]: owns the arena and every structure; all operations are methods on it.
//! - [`NodeRecord`]: read-only view of one node (state, cost, links).
//! - [`TreeConfig`]: dimensionality, traversal step bound and cost tolerance.
//! - [`Membership`]: which structures a node currently belongs to.
//! - [`TreeError`]: every failure, with [`Violation`] and [`Corruption`] detail.
//!
//! Key operations:
//! - [`Tree::add_origin`] / [`Tree::add_child`]: create, link and index in one call.
//! - [`Tree::nearest`] and [`Tree::range_search`] (plus `_from` variants that search a subtree).
//! - [`Tree::push`], [`Tree::pop_min`], [`Tree::update_key`], [`Tree::remove_from_queue`].
//! - [`Tree::index_remove`] (in-place) and [`Tree::index_reconstruct`] (reinsert subtree).
//! - [`Tree::remove_branch`] and [`Tree::reset`].
//! - [`Tree::validate`] checks every invariant; useful in tests and after heavy churn.
//!
//! ## KD-tree shape
//!
//! Points are inserted in arrival order without rebalancing, so the depth depends on
//! the input. All traversals are iterative and bounded: a single descent may take at
//! most [`TreeConfig::max_iterations`] steps, and a whole-subtree walk at most
//! `2 * len + 2`. Exceeding a bound reports [`Corruption::StepLimit`] rather than
//! looping or overflowing the stack.
//!
//! ## Example
//!
//! ```
//! use sapling_geom::Vector;
//! use sapling_tree::Tree;
//!
//! let mut tree = Tree::new();
//! let origin = tree.add_origin([0.0, 0.0, 0.0]).unwrap();
//! let a = tree.add_child(origin, [1.0, 1.0, 1.0]).unwrap();
//! let b = tree.add_child(origin, [2.0, 0.0, 0.0]).unwrap();
//! let _c = tree.add_child(a, [0.0, 2.0, 0.0]).unwrap();
//!
//! let hit = tree.nearest(&Vector::from([1.1, 1.0, 1.0])).unwrap().unwrap();
//! assert_eq!(hit.id, a);
//!
//! // Expand the cheapest frontier node first.
//! tree.set_cost(a, 1.7).unwrap();
//! tree.set_cost(b, 2.0).unwrap();
//! tree.push(b).unwrap();
//! tree.push(a).unwrap();
//! assert_eq!(tree.pop_min(), Some(a));
//!
//! // Dropping `a` takes its child with it.
//! assert_eq!(tree.remove_branch(a).unwrap(), 2);
//! assert_eq!(tree.len(), 2);
//! tree.validate().unwrap();
//! ```
//!
//! ### Float semantics
//!
//! Coordinates and costs are assumed finite. Costs closer than
//! [`TreeConfig::cost_tolerance`] compare equal in the queue.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;
mod queue;
mod spatial;
mod store;
mod tree;
mod types;

pub use error::{Corruption, Result, TreeError, Violation};
pub use store::NodeRecord;
pub use tree::Tree;
pub use types::{Membership, Neighbor, NodeId, TreeConfig};

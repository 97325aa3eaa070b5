// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! KD-tree over node coordinates.
//!
//! Links live on the [`NodeRecord`](crate::NodeRecord)s themselves; this type
//! only tracks the root, the population, and the traversal bounds. Every walk
//! is iterative, so a degenerate (chain-shaped) tree costs time but never stack.
//!
//! - Insert: guided descent to the first empty child slot. Left if the key is
//!   strictly less along the visited node's split axis, right otherwise.
//! - Nearest / range: guided descent to a leaf, then backtrack to the search
//!   root, entering the far side of a split plane only when it is within the
//!   current bound.
//! - Remove: in-place replacement by the minimum along the removed node's axis,
//!   repeated down the tree until a leaf is vacated.
//! - Reconstruct: drop the node and reinsert its whole subtree.

use alloc::vec;
use alloc::vec::Vec;

use sapling_geom::{GeomError, Vector};

use crate::error::{Corruption, Result, TreeError, Violation};
use crate::store::NodeStore;
use crate::types::{NodeId, Neighbor};

/// Counts traversal steps and fails once the allowance is spent.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Budget {
    remaining: usize,
    limit: usize,
}

impl Budget {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            limit,
        }
    }

    pub(crate) fn step(&mut self) -> Result<(), Corruption> {
        if self.remaining == 0 {
            tracing::warn!(limit = self.limit, "traversal step limit exceeded");
            return Err(Corruption::StepLimit { limit: self.limit });
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Accumulates results during a backtracking search.
trait Visitor {
    /// Current pruning distance; far sides beyond it are skipped.
    fn bound(&self) -> f64;
    fn visit(&mut self, id: NodeId, distance: f64);
}

#[derive(Default)]
struct NearestVisitor {
    best: Option<Neighbor>,
}

impl Visitor for NearestVisitor {
    fn bound(&self) -> f64 {
        self.best.map_or(f64::INFINITY, |b| b.distance)
    }

    fn visit(&mut self, id: NodeId, distance: f64) {
        // Strict: the first node found at a given distance wins.
        if distance < self.bound() {
            self.best = Some(Neighbor { id, distance });
        }
    }
}

struct RangeVisitor {
    radius: f64,
    hits: Vec<NodeId>,
}

impl Visitor for RangeVisitor {
    fn bound(&self) -> f64 {
        self.radius
    }

    fn visit(&mut self, id: NodeId, distance: f64) {
        if distance <= self.radius {
            self.hits.push(id);
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Frame {
    /// Guided descent from this subtree root to a leaf.
    Descend(NodeId),
    /// Check `node` and its far side, then continue upward until `stop`.
    Ascend { node: NodeId, stop: NodeId },
}

#[derive(Clone, Debug)]
pub(crate) struct SpatialIndex {
    root: Option<NodeId>,
    len: usize,
    dims: usize,
    max_iterations: usize,
}

impl SpatialIndex {
    pub(crate) fn new(dims: usize, max_iterations: usize) -> Self {
        Self {
            root: None,
            len: 0,
            dims,
            max_iterations,
        }
    }

    pub(crate) fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// True if `id` is linked into this index. `id` must be live.
    pub(crate) fn contains(&self, store: &NodeStore, id: NodeId) -> bool {
        self.root == Some(id) || store.node(id).kd_parent.is_some()
    }

    fn ensure_indexed(&self, store: &NodeStore, id: NodeId) -> Result<()> {
        store.get(id)?;
        if self.contains(store, id) {
            Ok(())
        } else {
            Err(TreeError::precondition(id, Violation::NotIndexed))
        }
    }

    fn check_query(&self, query: &Vector) -> Result<()> {
        if query.len() == self.dims {
            Ok(())
        } else {
            Err(GeomError::DimensionMismatch {
                expected: self.dims,
                found: query.len(),
            }
            .into())
        }
    }

    /// Insert `id` below `from`, or at the root when `from` is `None`.
    pub(crate) fn insert(
        &mut self,
        store: &mut NodeStore,
        id: NodeId,
        from: Option<NodeId>,
    ) -> Result<()> {
        store.get(id)?;
        if self.contains(store, id) {
            return Err(TreeError::precondition(id, Violation::AlreadyIndexed));
        }
        let start = match from {
            Some(from) => {
                self.ensure_indexed(store, from)?;
                from
            }
            None => match self.root {
                Some(root) => root,
                None => {
                    let node = store.node_mut(id);
                    node.clear_kd_links();
                    self.root = Some(id);
                    self.len = 1;
                    tracing::trace!(?id, "kd insert as root");
                    return Ok(());
                }
            },
        };
        self.link_below(store, id, start)?;
        self.len += 1;
        Ok(())
    }

    /// Descend from `start` and hang the unlinked node `id` on the first empty slot.
    fn link_below(&self, store: &mut NodeStore, id: NodeId, start: NodeId) -> Result<()> {
        let mut budget = Budget::new(self.max_iterations);
        let mut cur = start;
        let go_left = loop {
            budget.step()?;
            let (key, node) = (&store.node(id).state, store.node(cur));
            let dim = node.split_dim;
            let left = key[dim] < node.state[dim];
            match if left { node.kd_left } else { node.kd_right } {
                Some(next) => cur = next,
                None => break left,
            }
        };
        let split_dim = (store.node(cur).split_dim + 1) % self.dims;
        let parent = store.node_mut(cur);
        if go_left {
            parent.kd_left = Some(id);
        } else {
            parent.kd_right = Some(id);
        }
        let node = store.node_mut(id);
        node.kd_parent = Some(cur);
        node.kd_left = None;
        node.kd_right = None;
        node.split_dim = split_dim;
        tracing::trace!(?id, parent = ?cur, split_dim, "kd insert");
        Ok(())
    }

    /// Follow the query's side of each split plane from `start` until a slot is empty.
    fn descend(&self, store: &NodeStore, query: &Vector, start: NodeId) -> Result<NodeId> {
        let mut budget = Budget::new(self.max_iterations);
        let mut cur = start;
        loop {
            budget.step()?;
            let node = store.node(cur);
            let dim = node.split_dim;
            let next = if query[dim] < node.state[dim] {
                node.kd_left
            } else {
                node.kd_right
            };
            match next {
                Some(next) => cur = next,
                None => return Ok(cur),
            }
        }
    }

    /// Backtracking search shared by nearest and range queries.
    fn walk<V: Visitor>(
        &self,
        store: &NodeStore,
        query: &Vector,
        start: NodeId,
        visitor: &mut V,
    ) -> Result<()> {
        let mut budget = Budget::new(2 * self.len + 2);
        let mut frames = vec![Frame::Descend(start)];
        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Descend(sub) => {
                    let leaf = self.descend(store, query, sub)?;
                    frames.push(Frame::Ascend {
                        node: leaf,
                        stop: sub,
                    });
                }
                Frame::Ascend { node: id, stop } => {
                    budget.step()?;
                    let node = store.node(id);
                    if id != stop {
                        let parent = node
                            .kd_parent
                            .ok_or(Corruption::BrokenLink { node: id })?;
                        frames.push(Frame::Ascend { node: parent, stop });
                    }
                    let dim = node.split_dim;
                    let delta = query[dim] - node.state[dim];
                    if delta.abs() <= visitor.bound() {
                        visitor.visit(id, query.distance(&node.state)?);
                        let far = if delta < 0.0 {
                            node.kd_right
                        } else {
                            node.kd_left
                        };
                        // Pushed last so the far side is searched before moving up.
                        if let Some(far) = far {
                            frames.push(Frame::Descend(far));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn search_start(&self, store: &NodeStore, from: Option<NodeId>) -> Result<Option<NodeId>> {
        match from {
            Some(from) => {
                self.ensure_indexed(store, from)?;
                Ok(Some(from))
            }
            None => Ok(self.root),
        }
    }

    pub(crate) fn nearest(
        &self,
        store: &NodeStore,
        query: &Vector,
        from: Option<NodeId>,
    ) -> Result<Option<Neighbor>> {
        self.check_query(query)?;
        let Some(start) = self.search_start(store, from)? else {
            return Ok(None);
        };
        let mut visitor = NearestVisitor::default();
        self.walk(store, query, start, &mut visitor)?;
        Ok(visitor.best)
    }

    pub(crate) fn range(
        &self,
        store: &NodeStore,
        query: &Vector,
        radius: f64,
        from: Option<NodeId>,
    ) -> Result<Vec<NodeId>> {
        self.check_query(query)?;
        let Some(start) = self.search_start(store, from)? else {
            return Ok(Vec::new());
        };
        let mut visitor = RangeVisitor {
            radius,
            hits: Vec::new(),
        };
        self.walk(store, query, start, &mut visitor)?;
        Ok(visitor.hits)
    }

    /// Linear scan over indexed nodes in slot order.
    pub(crate) fn nearest_brute_force(
        &self,
        store: &NodeStore,
        query: &Vector,
    ) -> Result<Option<Neighbor>> {
        self.check_query(query)?;
        let mut visitor = NearestVisitor::default();
        for (id, node) in store.iter() {
            if self.contains(store, id) {
                visitor.visit(id, query.distance(&node.state)?);
            }
        }
        Ok(visitor.best)
    }

    /// Linear scan over indexed nodes in slot order.
    pub(crate) fn range_brute_force(
        &self,
        store: &NodeStore,
        query: &Vector,
        radius: f64,
    ) -> Result<Vec<NodeId>> {
        self.check_query(query)?;
        let mut visitor = RangeVisitor {
            radius,
            hits: Vec::new(),
        };
        for (id, node) in store.iter() {
            if self.contains(store, id) {
                visitor.visit(id, query.distance(&node.state)?);
            }
        }
        Ok(visitor.hits)
    }

    /// Node with the smallest coordinate along `dim` in the subtree at `sub`.
    ///
    /// Below a node that splits on `dim` only the left side can hold something smaller.
    fn min_along(&self, store: &NodeStore, sub: NodeId, dim: usize) -> Result<NodeId> {
        let mut budget = Budget::new(2 * self.len + 2);
        let mut best = sub;
        let mut stack = vec![sub];
        while let Some(id) = stack.pop() {
            budget.step()?;
            let node = store.node(id);
            if node.state[dim] < store.node(best).state[dim] {
                best = id;
            }
            if node.split_dim != dim {
                stack.extend(node.kd_right);
            }
            stack.extend(node.kd_left);
        }
        Ok(best)
    }

    /// Point `parent`'s link at `old` to `new`; `None` parent means the root slot.
    fn replace_child(
        &mut self,
        store: &mut NodeStore,
        parent: Option<NodeId>,
        old: NodeId,
        new: Option<NodeId>,
    ) -> Result<()> {
        let Some(parent) = parent else {
            if self.root != Some(old) {
                return Err(Corruption::BrokenLink { node: old }.into());
            }
            self.root = new;
            return Ok(());
        };
        let p = store.node_mut(parent);
        if p.kd_left == Some(old) {
            p.kd_left = new;
        } else if p.kd_right == Some(old) {
            p.kd_right = new;
        } else {
            return Err(Corruption::BrokenLink { node: old }.into());
        }
        Ok(())
    }

    /// Move `repl` (already detached) into `target`'s position and detach `target`.
    ///
    /// When `repl` came from the left subtree, that subtree becomes its right side.
    fn splice(
        &mut self,
        store: &mut NodeStore,
        target: NodeId,
        repl: NodeId,
        from_right: bool,
    ) -> Result<()> {
        let t = store.node(target);
        let parent = t.kd_parent;
        let split_dim = t.split_dim;
        let (left, right) = if from_right {
            (t.kd_left, t.kd_right)
        } else {
            (None, t.kd_left)
        };
        let r = store.node_mut(repl);
        r.kd_parent = parent;
        r.kd_left = left;
        r.kd_right = right;
        r.split_dim = split_dim;
        for child in [left, right].into_iter().flatten() {
            store.node_mut(child).kd_parent = Some(repl);
        }
        self.replace_child(store, parent, target, Some(repl))?;
        store.node_mut(target).clear_kd_links();
        Ok(())
    }

    /// Remove `id`, keeping the rest of the tree in place where possible.
    pub(crate) fn remove(&mut self, store: &mut NodeStore, id: NodeId) -> Result<()> {
        self.ensure_indexed(store, id)?;

        // (vacated position, node moving into it, taken from the right subtree?)
        let mut steps: Vec<(NodeId, NodeId, bool)> = Vec::new();
        let mut budget = Budget::new(self.len + 1);
        let mut cur = id;
        loop {
            budget.step()?;
            let node = store.node(cur);
            let (sub, from_right) = match (node.kd_right, node.kd_left) {
                (Some(right), _) => (right, true),
                (None, Some(left)) => (left, false),
                (None, None) => break,
            };
            let repl = self.min_along(store, sub, node.split_dim)?;
            steps.push((cur, repl, from_right));
            cur = repl;
        }

        // `cur` is a leaf now; vacate it and fill positions bottom-up.
        let leaf_parent = store.node(cur).kd_parent;
        self.replace_child(store, leaf_parent, cur, None)?;
        store.node_mut(cur).clear_kd_links();
        for &(target, repl, from_right) in steps.iter().rev() {
            self.splice(store, target, repl, from_right)?;
        }
        self.len -= 1;
        tracing::trace!(?id, replacements = steps.len(), "kd remove");
        Ok(())
    }

    /// Remove `id` by reinserting everything below it.
    pub(crate) fn reconstruct(&mut self, store: &mut NodeStore, id: NodeId) -> Result<()> {
        self.ensure_indexed(store, id)?;

        // Pre-order, right subtree first.
        let mut budget = Budget::new(2 * self.len + 2);
        let mut collected = Vec::new();
        let node = store.node(id);
        let mut stack: Vec<NodeId> = node.kd_left.into_iter().chain(node.kd_right).collect();
        while let Some(c) = stack.pop() {
            budget.step()?;
            collected.push(c);
            let n = store.node(c);
            stack.extend(n.kd_left);
            stack.extend(n.kd_right);
        }
        for &c in &collected {
            store.node_mut(c).clear_kd_links();
        }

        let parent = store.node(id).kd_parent;
        self.replace_child(store, parent, id, None)?;
        store.node_mut(id).clear_kd_links();
        let moved = collected.len();
        let mut placed = 0;
        let mut pending = collected.into_iter();
        let start = match parent {
            Some(parent) => Some(parent),
            None => {
                // Links were cleared above, so its split axis is already 0.
                let new_root = pending.next();
                self.root = new_root;
                placed += usize::from(new_root.is_some());
                new_root
            }
        };
        if let Some(start) = start {
            for c in pending {
                if let Err(err) = self.link_below(store, c, start) {
                    // Nodes not yet placed keep cleared links and leave the index.
                    self.len -= 1 + moved - placed;
                    return Err(err);
                }
                placed += 1;
            }
        }
        self.len -= 1;
        tracing::debug!(?id, reinserted = moved, "kd reconstruct");
        Ok(())
    }

    /// Verify ordering, back-links and population.
    pub(crate) fn check(&self, store: &NodeStore) -> Result<(), Corruption> {
        let Some(root) = self.root else {
            return if self.len == 0 {
                Ok(())
            } else {
                Err(Corruption::CountMismatch {
                    expected: self.len,
                    found: 0,
                })
            };
        };
        if !store.contains(root) || store.node(root).kd_parent.is_some() {
            return Err(Corruption::BrokenLink { node: root });
        }
        let mut budget = Budget::new(2 * self.len + 2);
        let mut found = 0_usize;
        let unbounded = (
            vec![f64::NEG_INFINITY; self.dims],
            vec![f64::INFINITY; self.dims],
        );
        let mut stack = vec![(root, unbounded)];
        while let Some((id, (lo, hi))) = stack.pop() {
            budget.step()?;
            found += 1;
            let node = store.node(id);
            let inside = (0..self.dims).all(|d| lo[d] <= node.state[d] && node.state[d] < hi[d]);
            if !inside || node.split_dim >= self.dims {
                return Err(Corruption::Misordered { node: id });
            }
            let dim = node.split_dim;
            let key = node.state[dim];
            for (child, is_left) in [(node.kd_left, true), (node.kd_right, false)] {
                let Some(child) = child else { continue };
                if !store.contains(child) || store.node(child).kd_parent != Some(id) {
                    return Err(Corruption::BrokenLink { node: child });
                }
                let (mut lo, mut hi) = (lo.clone(), hi.clone());
                if is_left {
                    hi[dim] = hi[dim].min(key);
                } else {
                    lo[dim] = lo[dim].max(key);
                }
                stack.push((child, (lo, hi)));
            }
        }
        if found != self.len {
            return Err(Corruption::CountMismatch {
                expected: self.len,
                found,
            });
        }
        Ok(())
    }
}

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Tree`] facade: one node arena shared by the logical tree, the
//! priority queue and the spatial index.

use alloc::vec::Vec;
use core::cmp::Ordering;

use sapling_geom::{GeomError, Vector};

use crate::error::{Corruption, Result, TreeError, Violation};
use crate::queue::{PriorityQueue, compare_costs};
use crate::spatial::{Budget, SpatialIndex};
use crate::store::{NodeRecord, NodeStore};
use crate::types::{Membership, Neighbor, NodeId, TreeConfig};

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// A growing tree of points with a KD-tree index and a cost-ordered queue.
///
/// All three structures link nodes by [`NodeId`]; the `Tree` keeps them
/// consistent across branch removal and reset.
#[derive(Clone)]
pub struct Tree {
    store: NodeStore,
    queue: PriorityQueue,
    index: SpatialIndex,
    origin: Option<NodeId>,
    config: TreeConfig,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.store.len())
            .field("indexed", &self.index.len())
            .field("queued", &self.queue.len())
            .field("origin", &self.origin)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Tree {
    /// Create an empty tree with the default configuration (3 dimensions).
    pub fn new() -> Self {
        Self::from_valid_config(TreeConfig::default())
    }

    /// Create an empty tree with a custom configuration.
    ///
    /// Fails with [`TreeError::InvalidConfig`] if `dims` or `max_iterations` is
    /// zero, or the cost tolerance is negative or not finite.
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        config.validate().map_err(TreeError::InvalidConfig)?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TreeConfig) -> Self {
        Self {
            store: NodeStore::default(),
            queue: PriorityQueue::new(config.cost_tolerance),
            index: SpatialIndex::new(config.dims, config.max_iterations),
            origin: None,
            config,
        }
    }

    /// The configuration this tree was built with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // --- node store ---

    /// Allocate an unattached node at `state` with cost 0.
    ///
    /// The node is not indexed, queued, or linked until the caller says so.
    pub fn create(&mut self, state: impl Into<Vector>) -> Result<NodeId> {
        let state = state.into();
        self.check_dims(&state)?;
        let id = self.store.insert(state);
        tracing::trace!(?id, "create");
        Ok(id)
    }

    /// Read access to a node record.
    pub fn node(&self, id: NodeId) -> Result<&NodeRecord> {
        self.store.get(id)
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.store.contains(id)
    }

    /// Number of live nodes, linked or not.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Live node ids in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.store.ids()
    }

    /// Overwrite a node's cost.
    ///
    /// A queued node keeps its position; call [`Tree::update_key`] afterwards.
    pub fn set_cost(&mut self, id: NodeId, cost: f64) -> Result<()> {
        self.store.get_mut(id)?.cost = cost;
        Ok(())
    }

    /// Move a node that is not in the spatial index.
    pub fn set_state(&mut self, id: NodeId, state: impl Into<Vector>) -> Result<()> {
        let state = state.into();
        self.store.get(id)?;
        self.check_dims(&state)?;
        if self.index.contains(&self.store, id) {
            return Err(TreeError::precondition(id, Violation::AlreadyIndexed));
        }
        self.store.node_mut(id).state = state;
        Ok(())
    }

    /// Free a node that has been detached from every structure.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeRecord> {
        if !self.membership(id)?.is_empty() || !self.store.node(id).children.is_empty() {
            return Err(TreeError::precondition(id, Violation::StillLinked));
        }
        tracing::trace!(?id, "remove node");
        self.store.remove(id)
    }

    /// Which structures `id` currently belongs to.
    pub fn membership(&self, id: NodeId) -> Result<Membership> {
        let node = self.store.get(id)?;
        let mut m = Membership::empty();
        m.set(Membership::INDEXED, self.index.contains(&self.store, id));
        m.set(Membership::QUEUED, node.heap_index.is_some());
        m.set(Membership::LINKED, self.is_linked(id));
        Ok(m)
    }

    // --- logical tree ---

    /// Make an unattached node the root of the logical tree.
    pub fn set_origin(&mut self, id: NodeId) -> Result<()> {
        self.store.get(id)?;
        if self.origin.is_some() {
            return Err(TreeError::precondition(id, Violation::OriginExists));
        }
        if self.is_linked(id) {
            return Err(TreeError::precondition(id, Violation::AlreadyAttached));
        }
        self.origin = Some(id);
        Ok(())
    }

    /// Root of the logical tree, if one has been set.
    pub fn origin(&self) -> Option<NodeId> {
        self.origin
    }

    /// Link an unattached node under `parent`.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        self.store.get(child)?;
        self.store.get(parent)?;
        if self.is_linked(child) {
            return Err(TreeError::precondition(child, Violation::AlreadyAttached));
        }
        if !self.is_linked(parent) {
            return Err(TreeError::precondition(parent, Violation::ParentNotAttached));
        }
        self.link_parent(child, parent);
        Ok(())
    }

    /// Move `id` (with its branch) under `new_parent`.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        self.store.get(id)?;
        self.store.get(new_parent)?;
        if self.origin == Some(id) {
            return Err(TreeError::precondition(id, Violation::IsOrigin));
        }
        if !self.is_linked(new_parent) {
            return Err(TreeError::precondition(
                new_parent,
                Violation::ParentNotAttached,
            ));
        }
        let Some(old_parent) = self.store.node(id).parent else {
            return Err(TreeError::precondition(id, Violation::ParentNotAttached));
        };
        if self.path_to_origin(new_parent)?.contains(&id) {
            return Err(TreeError::precondition(new_parent, Violation::WouldCycle));
        }
        if old_parent != new_parent {
            self.unlink_parent(id, old_parent);
            self.link_parent(id, new_parent);
        }
        Ok(())
    }

    /// Logical parent of `id`.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.store.get(id)?.parent)
    }

    /// Logical children of `id`.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.store.get(id)?.children)
    }

    /// Ids from `id` up to the top of its branch (inclusive both ends).
    pub fn path_to_origin(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.store.get(id)?;
        let mut budget = Budget::new(self.store.len() + 1);
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            budget.step()?;
            out.push(n);
            cur = self.store.node(n).parent;
        }
        Ok(out)
    }

    /// Create the origin at `state` and index it.
    pub fn add_origin(&mut self, state: impl Into<Vector>) -> Result<NodeId> {
        if let Some(origin) = self.origin {
            return Err(TreeError::precondition(origin, Violation::OriginExists));
        }
        let id = self.create_indexed(state)?;
        self.origin = Some(id);
        Ok(id)
    }

    /// Create a node at `state`, link it under `parent` and index it.
    pub fn add_child(&mut self, parent: NodeId, state: impl Into<Vector>) -> Result<NodeId> {
        self.store.get(parent)?;
        if !self.is_linked(parent) {
            return Err(TreeError::precondition(parent, Violation::ParentNotAttached));
        }
        let id = self.create_indexed(state)?;
        self.link_parent(id, parent);
        Ok(id)
    }

    /// Create a node and index it; on failure the node is freed again.
    fn create_indexed(&mut self, state: impl Into<Vector>) -> Result<NodeId> {
        let id = self.create(state)?;
        if let Err(err) = self.index.insert(&mut self.store, id, None) {
            self.store.remove(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// Delete `id` and every logical descendant from all structures.
    ///
    /// Removing the origin clears the whole tree. Returns the number of freed nodes.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn remove_branch(&mut self, id: NodeId) -> Result<usize> {
        self.store.get(id)?;
        if self.origin == Some(id) {
            let freed = self.store.len();
            self.reset();
            return Ok(freed);
        }

        // Pre-order, so reversing puts every descendant before its parent.
        let mut budget = Budget::new(2 * self.store.len() + 2);
        let mut branch = Vec::new();
        let mut stack = alloc::vec![id];
        while let Some(n) = stack.pop() {
            budget.step()?;
            branch.push(n);
            stack.extend_from_slice(&self.store.node(n).children);
        }

        for &n in branch.iter().rev() {
            if self.store.node(n).heap_index.is_some() {
                self.queue.remove(&mut self.store, n)?;
            }
            if self.index.contains(&self.store, n) {
                self.index.remove(&mut self.store, n)?;
            }
            if let Some(parent) = self.store.node(n).parent {
                self.unlink_parent(n, parent);
            }
            self.store.remove(n)?;
        }
        tracing::debug!(freed = branch.len(), "branch removed");
        Ok(branch.len())
    }

    /// Empty every structure and forget the origin.
    pub fn reset(&mut self) {
        tracing::debug!(nodes = self.store.len(), "reset");
        self.store.clear();
        self.queue.clear();
        self.index.clear();
        self.origin = None;
    }

    fn is_linked(&self, id: NodeId) -> bool {
        self.origin == Some(id) || self.store.node(id).parent.is_some()
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        self.store.node_mut(parent).children.push(id);
        self.store.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        self.store.node_mut(parent).children.retain(|c| *c != id);
        self.store.node_mut(id).parent = None;
    }

    fn check_dims(&self, state: &Vector) -> Result<()> {
        if state.len() == self.config.dims {
            Ok(())
        } else {
            Err(GeomError::DimensionMismatch {
                expected: self.config.dims,
                found: state.len(),
            }
            .into())
        }
    }

    // --- spatial index ---

    /// Insert `id` into the spatial index, descending from the index root.
    pub fn index_insert(&mut self, id: NodeId) -> Result<()> {
        self.index.insert(&mut self.store, id, None)
    }

    /// Insert `id` into the spatial index, descending from the indexed node `root`.
    ///
    /// Only meaningful when `id` belongs in `root`'s subtree; the caller is
    /// responsible for that.
    pub fn index_insert_from(&mut self, id: NodeId, root: NodeId) -> Result<()> {
        self.index.insert(&mut self.store, id, Some(root))
    }

    /// Remove `id` from the spatial index, keeping the surrounding structure.
    pub fn index_remove(&mut self, id: NodeId) -> Result<()> {
        self.index.remove(&mut self.store, id)
    }

    /// Remove `id` from the spatial index by reinserting its whole subtree.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn index_reconstruct(&mut self, id: NodeId) -> Result<()> {
        self.index.reconstruct(&mut self.store, id)
    }

    /// Root of the spatial index.
    pub fn index_root(&self) -> Option<NodeId> {
        self.index.root()
    }

    /// Number of indexed nodes.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Closest indexed node to `query`, or `None` if nothing is indexed.
    pub fn nearest(&self, query: &Vector) -> Result<Option<Neighbor>> {
        self.index.nearest(&self.store, query, None)
    }

    /// Closest node to `query` within the index subtree at `root`.
    pub fn nearest_from(&self, query: &Vector, root: NodeId) -> Result<Option<Neighbor>> {
        self.index.nearest(&self.store, query, Some(root))
    }

    /// Every indexed node within `radius` of `query` (inclusive), in visit order.
    pub fn range_search(&self, query: &Vector, radius: f64) -> Result<Vec<NodeId>> {
        self.index.range(&self.store, query, radius, None)
    }

    /// Like [`Tree::range_search`], restricted to the index subtree at `root`.
    pub fn range_search_from(
        &self,
        query: &Vector,
        radius: f64,
        root: NodeId,
    ) -> Result<Vec<NodeId>> {
        self.index.range(&self.store, query, radius, Some(root))
    }

    /// Linear-scan nearest over indexed nodes.
    pub fn nearest_brute_force(&self, query: &Vector) -> Result<Option<Neighbor>> {
        self.index.nearest_brute_force(&self.store, query)
    }

    /// Linear-scan range search over indexed nodes, in slot order.
    pub fn range_search_brute_force(&self, query: &Vector, radius: f64) -> Result<Vec<NodeId>> {
        self.index.range_brute_force(&self.store, query, radius)
    }

    // --- priority queue ---

    /// Queue `id` by its current cost.
    pub fn push(&mut self, id: NodeId) -> Result<()> {
        self.queue.push(&mut self.store, id)
    }

    /// Dequeue the cheapest node.
    pub fn pop_min(&mut self) -> Option<NodeId> {
        self.queue.pop_min(&mut self.store)
    }

    /// The cheapest queued node, without dequeuing it.
    pub fn peek_min(&self) -> Option<NodeId> {
        self.queue.peek_min()
    }

    /// Dequeue an arbitrary node.
    pub fn remove_from_queue(&mut self, id: NodeId) -> Result<()> {
        self.queue.remove(&mut self.store, id)
    }

    /// Reposition `id` after its cost changed via [`Tree::set_cost`].
    pub fn update_key(&mut self, id: NodeId) -> Result<()> {
        self.queue.update(&mut self.store, id)
    }

    /// Number of queued nodes.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    // --- validation ---

    /// Check every cross-structure invariant.
    ///
    /// Returns the first problem found as [`TreeError::IndexCorruption`].
    pub fn validate(&self) -> Result<()> {
        self.index.check(&self.store)?;
        let indexed = self
            .store
            .ids()
            .filter(|&id| self.index.contains(&self.store, id))
            .count();
        if indexed != self.index.len() {
            return Err(Corruption::CountMismatch {
                expected: self.index.len(),
                found: indexed,
            }
            .into());
        }
        self.check_queue()?;
        self.check_logical()?;
        Ok(())
    }

    fn check_queue(&self) -> Result<(), Corruption> {
        let heap = self.queue.as_slice();
        for (position, &id) in heap.iter().enumerate() {
            let Ok(node) = self.store.get(id) else {
                return Err(Corruption::HeapMismatch { position });
            };
            if node.heap_index != Some(position) {
                return Err(Corruption::HeapMismatch { position });
            }
            if position > 0 {
                let parent = self.store.node(heap[(position - 1) / 2]);
                if compare_costs(parent.cost, node.cost, self.queue.tolerance())
                    == Ordering::Greater
                {
                    return Err(Corruption::HeapMismatch { position });
                }
            }
        }
        let queued = self
            .store
            .iter()
            .filter(|(_, n)| n.heap_index.is_some())
            .count();
        if queued != heap.len() {
            return Err(Corruption::HeapMismatch {
                position: heap.len(),
            });
        }
        Ok(())
    }

    fn check_logical(&self) -> Result<(), Corruption> {
        if let Some(origin) = self.origin {
            match self.store.get(origin) {
                Ok(n) if n.parent.is_none() => {}
                _ => return Err(Corruption::LogicalMismatch { node: origin }),
            }
        }
        for (id, node) in self.store.iter() {
            if let Some(parent) = node.parent {
                let linked_back = self
                    .store
                    .get(parent)
                    .is_ok_and(|p| p.children.contains(&id));
                if !linked_back {
                    return Err(Corruption::LogicalMismatch { node: id });
                }
            } else if !node.children.is_empty() && self.origin != Some(id) {
                return Err(Corruption::LogicalMismatch { node: id });
            }
            for &child in &node.children {
                if self.store.get(child).map(|c| c.parent) != Ok(Some(id)) {
                    return Err(Corruption::LogicalMismatch { node: child });
                }
            }
        }
        Ok(())
    }
}

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the tree: node identifiers, membership flags, configuration, and query results.

/// Identifier for a node in the tree.
///
/// This is a small, copyable handle that stays stable for the lifetime of the node
/// but becomes invalid once the node is removed from the store.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On create, a fresh slot is allocated with generation `1`.
/// - On removal, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// Stale `NodeId`s never alias a different live node because the generation must match;
/// operations given a stale id fail with [`TreeError::NotFound`](crate::TreeError::NotFound).
///
/// ### Notes
///
/// - The generation increments on slot reuse and never decreases.
/// - `u32` is ample for practical lifetimes; behavior on generation overflow is unspecified.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Slot index of this id. Slots are reused after removal.
    pub const fn slot(self) -> u32 {
        self.0
    }

    /// Generation of this id's slot at the time the id was issued.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

bitflags::bitflags! {
    /// Which of the three structures a node currently belongs to.
    ///
    /// Derived from the node's linkage on every call; see [`Tree::membership`](crate::Tree::membership).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Membership: u8 {
        /// Node is in the spatial index (KD-tree).
        const INDEXED = 0b0000_0001;
        /// Node is in the priority queue.
        const QUEUED  = 0b0000_0010;
        /// Node is part of the logical tree (it is the origin or has a parent).
        const LINKED  = 0b0000_0100;
    }
}

/// Construction-time settings shared by every operation on one [`Tree`](crate::Tree).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeConfig {
    /// Number of components every node state must have.
    pub dims: usize,
    /// Maximum number of steps a single guided descent may take before the
    /// index is reported as corrupt.
    pub max_iterations: usize,
    /// Two costs closer than this compare equal in the priority queue.
    pub cost_tolerance: f64,
}

impl TreeConfig {
    /// Default state dimensionality.
    pub const DEFAULT_DIMS: usize = 3;
    /// Default descent step bound.
    pub const DEFAULT_MAX_ITERATIONS: usize = 50_000;
    /// Default cost tolerance.
    pub const DEFAULT_COST_TOLERANCE: f64 = 1e-6;

    /// Default configuration with `dims` state components.
    pub const fn with_dims(dims: usize) -> Self {
        Self {
            dims,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            cost_tolerance: Self::DEFAULT_COST_TOLERANCE,
        }
    }

    /// Replace the descent step bound.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replace the cost tolerance.
    #[must_use]
    pub const fn with_cost_tolerance(mut self, cost_tolerance: f64) -> Self {
        self.cost_tolerance = cost_tolerance;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.dims == 0 {
            return Err("dims must be at least 1");
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1");
        }
        if !(self.cost_tolerance >= 0.0 && self.cost_tolerance.is_finite()) {
            return Err("cost_tolerance must be finite and non-negative");
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::with_dims(Self::DEFAULT_DIMS)
    }
}

/// Result of a nearest-neighbor query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// The closest node found.
    pub id: NodeId,
    /// Euclidean distance from the query to that node.
    pub distance: f64,
}

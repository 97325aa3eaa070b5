// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for store, queue, index, and lifecycle operations.

use sapling_geom::GeomError;

use crate::types::NodeId;

/// Result alias used throughout this crate.
pub type Result<T, E = TreeError> = core::result::Result<T, E>;

/// Failure of a [`Tree`](crate::Tree) operation.
///
/// Every failure is reported before the structures are left in an
/// inconsistent state; nothing is retried internally.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// The id does not refer to a live node (never issued, removed, or stale generation).
    #[error("node {0:?} does not exist")]
    NotFound(NodeId),
    /// The node exists but is not in the state the operation requires.
    #[error("node {id:?}: {violation}")]
    Precondition {
        /// Offending node.
        id: NodeId,
        /// Which requirement was not met.
        violation: Violation,
    },
    /// A coordinate had the wrong number of components.
    #[error(transparent)]
    Geometry(#[from] GeomError),
    /// Links between nodes are malformed.
    #[error("index corruption: {0}")]
    IndexCorruption(Corruption),
    /// The configuration passed to [`Tree::with_config`](crate::Tree::with_config) is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl TreeError {
    pub(crate) const fn precondition(id: NodeId, violation: Violation) -> Self {
        Self::Precondition { id, violation }
    }
}

/// Requirements an operation can find unmet on an existing node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Violation {
    /// The node is not in the priority queue.
    #[error("not in the priority queue")]
    NotQueued,
    /// The node is already in the priority queue.
    #[error("already in the priority queue")]
    AlreadyQueued,
    /// The node is not in the spatial index.
    #[error("not in the spatial index")]
    NotIndexed,
    /// The node is already in the spatial index.
    #[error("already in the spatial index")]
    AlreadyIndexed,
    /// The node is still linked into the queue, the spatial index or the logical tree.
    #[error("still linked into a structure")]
    StillLinked,
    /// The node already has a logical parent or is the origin.
    #[error("already attached to the logical tree")]
    AlreadyAttached,
    /// The prospective parent is not part of the logical tree.
    #[error("parent is not attached to the logical tree")]
    ParentNotAttached,
    /// The logical tree already has an origin.
    #[error("an origin already exists")]
    OriginExists,
    /// The operation is not allowed on the origin.
    #[error("operation not allowed on the origin")]
    IsOrigin,
    /// The new parent lies inside the node's own branch.
    #[error("new parent lies inside the node's branch")]
    WouldCycle,
}

/// Ways the linkage between nodes can be found malformed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Corruption {
    /// A traversal took more steps than allowed; the links likely form a cycle.
    #[error("traversal exceeded {limit} steps")]
    StepLimit {
        /// The bound that was exceeded.
        limit: usize,
    },
    /// A node's recorded parent does not point back at it.
    #[error("node {node:?} is not linked from its recorded parent")]
    BrokenLink {
        /// The orphaned node.
        node: NodeId,
    },
    /// A node lies on the wrong side of an ancestor's split plane.
    #[error("node {node:?} is on the wrong side of an ancestor's split plane")]
    Misordered {
        /// The misplaced node.
        node: NodeId,
    },
    /// A queue entry disagrees with its node's heap index or violates heap order.
    #[error("queue entry at position {position} is inconsistent")]
    HeapMismatch {
        /// Position in the heap array.
        position: usize,
    },
    /// The number of reachable index entries differs from the tracked count.
    #[error("spatial index holds {found} nodes but tracks {expected}")]
    CountMismatch {
        /// Tracked count.
        expected: usize,
        /// Reachable count.
        found: usize,
    },
    /// A parent/child pair in the logical tree is not symmetric.
    #[error("logical link of node {node:?} is not symmetric")]
    LogicalMismatch {
        /// Node whose link is broken.
        node: NodeId,
    },
}

impl From<Corruption> for TreeError {
    fn from(c: Corruption) -> Self {
        Self::IndexCorruption(c)
    }
}

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Addressable binary min-heap over node costs.
//!
//! The heap stores ids only; each queued node records its own position in
//! [`NodeRecord::heap_index`](crate::NodeRecord::heap_index) so arbitrary
//! removal and key updates are `O(log n)`.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::error::{Result, TreeError, Violation};
use crate::store::NodeStore;
use crate::types::NodeId;

/// Compare two costs, treating values within `tolerance` as equal.
#[inline]
pub(crate) fn compare_costs(a: f64, b: f64, tolerance: f64) -> Ordering {
    if (a - b).abs() <= tolerance {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PriorityQueue {
    heap: Vec<NodeId>,
    tolerance: f64,
}

impl PriorityQueue {
    pub(crate) fn new(tolerance: f64) -> Self {
        Self {
            heap: Vec::new(),
            tolerance,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    /// The backing array, root first.
    pub(crate) fn as_slice(&self) -> &[NodeId] {
        &self.heap
    }

    pub(crate) fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub(crate) fn push(&mut self, store: &mut NodeStore, id: NodeId) -> Result<()> {
        let node = store.get_mut(id)?;
        if node.heap_index.is_some() {
            return Err(TreeError::precondition(id, Violation::AlreadyQueued));
        }
        let last = self.heap.len();
        node.heap_index = Some(last);
        self.heap.push(id);
        self.sift_up(store, last);
        tracing::trace!(?id, len = self.heap.len(), "queue push");
        Ok(())
    }

    pub(crate) fn peek_min(&self) -> Option<NodeId> {
        self.heap.first().copied()
    }

    pub(crate) fn pop_min(&mut self, store: &mut NodeStore) -> Option<NodeId> {
        if self.heap.is_empty() {
            return None;
        }
        let min = self.heap.swap_remove(0);
        store.node_mut(min).heap_index = None;
        if let Some(&moved) = self.heap.first() {
            store.node_mut(moved).heap_index = Some(0);
            self.sift_down(store, 0);
        }
        tracing::trace!(id = ?min, len = self.heap.len(), "queue pop");
        Some(min)
    }

    pub(crate) fn remove(&mut self, store: &mut NodeStore, id: NodeId) -> Result<()> {
        let pos = self.position(store, id)?;
        self.heap.swap_remove(pos);
        store.node_mut(id).heap_index = None;
        if let Some(&moved) = self.heap.get(pos) {
            store.node_mut(moved).heap_index = Some(pos);
            let pos = self.sift_up(store, pos);
            self.sift_down(store, pos);
        }
        tracing::trace!(?id, len = self.heap.len(), "queue remove");
        Ok(())
    }

    /// Restore heap order after `id`'s cost changed.
    pub(crate) fn update(&mut self, store: &mut NodeStore, id: NodeId) -> Result<()> {
        let pos = self.position(store, id)?;
        let pos = self.sift_up(store, pos);
        self.sift_down(store, pos);
        Ok(())
    }

    fn position(&self, store: &NodeStore, id: NodeId) -> Result<usize> {
        let pos = store
            .get(id)?
            .heap_index
            .ok_or(TreeError::precondition(id, Violation::NotQueued))?;
        debug_assert_eq!(self.heap.get(pos), Some(&id), "heap index out of sync");
        Ok(pos)
    }

    fn cmp_at(&self, store: &NodeStore, a: usize, b: usize) -> Ordering {
        compare_costs(
            store.node(self.heap[a]).cost,
            store.node(self.heap[b]).cost,
            self.tolerance,
        )
    }

    fn swap(&mut self, store: &mut NodeStore, a: usize, b: usize) {
        self.heap.swap(a, b);
        store.node_mut(self.heap[a]).heap_index = Some(a);
        store.node_mut(self.heap[b]).heap_index = Some(b);
    }

    /// Returns the final position of the element that started at `child`.
    fn sift_up(&mut self, store: &mut NodeStore, mut child: usize) -> usize {
        while child > 0 {
            let parent = (child - 1) / 2;
            if self.cmp_at(store, parent, child) != Ordering::Greater {
                break;
            }
            self.swap(store, parent, child);
            child = parent;
        }
        child
    }

    fn sift_down(&mut self, store: &mut NodeStore, mut parent: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                return;
            }
            let right = left + 1;
            // Ties go to the right child.
            let child = if right >= len || self.cmp_at(store, left, right) == Ordering::Less {
                left
            } else {
                right
            };
            if self.cmp_at(store, child, parent) != Ordering::Less {
                return;
            }
            self.swap(store, child, parent);
            parent = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sapling_geom::Vector;

    fn setup(costs: &[f64]) -> (NodeStore, PriorityQueue, Vec<NodeId>) {
        let mut store = NodeStore::default();
        let mut queue = PriorityQueue::new(1e-6);
        let ids: Vec<_> = costs
            .iter()
            .map(|&c| {
                let id = store.insert(Vector::zeros(3));
                store.get_mut(id).unwrap().cost = c;
                queue.push(&mut store, id).unwrap();
                id
            })
            .collect();
        (store, queue, ids)
    }

    fn drain(store: &mut NodeStore, queue: &mut PriorityQueue) -> Vec<f64> {
        let mut out = Vec::new();
        while let Some(id) = queue.pop_min(store) {
            assert_eq!(store.node(id).heap_index(), None);
            out.push(store.node(id).cost());
        }
        out
    }

    fn assert_heap(store: &NodeStore, queue: &PriorityQueue) {
        for (pos, &id) in queue.as_slice().iter().enumerate() {
            assert_eq!(store.node(id).heap_index(), Some(pos));
            if pos > 0 {
                let parent = queue.as_slice()[(pos - 1) / 2];
                assert_ne!(
                    compare_costs(store.node(parent).cost, store.node(id).cost, 1e-6),
                    Ordering::Greater
                );
            }
        }
    }

    #[test]
    fn drain_is_sorted() {
        let (mut store, mut queue, _) = setup(&[5.0, 3.0, 8.0, 1.0]);
        assert_heap(&store, &queue);
        assert_eq!(drain(&mut store, &mut queue), [1.0, 3.0, 5.0, 8.0]);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.pop_min(&mut store), None);
    }

    #[test]
    fn push_and_remove_arbitrary() {
        let (mut store, mut queue, ids) = setup(&[5.0, 3.0, 8.0, 1.0]);
        let zero = store.insert(Vector::zeros(3));
        queue.push(&mut store, zero).unwrap();
        queue.remove(&mut store, ids[2]).unwrap();
        assert_eq!(store.node(ids[2]).heap_index(), None);
        assert_heap(&store, &queue);
        assert_eq!(queue.peek_min(), Some(zero));
        assert_eq!(drain(&mut store, &mut queue), [0.0, 1.0, 3.0, 5.0]);
    }

    #[test]
    fn remove_last_element() {
        let (mut store, mut queue, ids) = setup(&[1.0, 2.0, 3.0]);
        let last = *queue.as_slice().last().unwrap();
        queue.remove(&mut store, last).unwrap();
        assert_heap(&store, &queue);
        assert_eq!(queue.len(), 2);
        queue.remove(&mut store, ids[0]).unwrap();
        queue.remove(&mut store, ids[1]).unwrap();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn update_moves_both_ways() {
        let (mut store, mut queue, ids) = setup(&[4.0, 6.0, 2.0, 9.0, 7.0]);
        store.get_mut(ids[3]).unwrap().cost = 0.5;
        queue.update(&mut store, ids[3]).unwrap();
        assert_eq!(queue.peek_min(), Some(ids[3]));
        store.get_mut(ids[3]).unwrap().cost = 10.0;
        queue.update(&mut store, ids[3]).unwrap();
        assert_heap(&store, &queue);
        assert_eq!(drain(&mut store, &mut queue), [2.0, 4.0, 6.0, 7.0, 10.0]);
    }

    #[test]
    fn membership_preconditions() {
        let (mut store, mut queue, ids) = setup(&[1.0]);
        assert_eq!(
            queue.push(&mut store, ids[0]),
            Err(TreeError::precondition(ids[0], Violation::AlreadyQueued))
        );
        let outside = store.insert(Vector::zeros(3));
        assert_eq!(
            queue.remove(&mut store, outside),
            Err(TreeError::precondition(outside, Violation::NotQueued))
        );
        assert_eq!(
            queue.update(&mut store, outside),
            Err(TreeError::precondition(outside, Violation::NotQueued))
        );
        store.remove(outside).unwrap();
        assert_eq!(
            queue.push(&mut store, outside),
            Err(TreeError::NotFound(outside))
        );
    }

    #[test]
    fn costs_within_tolerance_compare_equal() {
        assert_eq!(compare_costs(1.0, 1.0 + 5e-7, 1e-6), Ordering::Equal);
        assert_eq!(compare_costs(1.0, 1.1, 1e-6), Ordering::Less);
        assert_eq!(compare_costs(2.0, 1.0, 0.0), Ordering::Greater);
    }
}

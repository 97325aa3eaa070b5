// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node records and the arena that owns them.

use alloc::vec::Vec;

use sapling_geom::Vector;

use crate::error::{Result, TreeError};
use crate::types::NodeId;

/// One node: a coordinate, a cost, and its links into all three structures.
///
/// Records are owned by the [`Tree`](crate::Tree); callers read them through
/// [`Tree::node`](crate::Tree::node) and mutate them only through tree operations.
#[derive(Clone, Debug)]
pub struct NodeRecord {
    generation: u32,
    pub(crate) state: Vector,
    pub(crate) cost: f64,
    // logical tree
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    // priority queue
    pub(crate) heap_index: Option<usize>,
    // spatial index
    pub(crate) kd_parent: Option<NodeId>,
    pub(crate) kd_left: Option<NodeId>,
    pub(crate) kd_right: Option<NodeId>,
    pub(crate) split_dim: usize,
}

impl NodeRecord {
    fn new(generation: u32, state: Vector) -> Self {
        Self {
            generation,
            state,
            cost: 0.0,
            parent: None,
            children: Vec::new(),
            heap_index: None,
            kd_parent: None,
            kd_left: None,
            kd_right: None,
            split_dim: 0,
        }
    }

    /// Coordinate of the node.
    pub fn state(&self) -> &Vector {
        &self.state
    }

    /// Ordering key used by the priority queue.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Logical parent, `None` for the origin and for unattached nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Logical children in attachment order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Position in the priority queue's backing array, `None` if not queued.
    pub fn heap_index(&self) -> Option<usize> {
        self.heap_index
    }

    /// Parent in the KD-tree.
    pub fn kd_parent(&self) -> Option<NodeId> {
        self.kd_parent
    }

    /// Left child in the KD-tree (strictly smaller along [`split_dim`](Self::split_dim)).
    pub fn kd_left(&self) -> Option<NodeId> {
        self.kd_left
    }

    /// Right child in the KD-tree (greater or equal along [`split_dim`](Self::split_dim)).
    pub fn kd_right(&self) -> Option<NodeId> {
        self.kd_right
    }

    /// Axis this node partitions its KD-children on.
    pub fn split_dim(&self) -> usize {
        self.split_dim
    }

    pub(crate) fn clear_kd_links(&mut self) {
        self.kd_parent = None;
        self.kd_left = None;
        self.kd_right = None;
        self.split_dim = 0;
    }

    pub(crate) fn has_kd_links(&self) -> bool {
        self.kd_parent.is_some() || self.kd_left.is_some() || self.kd_right.is_some()
    }
}

/// Slot arena holding every [`NodeRecord`]; the only place ids are issued and retired.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeStore {
    slots: Vec<Option<NodeRecord>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    len: usize,
}

impl NodeStore {
    pub(crate) fn insert(&mut self, state: Vector) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(NodeRecord::new(generation, state));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(NodeRecord::new(generation, state)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        self.len += 1;
        NodeId::new(idx, generation)
    }

    /// Frees the slot. Callers check linkage first.
    pub(crate) fn remove(&mut self, id: NodeId) -> Result<NodeRecord> {
        self.get(id)?;
        self.len -= 1;
        self.free_list.push(id.idx());
        self.slots[id.idx()].take().ok_or(TreeError::NotFound(id))
    }

    /// Free every slot. Generations are kept, so ids issued before the clear stay stale.
    pub(crate) fn clear(&mut self) {
        self.free_list.clear();
        // Reversed so slot 0 is reused first.
        for (idx, slot) in self.slots.iter_mut().enumerate().rev() {
            *slot = None;
            self.free_list.push(idx);
        }
        self.len = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&NodeRecord> {
        self.slots
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == id.1)
            .ok_or(TreeError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord> {
        self.slots
            .get_mut(id.idx())
            .and_then(|n| n.as_mut())
            .filter(|n| n.generation == id.1)
            .ok_or(TreeError::NotFound(id))
    }

    /// Access a linked node; panics if `id` is stale.
    ///
    /// Only used for ids read from another record's links, which the
    /// structures keep live.
    pub(crate) fn node(&self, id: NodeId) -> &NodeRecord {
        self.slots[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a linked node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeRecord {
        self.slots[id.idx()].as_mut().expect("dangling NodeId")
    }

    /// Live ids in slot order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, n)| {
            n.as_ref().map(|n| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "NodeId uses 32-bit indices by design."
                )]
                NodeId::new(i as u32, n.generation)
            })
        })
    }

    /// Live records with their ids, in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, n)| {
            n.as_ref().map(|n| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "NodeId uses 32-bit indices by design."
                )]
                (NodeId::new(i as u32, n.generation), n)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64) -> Vector {
        Vector::from([x, 0.0, 0.0])
    }

    #[test]
    fn insert_remove_reuse() {
        let mut store = NodeStore::default();
        let a = store.insert(v(1.0));
        let b = store.insert(v(2.0));
        assert_eq!(store.len(), 2);
        assert!(store.contains(a) && store.contains(b));

        let removed = store.remove(a).unwrap();
        assert_eq!(removed.state()[0], 1.0);
        assert!(!store.contains(a), "removed id must be stale");
        assert_eq!(store.get(a).err(), Some(TreeError::NotFound(a)));

        // Reuse the slot; the old id stays stale.
        let c = store.insert(v(3.0));
        assert_eq!(c.slot(), a.slot());
        assert!(c.generation() > a.generation(), "generation must increase on reuse");
        assert!(!store.contains(a));
        assert_eq!(store.get(c).unwrap().state()[0], 3.0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn double_remove_is_not_found() {
        let mut store = NodeStore::default();
        let a = store.insert(v(1.0));
        store.remove(a).unwrap();
        assert_eq!(store.remove(a).err(), Some(TreeError::NotFound(a)));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn ids_are_in_slot_order() {
        let mut store = NodeStore::default();
        let a = store.insert(v(1.0));
        let b = store.insert(v(2.0));
        let c = store.insert(v(3.0));
        store.remove(b).unwrap();
        let ids: Vec<_> = store.ids().collect();
        assert_eq!(ids, [a, c]);
        store.clear();
        assert_eq!(store.ids().count(), 0);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn clear_keeps_old_ids_stale() {
        let mut store = NodeStore::default();
        let a = store.insert(v(1.0));
        let b = store.insert(v(2.0));
        store.clear();
        let c = store.insert(v(3.0));
        assert_eq!(c.slot(), a.slot(), "slots are reused after clear");
        assert!(c.generation() > a.generation());
        assert!(!store.contains(a));
        assert!(!store.contains(b));
        assert_eq!(store.get(a).err(), Some(TreeError::NotFound(a)));
        assert_eq!(store.len(), 1);
    }
}

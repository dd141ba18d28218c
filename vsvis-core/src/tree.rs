//! Arena-backed tree of marker groups and markers.
//!
//! Nodes live in a slab and are addressed by generational [`NodeId`]
//! handles. Parents own their children through an integer-keyed map; the
//! parent link stored in each node is a plain handle and never owns.
//! Destroying a node frees its slot and bumps the slot generation, so any
//! handle still held elsewhere stops resolving instead of dangling.

use std::collections::HashMap;

use crate::marker::MarkerRecord;
use crate::{Error, Result};

/// Handle to a node in a [`MarkerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Slot index of this handle.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

/// A node is either a group of children or a marker leaf.
#[derive(Debug)]
pub enum NodeKind {
    Group(HashMap<usize, NodeId>),
    Marker(MarkerRecord),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    key: Option<usize>,
    kind: NodeKind,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Slab of marker groups and markers.
#[derive(Debug, Default)]
pub struct MarkerTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl MarkerTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no nodes are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns true if `id` still refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Creates a detached, empty group.
    pub fn create_group(&mut self) -> NodeId {
        self.alloc(NodeKind::Group(HashMap::new()))
    }

    /// Creates a detached marker leaf.
    pub fn create_marker(&mut self, mut record: MarkerRecord) -> NodeId {
        record.key = None;
        self.alloc(NodeKind::Marker(record))
    }

    /// Returns true if `id` is a live group.
    #[must_use]
    pub fn is_group(&self, id: NodeId) -> bool {
        matches!(self.node(id), Some(Node { kind: NodeKind::Group(_), .. }))
    }

    /// Parent of a live node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Key of a live node inside its parent.
    #[must_use]
    pub fn key(&self, id: NodeId) -> Option<usize> {
        self.node(id).and_then(|n| n.key)
    }

    /// Marker stored at `id`, if it is a live marker.
    #[must_use]
    pub fn marker(&self, id: NodeId) -> Option<&MarkerRecord> {
        match self.node(id) {
            Some(Node { kind: NodeKind::Marker(m), .. }) => Some(m),
            _ => None,
        }
    }

    /// Mutable access to the marker stored at `id`.
    pub fn marker_mut(&mut self, id: NodeId) -> Option<&mut MarkerRecord> {
        match self.node_mut(id) {
            Some(Node { kind: NodeKind::Marker(m), .. }) => Some(m),
            _ => None,
        }
    }

    /// Child of `parent` at `key`.
    #[must_use]
    pub fn child(&self, parent: NodeId, key: usize) -> Option<NodeId> {
        self.group(parent).and_then(|g| g.get(&key).copied())
    }

    /// Number of direct children of a group; zero for anything else.
    #[must_use]
    pub fn child_count(&self, parent: NodeId) -> usize {
        self.group(parent).map_or(0, HashMap::len)
    }

    /// Direct children of a group, sorted by key.
    #[must_use]
    pub fn children(&self, parent: NodeId) -> Vec<(usize, NodeId)> {
        let mut children: Vec<_> = self
            .group(parent)
            .map(|g| g.iter().map(|(&k, &id)| (k, id)).collect())
            .unwrap_or_default();
        children.sort_unstable_by_key(|&(k, _)| k);
        children
    }

    /// Keys of the direct children of a group, sorted.
    #[must_use]
    pub fn child_keys(&self, parent: NodeId) -> Vec<usize> {
        self.children(parent).into_iter().map(|(k, _)| k).collect()
    }

    /// Attaches `child` under `parent` at `key`.
    ///
    /// The child is first removed from its previous parent. A node already
    /// occupying `key` is detached and returned to the caller.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if either handle is stale,
    /// `parent` is not a group, or the move would create a cycle.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        key: usize,
        child: NodeId,
    ) -> Result<Option<NodeId>> {
        if !self.is_group(parent) {
            return Err(Error::PreconditionViolation(
                "parent handle is not a live group".to_string(),
            ));
        }
        if !self.contains(child) {
            return Err(stale());
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::PreconditionViolation(
                "a group cannot contain itself".to_string(),
            ));
        }

        self.detach(child);
        let displaced = self.group_mut(parent).and_then(|g| g.insert(key, child));
        if let Some(old) = displaced {
            self.clear_link(old);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
            node.key = Some(key);
            if let NodeKind::Marker(m) = &mut node.kind {
                m.key = Some(key);
            }
        }
        Ok(displaced)
    }

    /// Detaches the child at `key` without destroying it.
    pub fn remove_child(&mut self, parent: NodeId, key: usize) -> Option<NodeId> {
        let id = self.group_mut(parent)?.remove(&key)?;
        self.clear_link(id);
        Some(id)
    }

    /// Detaches and destroys the child at `key`, recursively.
    ///
    /// Returns false if there was no such child.
    pub fn delete_child_item(&mut self, parent: NodeId, key: usize) -> bool {
        match self.remove_child(parent, key) {
            Some(id) => {
                self.destroy(id);
                true
            }
            None => false,
        }
    }

    /// Destroys every child of `parent` and inserts `items` at keys
    /// `0..items.len()`.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if `parent` is not a live
    /// group or any item is stale. Nothing is changed in that case.
    pub fn replace_children(&mut self, parent: NodeId, items: &[NodeId]) -> Result<()> {
        if !self.is_group(parent) {
            return Err(Error::PreconditionViolation(
                "parent handle is not a live group".to_string(),
            ));
        }
        if items
            .iter()
            .any(|&id| !self.contains(id) || self.is_ancestor_or_self(id, parent))
        {
            return Err(stale());
        }
        for (key, id) in self.children(parent) {
            if items.contains(&id) {
                self.remove_child(parent, key);
            } else {
                self.delete_child_item(parent, key);
            }
        }
        for (key, &id) in items.iter().enumerate() {
            self.insert_child(parent, key, id)?;
        }
        Ok(())
    }

    /// Destroys `id` and all of its descendants, detaching it first.
    ///
    /// Returns the number of nodes freed.
    pub fn destroy(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.detach(id);

        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.free_slot(current) else {
                continue;
            };
            freed += 1;
            if let NodeKind::Group(children) = node.kind {
                stack.extend(children.into_values());
            }
        }
        freed
    }

    /// Iterates the markers directly under `parent`, sorted by key.
    pub fn markers(&self, parent: NodeId) -> impl Iterator<Item = (NodeId, &MarkerRecord)> + '_ {
        self.children(parent)
            .into_iter()
            .filter_map(move |(_, id)| self.marker(id).map(|m| (id, m)))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            parent: None,
            key: None,
            kind,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn free_slot(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index())?;
        if slot.generation == id.generation {
            slot.node.as_ref()
        } else {
            None
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation == id.generation {
            slot.node.as_mut()
        } else {
            None
        }
    }

    fn group(&self, id: NodeId) -> Option<&HashMap<usize, NodeId>> {
        match self.node(id) {
            Some(Node { kind: NodeKind::Group(g), .. }) => Some(g),
            _ => None,
        }
    }

    fn group_mut(&mut self, id: NodeId) -> Option<&mut HashMap<usize, NodeId>> {
        match self.node_mut(id) {
            Some(Node { kind: NodeKind::Group(g), .. }) => Some(g),
            _ => None,
        }
    }

    /// Removes `id` from its parent's child map, if attached.
    fn detach(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        if let (Some(parent), Some(key)) = (node.parent, node.key) {
            if let Some(group) = self.group_mut(parent) {
                if group.get(&key) == Some(&id) {
                    group.remove(&key);
                }
            }
        }
        self.clear_link(id);
    }

    fn clear_link(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
            node.key = None;
            if let NodeKind::Marker(m) = &mut node.kind {
                m.key = None;
            }
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

fn stale() -> Error {
    Error::PreconditionViolation("stale node handle".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerFactory;

    fn marker(tree: &mut MarkerTree, x: f64) -> NodeId {
        tree.create_marker(MarkerFactory::default().stamp(x, x, None))
    }

    #[test]
    fn test_children_sorted_and_keyed() {
        let mut tree = MarkerTree::new();
        let group = tree.create_group();
        for key in [5, 1, 3] {
            let m = marker(&mut tree, 0.0);
            tree.insert_child(group, key, m).unwrap();
        }
        assert_eq!(tree.child_keys(group), vec![1, 3, 5]);
        for (key, id) in tree.children(group) {
            assert_eq!(tree.key(id), Some(key));
            assert_eq!(tree.marker(id).unwrap().key(), Some(key));
            assert_eq!(tree.parent(id), Some(group));
        }
    }

    #[test]
    fn test_reparent_removes_from_old_parent() {
        let mut tree = MarkerTree::new();
        let a = tree.create_group();
        let b = tree.create_group();
        let m = marker(&mut tree, 1.0);

        tree.insert_child(a, 0, m).unwrap();
        tree.insert_child(b, 7, m).unwrap();

        assert_eq!(tree.child_count(a), 0);
        assert_eq!(tree.child(b, 7), Some(m));
        assert_eq!(tree.key(m), Some(7));
    }

    #[test]
    fn test_recursive_destroy_invalidates_handles() {
        let mut tree = MarkerTree::new();
        let root = tree.create_group();
        let frame = tree.create_group();
        tree.insert_child(root, 12, frame).unwrap();
        let markers: Vec<_> = (0..4).map(|i| marker(&mut tree, f64::from(i))).collect();
        tree.replace_children(frame, &markers).unwrap();
        assert_eq!(tree.len(), 6);

        assert!(tree.delete_child_item(root, 12));
        assert_eq!(tree.len(), 1);
        assert!(!tree.contains(frame));
        assert!(markers.iter().all(|&m| tree.marker(m).is_none()));
        assert_eq!(tree.child_count(root), 0);

        // slots are reused with a new generation
        let fresh = tree.create_group();
        assert!(tree.contains(fresh));
        assert!(!tree.contains(frame));
        assert!(markers.iter().all(|&m| !tree.contains(m)));
        assert!(!tree.delete_child_item(root, 12));
    }

    #[test]
    fn test_replace_children() {
        let mut tree = MarkerTree::new();
        let group = tree.create_group();
        let old: Vec<_> = (0..3).map(|i| marker(&mut tree, f64::from(i))).collect();
        tree.replace_children(group, &old).unwrap();

        let keep = old[1];
        let new = marker(&mut tree, 9.0);
        tree.replace_children(group, &[new, keep]).unwrap();

        assert_eq!(tree.children(group), vec![(0, new), (1, keep)]);
        assert!(!tree.contains(old[0]));
        assert!(!tree.contains(old[2]));
        assert_eq!(tree.marker(keep).unwrap().key(), Some(1));
    }

    #[test]
    fn test_insert_rejects_cycles_and_markers() {
        let mut tree = MarkerTree::new();
        let outer = tree.create_group();
        let inner = tree.create_group();
        tree.insert_child(outer, 0, inner).unwrap();
        assert!(tree.insert_child(inner, 0, outer).is_err());
        assert!(tree.insert_child(outer, 1, outer).is_err());

        let m = marker(&mut tree, 0.0);
        let other = marker(&mut tree, 1.0);
        assert!(tree.insert_child(m, 0, other).is_err());
    }

    #[test]
    fn test_displaced_child_is_detached() {
        let mut tree = MarkerTree::new();
        let group = tree.create_group();
        let first = marker(&mut tree, 0.0);
        let second = marker(&mut tree, 1.0);
        tree.insert_child(group, 0, first).unwrap();
        let displaced = tree.insert_child(group, 0, second).unwrap();
        assert_eq!(displaced, Some(first));
        assert_eq!(tree.parent(first), None);
        assert_eq!(tree.marker(first).unwrap().key(), None);
    }

    #[test]
    fn test_duplicate_positions_keyed_independently() {
        let mut tree = MarkerTree::new();
        let group = tree.create_group();
        let a = marker(&mut tree, 4.0);
        let b = marker(&mut tree, 4.0);
        tree.replace_children(group, &[a, b]).unwrap();
        let positions: Vec<_> = tree.markers(group).map(|(_, m)| m.position()).collect();
        assert_eq!(positions, vec![(4.0, 4.0), (4.0, 4.0)]);
    }
}

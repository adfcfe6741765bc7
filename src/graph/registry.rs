//! Dense columnar node table.
//!
//! Arena + index pattern: every node gets a stable `NodeId` at registration.
//! Topology is CSR-style for parents (flat array + per-node ranges) and an
//! intrusive linked list for children, so downstream cascades never scan the
//! whole table. The `PkgId` <-> `NodeId` mapping lives in a side table.

use super::node::{NodeKind, NodeMetadata};
use crate::id::PkgId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
    pub fn new(idx: usize) -> Self {
        Self(idx as u32)
    }
}

const NO_EDGE: u32 = u32::MAX;

#[derive(Debug, Clone, Default)]
pub struct GraphRegistry {
    // Columnar node data
    kinds: Vec<NodeKind>,
    ids: Vec<PkgId>,
    meta: Vec<NodeMetadata>,

    // Parents (CSR: flat array + (start, count) per node)
    parents_flat: Vec<NodeId>,
    parents_ranges: Vec<(u32, u32)>,

    // Children (intrusive linked list over edge slots)
    first_child: Vec<u32>,
    child_targets: Vec<NodeId>,
    next_child: Vec<u32>,

    // PkgId -> NodeId side table
    index: HashMap<PkgId, NodeId>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.kinds.len()
    }

    pub fn lookup(&self, id: &PkgId) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    pub fn pkg_id(&self, node: NodeId) -> &PkgId {
        &self.ids[node.index()]
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.kinds[node.index()]
    }

    pub fn meta(&self, node: NodeId) -> &NodeMetadata {
        &self.meta[node.index()]
    }

    pub fn layer(&self, node: NodeId) -> u8 {
        self.ids[node.index()].layer
    }

    /// Inserts a fresh node. The caller guarantees the id is not present.
    pub fn push_node(
        &mut self,
        id: PkgId,
        kind: NodeKind,
        parents: &[NodeId],
        meta: NodeMetadata,
    ) -> NodeId {
        debug_assert!(!self.index.contains_key(&id));
        let node = NodeId(self.kinds.len() as u32);

        // Parents: CSR append
        let start = self.parents_flat.len() as u32;
        self.parents_flat.extend_from_slice(parents);
        self.parents_ranges.push((start, parents.len() as u32));

        // Children: link this node into each parent's child list
        self.first_child.push(NO_EDGE);
        for &parent in parents {
            self.link_child(parent, node);
        }

        self.index.insert(id.clone(), node);
        self.ids.push(id);
        self.kinds.push(kind);
        self.meta.push(meta);

        node
    }

    /// Replaces a node's kind and parent set in place. Used when a warm-up
    /// placeholder is upgraded to a real function node: the old (empty)
    /// parent range is abandoned in the flat array and a new range appended.
    pub fn replace_node(
        &mut self,
        node: NodeId,
        kind: NodeKind,
        parents: &[NodeId],
        meta: NodeMetadata,
    ) {
        let idx = node.index();
        let start = self.parents_flat.len() as u32;
        self.parents_flat.extend_from_slice(parents);
        self.parents_ranges[idx] = (start, parents.len() as u32);
        for &parent in parents {
            self.link_child(parent, node);
        }
        self.kinds[idx] = kind;
        self.meta[idx] = meta;
    }

    /// Overwrites a raw-data node's stored value. Returns false if the node
    /// is not raw.
    pub fn set_raw_value(&mut self, node: NodeId, value: crate::compute::Value) -> bool {
        match &mut self.kinds[node.index()] {
            NodeKind::RawData { value: slot } => {
                *slot = Some(value);
                true
            }
            NodeKind::Function(_) => false,
        }
    }

    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let p_idx = parent.index();
        let head = self.first_child[p_idx];
        let edge = self.child_targets.len() as u32;
        self.child_targets.push(child);
        self.next_child.push(head);
        self.first_child[p_idx] = edge;
    }

    #[inline(always)]
    pub fn parents(&self, node: NodeId) -> &[NodeId] {
        let (start, count) = self.parents_ranges[node.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    /// Iterates a node's direct dependents.
    pub fn children(&self, node: NodeId) -> ChildIter<'_> {
        ChildIter { registry: self, edge: self.first_child[node.index()] }
    }
}

pub struct ChildIter<'a> {
    registry: &'a GraphRegistry,
    edge: u32,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.edge == NO_EDGE {
            return None;
        }
        let child = self.registry.child_targets[self.edge as usize];
        self.edge = self.registry.next_child[self.edge as usize];
        Some(child)
    }
}

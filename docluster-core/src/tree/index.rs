//! Indexes over the full condensed hierarchy and its cluster-only skeleton.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{NodeId, TreeEdge, TreeError};

/// Lookup tables built once from the condensed tree edges.
#[derive(Debug)]
pub(super) struct HierarchyIndex {
    point_count: NodeId,
    children: HashMap<NodeId, Vec<NodeId>>,
    parent: HashMap<NodeId, NodeId>,
    max_merge_level: HashMap<NodeId, f64>,
    internal_nodes: BTreeSet<NodeId>,
    cluster_edges: Vec<TreeEdge>,
    cluster_children: HashMap<NodeId, Vec<NodeId>>,
    cluster_child_nodes: HashSet<NodeId>,
}

impl HierarchyIndex {
    /// Indexes `edges`, returning `None` when there is no cluster edge to
    /// build a tree from.
    pub(super) fn new(point_count: NodeId, edges: &[TreeEdge]) -> Result<Option<Self>, TreeError> {
        for (position, edge) in edges.iter().enumerate() {
            for node in [edge.parent, edge.child] {
                if node < 0 {
                    return Err(TreeError::NegativeNodeId {
                        edge: position,
                        node,
                    });
                }
            }
            if !edge.merge_level.is_finite() {
                return Err(TreeError::NonFiniteMergeLevel {
                    edge: position,
                    value: edge.merge_level,
                });
            }
        }

        if !edges.iter().any(TreeEdge::is_cluster_edge) {
            return Ok(None);
        }

        let mut index = Self {
            point_count,
            children: HashMap::new(),
            parent: HashMap::new(),
            max_merge_level: HashMap::new(),
            internal_nodes: BTreeSet::new(),
            cluster_edges: Vec::new(),
            cluster_children: HashMap::new(),
            cluster_child_nodes: HashSet::new(),
        };
        for edge in edges {
            index.insert(*edge);
        }
        Ok(Some(index))
    }

    fn insert(&mut self, edge: TreeEdge) {
        self.children.entry(edge.parent).or_default().push(edge.child);
        self.parent.insert(edge.child, edge.parent);
        self.max_merge_level
            .entry(edge.child)
            .and_modify(|level| *level = level.max(edge.merge_level))
            .or_insert(edge.merge_level);

        for node in [edge.parent, edge.child] {
            if !self.is_point(node) {
                self.internal_nodes.insert(node);
            }
        }

        if edge.is_cluster_edge() {
            self.cluster_children
                .entry(edge.parent)
                .or_default()
                .push(edge.child);
            self.cluster_child_nodes.insert(edge.child);
            self.cluster_edges.push(edge);
        }
    }

    pub(super) fn is_point(&self, node: NodeId) -> bool {
        node < self.point_count
    }

    /// Children over all edges, points included.
    pub(super) fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Children over cluster-to-cluster edges only.
    pub(super) fn cluster_children(&self, node: NodeId) -> &[NodeId] {
        self.cluster_children.get(&node).map_or(&[], Vec::as_slice)
    }

    pub(super) fn is_cluster_child(&self, node: NodeId) -> bool {
        self.cluster_child_nodes.contains(&node)
    }

    pub(super) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent.get(&node).copied()
    }

    /// Highest merge level seen for `node` as a child; `0.0` when it never is.
    pub(super) fn merge_level(&self, node: NodeId) -> f64 {
        self.max_merge_level.get(&node).copied().unwrap_or(0.0)
    }

    /// Internal nodes in ascending id order.
    pub(super) fn internal_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.internal_nodes.iter().copied()
    }

    pub(super) fn cluster_edges(&self) -> &[TreeEdge] {
        &self.cluster_edges
    }
}

//! Reachable point collection and final-cluster attribution.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{NodeId, index::HierarchyIndex};

/// Final clusters reachable beneath every internal node.
#[derive(Debug, Default)]
pub(super) struct Reachability {
    final_clusters: BTreeMap<NodeId, BTreeSet<i64>>,
}

impl Reachability {
    /// Final clusters reachable beneath `node`; empty when none are.
    pub(super) fn final_clusters(&self, node: NodeId) -> Option<&BTreeSet<i64>> {
        self.final_clusters.get(&node)
    }

    pub(super) fn into_mapping(self) -> BTreeMap<NodeId, Vec<i64>> {
        self.final_clusters
            .into_iter()
            .map(|(node, labels)| (node, labels.into_iter().collect()))
            .collect()
    }
}

/// Collects every point beneath `start` through the full children map.
///
/// Each internal node is expanded at most once per call, so shared
/// descendants and cycles in malformed input terminate.
pub(super) fn reachable_points(index: &HierarchyIndex, start: NodeId) -> BTreeSet<NodeId> {
    let mut points = BTreeSet::new();
    let mut expanded = HashSet::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if index.is_point(node) {
            points.insert(node);
            continue;
        }
        if !expanded.insert(node) {
            continue;
        }
        stack.extend(index.children(node).iter().copied());
    }

    points
}

/// Maps every internal node's reachable points through `labels`.
///
/// Noise labels and points beyond the end of `labels` are skipped; nodes that
/// reach no final cluster are left out.
pub(super) fn attribute_final_clusters(index: &HierarchyIndex, labels: &[i64]) -> Reachability {
    let mut final_clusters = BTreeMap::new();
    for node in index.internal_nodes() {
        let clusters: BTreeSet<i64> = reachable_points(index, node)
            .into_iter()
            .filter_map(|point| usize::try_from(point).ok())
            .filter_map(|point| labels.get(point).copied())
            .filter(|&label| label >= 0)
            .collect();
        if !clusters.is_empty() {
            final_clusters.insert(node, clusters);
        }
    }
    Reachability { final_clusters }
}

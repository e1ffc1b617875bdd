//! Root selection and output tree construction.

use std::collections::{HashMap, HashSet};

use super::{NodeId, TreeError, TreeNode, index::HierarchyIndex, reachability::Reachability};

/// Chooses the roots of the output tree in ascending id order.
///
/// A root is an internal node that hangs from no cluster edge, or whose
/// recorded parent is a point. When no node qualifies, the node with the
/// highest merge level is used, the lowest id winning ties.
pub(super) fn select_roots(index: &HierarchyIndex) -> Vec<NodeId> {
    let roots: Vec<NodeId> = index
        .internal_nodes()
        .filter(|&node| {
            !index.is_cluster_child(node)
                || index.parent(node).is_some_and(|parent| index.is_point(parent))
        })
        .collect();
    if !roots.is_empty() {
        return roots;
    }

    let mut best: Option<(NodeId, f64)> = None;
    for node in index.internal_nodes() {
        let level = index.merge_level(node);
        if best.is_none_or(|(_, best_level)| level > best_level) {
            best = Some((node, level));
        }
    }
    best.map(|(node, _)| node).into_iter().collect()
}

enum Step {
    Enter { node: NodeId, parent: Option<NodeId> },
    Exit(NodeId),
}

/// Builds the output forest by post-order traversal of the cluster edges.
///
/// Only internal nodes become tree nodes. A node is placed at most once;
/// later references to it, including the back edges of a cycle, are dropped.
pub(super) fn build_forest(
    index: &HierarchyIndex,
    reach: &Reachability,
    roots: &[NodeId],
) -> Result<Vec<TreeNode>, TreeError> {
    let mut placed = HashSet::new();
    let mut placed_children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut finished: HashMap<NodeId, TreeNode> = HashMap::new();
    let mut forest = Vec::with_capacity(roots.len());

    for &root in roots {
        let mut stack = vec![Step::Enter {
            node: root,
            parent: None,
        }];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter { node, parent } => {
                    if !placed.insert(node) {
                        continue;
                    }
                    if let Some(parent) = parent {
                        placed_children.entry(parent).or_default().push(node);
                    }
                    stack.push(Step::Exit(node));
                    let children = index.cluster_children(node);
                    for &child in children.iter().rev().filter(|&&c| !index.is_point(c)) {
                        stack.push(Step::Enter {
                            node: child,
                            parent: Some(node),
                        });
                    }
                }
                Step::Exit(node) => {
                    let child_ids = placed_children.remove(&node).unwrap_or_default();
                    let mut children = Vec::with_capacity(child_ids.len());
                    for child in child_ids {
                        let built = finished.remove(&child).ok_or(TreeError::InvariantViolation {
                            invariant: "child must be built before its parent",
                            node: child,
                        })?;
                        children.push(built);
                    }
                    finished.insert(node, make_node(index, reach, node, children));
                }
            }
        }

        if let Some(tree) = finished.remove(&root) {
            forest.push(tree);
        }
    }

    Ok(forest)
}

fn make_node(
    index: &HierarchyIndex,
    reach: &Reachability,
    node: NodeId,
    children: Vec<TreeNode>,
) -> TreeNode {
    let final_clusters: Vec<i64> = reach
        .final_clusters(node)
        .map(|clusters| clusters.iter().copied().collect())
        .unwrap_or_default();
    let covered: HashSet<i64> = children
        .iter()
        .flat_map(|child| child.final_clusters.iter().copied())
        .collect();
    let exclusive_clusters = final_clusters
        .iter()
        .copied()
        .filter(|cluster| !covered.contains(cluster))
        .collect();

    TreeNode {
        node_id: node,
        merge_level: index.merge_level(node),
        final_clusters,
        exclusive_clusters,
        children,
    }
}

//! HDBSCAN condensation of a single-linkage dendrogram.
//!
//! A cluster splits only when both branches hold at least `min_cluster_size`
//! points. A small branch sheds its points into the current cluster at the
//! split lambda and the cluster continues down the large branch.

use super::{CondensedCluster, CondensedEvent, linkage::SingleLinkageForest};

/// Condenses the component rooted at `root` and returns its root cluster id.
///
/// Traversal uses an explicit stack of `(node, cluster, lambda)` so deep
/// chain-like dendrograms cannot exhaust the call stack.
pub(super) fn condense_component(
    forest: &SingleLinkageForest,
    root: usize,
    min_cluster_size: usize,
    clusters: &mut Vec<CondensedCluster>,
) -> usize {
    let root_cluster = clusters.len();
    clusters.push(CondensedCluster::new(None, 0.0));

    let mut stack = vec![(root, root_cluster, 0.0_f32)];
    while let Some((node_id, cluster_id, parent_lambda)) = stack.pop() {
        let node = forest.node(node_id);
        let Some((left, right)) = node.children else {
            if let Some(index) = node.point {
                clusters[cluster_id].record(CondensedEvent::Point {
                    index,
                    lambda: parent_lambda,
                });
            }
            continue;
        };

        let lambda = weight_to_lambda(node.weight);
        let left_size = forest.size(left);
        let right_size = forest.size(right);

        match (left_size >= min_cluster_size, right_size >= min_cluster_size) {
            (true, true) => {
                let left_cluster = open_child(clusters, cluster_id, lambda, left_size);
                let right_cluster = open_child(clusters, cluster_id, lambda, right_size);
                stack.push((right, right_cluster, lambda));
                stack.push((left, left_cluster, lambda));
            }
            (true, false) => {
                shed_points(forest, right, &mut clusters[cluster_id], lambda);
                stack.push((left, cluster_id, lambda));
            }
            (false, true) => {
                shed_points(forest, left, &mut clusters[cluster_id], lambda);
                stack.push((right, cluster_id, lambda));
            }
            (false, false) => {
                shed_points(forest, left, &mut clusters[cluster_id], lambda);
                shed_points(forest, right, &mut clusters[cluster_id], lambda);
            }
        }
    }

    root_cluster
}

fn open_child(
    clusters: &mut Vec<CondensedCluster>,
    parent: usize,
    lambda: f32,
    size: usize,
) -> usize {
    let child = clusters.len();
    clusters.push(CondensedCluster::new(Some(parent), lambda));
    clusters[parent].children.push(child);
    clusters[parent].record(CondensedEvent::ChildCluster {
        cluster: child,
        lambda,
        size,
    });
    child
}

fn shed_points(
    forest: &SingleLinkageForest,
    node_id: usize,
    cluster: &mut CondensedCluster,
    lambda: f32,
) {
    let mut stack = vec![node_id];
    while let Some(current) = stack.pop() {
        let node = forest.node(current);
        if let Some(index) = node.point {
            cluster.record(CondensedEvent::Point { index, lambda });
        } else if let Some((left, right)) = node.children {
            stack.push(right);
            stack.push(left);
        }
    }
}

/// Converts a merge distance into a density level.
///
/// Zero distances are clamped to `f32::EPSILON` so duplicate embeddings yield
/// a large but finite lambda.
pub(super) fn weight_to_lambda(weight: f32) -> f32 {
    1.0 / weight.max(f32::EPSILON)
}

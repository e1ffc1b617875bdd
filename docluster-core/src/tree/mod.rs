//! Cluster-tree reconstruction from a condensed dendrogram.
//!
//! Given the condensed tree exported by a clustering backend and the final
//! label of every point, the engine rebuilds a navigable tree of internal
//! merge nodes. Each output node lists the final clusters reachable beneath it
//! and the clusters that first become distinguishable at that level
//! (reachable, but not reachable through any child).
//!
//! Extraction never aborts a clustering run: [`extract_cluster_tree`] turns
//! any failure into a [`DegradedTree`] and logs it at `warn`.

mod build;
mod index;
mod reachability;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::define_error_codes;

use self::index::HierarchyIndex;

/// Identifier of a condensed-tree node: `< N` is a point, `>= N` a cluster.
pub type NodeId = i64;

/// Maximum number of cluster-to-cluster edges listed in the output.
pub const EDGE_DISPLAY_LIMIT: usize = 500;

/// Explanatory note attached to every successfully extracted tree.
pub const TREE_NOTE: &str = "Tree shows cluster hierarchy. Higher lambda_val means clusters \
merge later. final_clusters contains all clusters for a node. exclusive_clusters contains only \
clusters not in children (for parent nodes).";

/// One edge of a condensed tree.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeEdge {
    /// Internal cluster node the child hangs from.
    pub parent: NodeId,
    /// Point or cluster node attached to `parent`.
    pub child: NodeId,
    /// Density (lambda) at which the child separates from the parent.
    #[serde(rename = "lambda_val")]
    pub merge_level: f64,
    /// Number of points under `child`; `1` marks a single point.
    pub child_size: u64,
}

impl TreeEdge {
    /// Creates a new edge.
    #[must_use]
    pub const fn new(parent: NodeId, child: NodeId, merge_level: f64, child_size: u64) -> Self {
        Self {
            parent,
            child,
            merge_level,
            child_size,
        }
    }

    /// Returns `true` when the edge links two cluster nodes.
    #[must_use]
    pub const fn is_cluster_edge(&self) -> bool {
        self.child_size > 1
    }
}

/// A node of the reconstructed cluster tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Internal cluster node id.
    #[serde(rename = "cluster_id")]
    pub node_id: NodeId,
    /// Highest merge level recorded for this node as a child; `0.0` for roots.
    #[serde(rename = "lambda_val")]
    pub merge_level: f64,
    /// Every final cluster reachable beneath this node, ascending.
    pub final_clusters: Vec<i64>,
    /// Final clusters reachable here but through none of the children.
    pub exclusive_clusters: Vec<i64>,
    /// Child cluster nodes in condensed-tree order.
    pub children: Vec<TreeNode>,
}

/// Successful tree extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterTree {
    /// Root nodes in ascending node id order.
    pub tree: Vec<TreeNode>,
    /// The first [`EDGE_DISPLAY_LIMIT`] cluster-to-cluster edges.
    pub edges: Vec<TreeEdge>,
    /// Total number of cluster-to-cluster edges.
    #[serde(default)]
    pub total_edges: usize,
    /// Internal node id to the final clusters reachable beneath it.
    pub cluster_mapping: BTreeMap<NodeId, Vec<i64>>,
    /// Human-readable explanation of the fields.
    #[serde(default)]
    pub note: String,
}

impl ClusterTree {
    /// Returns the structure produced when the input has no cluster edges.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tree: Vec::new(),
            edges: Vec::new(),
            total_edges: 0,
            cluster_mapping: BTreeMap::new(),
            note: TREE_NOTE.to_owned(),
        }
    }
}

/// Output produced when extraction failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DegradedTree {
    /// Always empty.
    pub tree: Vec<TreeNode>,
    /// Description of the failure.
    pub error: String,
    /// Always empty.
    pub cluster_mapping: BTreeMap<NodeId, Vec<i64>>,
}

/// Result of tree extraction as embedded in reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeExtraction {
    /// The tree was rebuilt.
    Complete(ClusterTree),
    /// Extraction failed; the pipeline continued without a tree.
    Degraded(DegradedTree),
}

impl TreeExtraction {
    /// Returns the root nodes, empty for degraded output.
    #[must_use]
    pub fn roots(&self) -> &[TreeNode] {
        match self {
            Self::Complete(tree) => &tree.tree,
            Self::Degraded(tree) => &tree.tree,
        }
    }

    /// Returns the failure message for degraded output.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Complete(_) => None,
            Self::Degraded(tree) => Some(&tree.error),
        }
    }
}

/// Errors raised while rebuilding a cluster tree.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum TreeError {
    /// An edge referenced a negative node id.
    #[error("edge {edge} references negative node id {node}")]
    NegativeNodeId {
        /// Position of the edge in the input.
        edge: usize,
        /// The offending id.
        node: NodeId,
    },
    /// An edge carried a NaN or infinite merge level.
    #[error("edge {edge} has non-finite merge level {value}")]
    NonFiniteMergeLevel {
        /// Position of the edge in the input.
        edge: usize,
        /// The offending value.
        value: f64,
    },
    /// The point count does not fit the node id space.
    #[error("point count {point_count} exceeds the node id range")]
    PointCountOverflow {
        /// The rejected point count.
        point_count: usize,
    },
    /// An internal consistency check failed.
    #[error("tree invariant violated: {invariant} (node {node})")]
    InvariantViolation {
        /// Description of the broken invariant.
        invariant: &'static str,
        /// Node being processed.
        node: NodeId,
    },
}

define_error_codes! {
    /// Machine-readable error codes for [`TreeError`].
    enum TreeErrorCode for TreeError {
        /// An edge referenced a negative node id.
        NegativeNodeId => NegativeNodeId { .. } => "TREE_NEGATIVE_NODE_ID",
        /// An edge carried a NaN or infinite merge level.
        NonFiniteMergeLevel => NonFiniteMergeLevel { .. } => "TREE_NON_FINITE_MERGE_LEVEL",
        /// The point count does not fit the node id space.
        PointCountOverflow => PointCountOverflow { .. } => "TREE_POINT_COUNT_OVERFLOW",
        /// An internal consistency check failed.
        InvariantViolation => InvariantViolation { .. } => "TREE_INVARIANT_VIOLATION",
    }
}

/// Rebuilds the cluster tree, surfacing failures as [`TreeError`].
///
/// `point_count` is the number of clustered points `N`. Labels beyond the end
/// of `labels` are ignored, as are negative (noise) labels.
///
/// # Errors
/// Returns [`TreeError`] for negative node ids, non-finite merge levels or a
/// broken internal invariant.
///
/// # Examples
/// ```
/// use docluster_core::{TreeEdge, try_extract_cluster_tree};
///
/// let edges = [
///     TreeEdge::new(3, 4, 1.5, 2),
///     TreeEdge::new(4, 0, 2.0, 1),
///     TreeEdge::new(4, 1, 2.0, 1),
/// ];
/// let tree = try_extract_cluster_tree(3, &edges, &[0, 0, -1])?;
/// assert_eq!(tree.tree.len(), 1);
/// assert_eq!(tree.tree[0].node_id, 3);
/// assert_eq!(tree.tree[0].children[0].final_clusters, vec![0]);
/// # Ok::<(), docluster_core::TreeError>(())
/// ```
pub fn try_extract_cluster_tree(
    point_count: usize,
    edges: &[TreeEdge],
    labels: &[i64],
) -> Result<ClusterTree, TreeError> {
    let point_count = NodeId::try_from(point_count)
        .map_err(|_| TreeError::PointCountOverflow { point_count })?;
    let Some(index) = HierarchyIndex::new(point_count, edges)? else {
        return Ok(ClusterTree::empty());
    };

    let reach = reachability::attribute_final_clusters(&index, labels);
    let roots = build::select_roots(&index);
    let tree = build::build_forest(&index, &reach, &roots)?;

    let cluster_edges = index.cluster_edges();
    Ok(ClusterTree {
        tree,
        edges: cluster_edges
            .iter()
            .take(EDGE_DISPLAY_LIMIT)
            .copied()
            .collect(),
        total_edges: cluster_edges.len(),
        cluster_mapping: reach.into_mapping(),
        note: TREE_NOTE.to_owned(),
    })
}

/// Rebuilds the cluster tree, degrading to an empty tree on failure.
#[instrument(
    name = "tree.extract",
    skip(edges, labels),
    fields(edges = edges.len(), labels = labels.len())
)]
pub fn extract_cluster_tree(
    point_count: usize,
    edges: &[TreeEdge],
    labels: &[i64],
) -> TreeExtraction {
    match try_extract_cluster_tree(point_count, edges, labels) {
        Ok(tree) => TreeExtraction::Complete(tree),
        Err(err) => {
            warn!(error = %err, code = err.code().as_str(), "could not extract tree structure");
            TreeExtraction::Degraded(DegradedTree {
                tree: Vec::new(),
                error: err.to_string(),
                cluster_mapping: BTreeMap::new(),
            })
        }
    }
}

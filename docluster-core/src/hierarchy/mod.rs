//! HDBSCAN hierarchy extraction from the mutual-reachability spanning forest.
//!
//! The stage runs in four steps:
//!
//! - Derive a single-linkage dendrogram from the spanning-forest edges.
//! - Condense the dendrogram with `min_cluster_size`, so a cluster only splits
//!   when both branches are large enough and otherwise sheds points.
//! - Score clusters by stability ("excess of mass") and select the most
//!   persistent ones.
//! - Label every point with its selected cluster, or `-1` for noise.
//!
//! The condensed tree is also exported as [`TreeEdge`]s, with points numbered
//! `0..N-1` and condensed clusters numbered from `N`, which is the input
//! shape of the tree reconstruction engine.

mod condense;
mod linkage;
mod selection;

use std::num::NonZeroUsize;

use crate::{
    error::define_error_codes,
    mst::WeightedEdge,
    tree::{NodeId, TreeEdge},
};

use self::linkage::SingleLinkageForest;

/// Label assigned to points outside every selected cluster.
pub const NOISE_LABEL: i64 = -1;

/// Errors returned by hierarchy extraction.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum HierarchyError {
    /// Hierarchy extraction requires at least one node.
    #[error("cannot extract a hierarchy for an empty dataset")]
    EmptyDataset,
    /// The configured minimum cluster size exceeds the dataset size.
    #[error("min_cluster_size {min_cluster_size} exceeds node_count {node_count}")]
    MinClusterSizeTooLarge {
        /// Number of points in the dataset.
        node_count: usize,
        /// Minimum cluster size requested by the caller.
        min_cluster_size: usize,
    },
    /// A spanning-forest edge weight was negative or non-finite.
    #[error("invalid edge weight {weight} for edge ({left}, {right})")]
    InvalidEdgeWeight {
        /// Smaller endpoint id for the offending edge.
        left: usize,
        /// Larger endpoint id for the offending edge.
        right: usize,
        /// Invalid weight value observed on the edge.
        weight: f32,
    },
}

define_error_codes! {
    /// Machine-readable error codes for [`HierarchyError`].
    enum HierarchyErrorCode for HierarchyError {
        /// The caller requested hierarchy extraction for an empty dataset.
        EmptyDataset => EmptyDataset => "HIERARCHY_EMPTY_DATASET",
        /// The configured minimum cluster size exceeds the dataset size.
        MinClusterSizeTooLarge => MinClusterSizeTooLarge { .. } => "HIERARCHY_MIN_CLUSTER_SIZE_TOO_LARGE",
        /// An input edge weight was invalid for hierarchy extraction.
        InvalidEdgeWeight => InvalidEdgeWeight { .. } => "HIERARCHY_INVALID_EDGE_WEIGHT",
    }
}

/// Configuration for hierarchy extraction.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyConfig {
    min_cluster_size: NonZeroUsize,
    allow_single_cluster: bool,
}

impl HierarchyConfig {
    /// Creates a configuration using the provided `min_cluster_size`.
    ///
    /// Root clusters are not selectable by default, matching the usual
    /// HDBSCAN behaviour.
    #[must_use]
    pub fn new(min_cluster_size: NonZeroUsize) -> Self {
        Self {
            min_cluster_size,
            allow_single_cluster: false,
        }
    }

    /// Allows a root cluster to be selected as a final cluster.
    #[must_use]
    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    /// Returns the minimum cluster size.
    #[must_use]
    pub fn min_cluster_size(&self) -> NonZeroUsize {
        self.min_cluster_size
    }

    /// Returns whether root clusters may be selected.
    #[must_use]
    pub fn allow_single_cluster(&self) -> bool {
        self.allow_single_cluster
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CondensedEvent {
    Point {
        index: usize,
        lambda: f32,
    },
    ChildCluster {
        cluster: usize,
        lambda: f32,
        size: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
struct CondensedCluster {
    parent: Option<usize>,
    birth_lambda: f32,
    stability: f32,
    events: Vec<CondensedEvent>,
    children: Vec<usize>,
}

impl CondensedCluster {
    fn new(parent: Option<usize>, birth_lambda: f32) -> Self {
        Self {
            parent,
            birth_lambda,
            stability: 0.0,
            events: Vec::new(),
            children: Vec::new(),
        }
    }

    fn record(&mut self, event: CondensedEvent) {
        let (lambda, size) = match event {
            CondensedEvent::Point { lambda, .. } => (lambda, 1.0),
            CondensedEvent::ChildCluster { lambda, size, .. } => (lambda, size as f32),
        };
        self.stability += (lambda - self.birth_lambda) * size;
        self.events.push(event);
    }
}

/// Condensed clusters in creation order; a child always has a larger id than
/// its parent.
#[derive(Clone, Debug, PartialEq)]
struct CondensedForest {
    clusters: Vec<CondensedCluster>,
}

impl CondensedForest {
    fn from_spanning_forest(
        node_count: usize,
        edges: &[WeightedEdge],
        min_cluster_size: usize,
    ) -> Self {
        let linkage = SingleLinkageForest::from_edges(node_count, edges);
        let mut clusters = Vec::new();
        for root in linkage.roots() {
            // Components below the minimum size never form a cluster and end
            // up as noise.
            if linkage.size(root) >= min_cluster_size {
                condense::condense_component(&linkage, root, min_cluster_size, &mut clusters);
            }
        }
        Self { clusters }
    }

    fn tree_edges(&self, node_count: usize) -> Vec<TreeEdge> {
        let offset = node_count as NodeId;
        let mut edges = Vec::new();
        for (id, cluster) in self.clusters.iter().enumerate() {
            let parent = offset + id as NodeId;
            for event in &cluster.events {
                let edge = match *event {
                    CondensedEvent::Point { index, lambda } => {
                        TreeEdge::new(parent, index as NodeId, f64::from(lambda), 1)
                    }
                    CondensedEvent::ChildCluster {
                        cluster,
                        lambda,
                        size,
                    } => TreeEdge::new(
                        parent,
                        offset + cluster as NodeId,
                        f64::from(lambda),
                        size as u64,
                    ),
                };
                edges.push(edge);
            }
        }
        edges
    }
}

/// Flat labels plus the exported condensed tree for one dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct CondensedHierarchy {
    labels: Vec<i64>,
    edges: Vec<TreeEdge>,
    cluster_count: usize,
}

impl CondensedHierarchy {
    /// Returns one label per point: `0..k-1` or [`NOISE_LABEL`].
    #[must_use]
    #[rustfmt::skip]
    pub fn labels(&self) -> &[i64] { &self.labels }

    /// Returns the condensed tree edges.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &[TreeEdge] { &self.edges }

    /// Returns the number of selected clusters.
    #[must_use]
    #[rustfmt::skip]
    pub fn cluster_count(&self) -> usize { self.cluster_count }

    /// Consumes the hierarchy, returning labels and edges.
    #[must_use]
    pub fn into_parts(self) -> (Vec<i64>, Vec<TreeEdge>) {
        (self.labels, self.edges)
    }
}

/// Extracts flat labels and the condensed tree from a spanning forest.
///
/// The input edges must describe a minimum spanning forest over `node_count`
/// points, where each edge weight is a mutual-reachability distance.
///
/// # Errors
/// Returns [`HierarchyError`] when `node_count == 0`, when `min_cluster_size`
/// is larger than `node_count`, or when an edge weight is negative or
/// non-finite.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use docluster_core::{HierarchyConfig, WeightedEdge, extract_hierarchy};
///
/// let edges = [
///     WeightedEdge::new(0, 1, 1.0, 0),
///     WeightedEdge::new(2, 3, 1.0, 1),
///     WeightedEdge::new(1, 2, 10.0, 2),
/// ];
/// let config = HierarchyConfig::new(NonZeroUsize::new(2).expect("non-zero"));
/// let hierarchy = extract_hierarchy(4, &edges, config)?;
/// assert_eq!(hierarchy.labels(), &[0, 0, 1, 1]);
/// # Ok::<(), docluster_core::HierarchyError>(())
/// ```
pub fn extract_hierarchy(
    node_count: usize,
    edges: &[WeightedEdge],
    config: HierarchyConfig,
) -> Result<CondensedHierarchy, HierarchyError> {
    let min_cluster_size = config.min_cluster_size().get();
    if node_count == 0 {
        return Err(HierarchyError::EmptyDataset);
    }
    if min_cluster_size > node_count {
        return Err(HierarchyError::MinClusterSizeTooLarge {
            node_count,
            min_cluster_size,
        });
    }
    for edge in edges {
        let weight = edge.weight();
        if !weight.is_finite() || weight < 0.0 {
            return Err(HierarchyError::InvalidEdgeWeight {
                left: edge.source(),
                right: edge.target(),
                weight,
            });
        }
    }

    let condensed = CondensedForest::from_spanning_forest(node_count, edges, min_cluster_size);
    let selected = selection::select_stable_clusters(&condensed, config.allow_single_cluster());
    let labels = selection::label_points(node_count, &condensed, &selected);
    Ok(CondensedHierarchy {
        labels,
        edges: condensed.tree_edges(node_count),
        cluster_count: selected.len(),
    })
}

#[cfg(test)]
mod tests;

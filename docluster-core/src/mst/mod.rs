//! Kruskal spanning forests over the mutual-reachability graph.
//!
//! The backend hands every pairwise weight to [`parallel_kruskal`]. Edge
//! validation and the global sort run on Rayon; accepting edges is a single
//! sequential sweep so equal weights always resolve to the same forest.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::{error::define_error_codes, union_find::DisjointSet};

/// Failures raised while building a spanning forest.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum MstError {
    /// No nodes were supplied.
    #[error("cannot compute an MST for an empty graph")]
    EmptyGraph,
    /// An endpoint lies outside `0..node_count`.
    #[error("edge references node {node}, but node_count is {node_count}")]
    InvalidNodeId {
        /// Offending endpoint.
        node: usize,
        /// Nodes in the graph.
        node_count: usize,
    },
    /// A weight was NaN or infinite.
    #[error("edge ({left}, {right}) has non-finite weight")]
    NonFiniteWeight {
        /// First endpoint as supplied.
        left: usize,
        /// Second endpoint as supplied.
        right: usize,
    },
}

define_error_codes! {
    /// Stable identifiers for [`MstError`].
    enum MstErrorCode for MstError {
        /// No nodes were supplied.
        EmptyGraph => EmptyGraph => "MST_EMPTY_GRAPH",
        /// An endpoint lies outside the graph.
        InvalidNodeId => InvalidNodeId { .. } => "MST_INVALID_NODE_ID",
        /// A weight was NaN or infinite.
        NonFiniteWeight => NonFiniteWeight { .. } => "MST_NON_FINITE_WEIGHT",
    }
}

/// Undirected weighted edge between two items.
///
/// Edges order by weight, then endpoints, then `sequence`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedEdge {
    endpoints: (usize, usize),
    weight: f32,
    sequence: u64,
}

impl WeightedEdge {
    /// Builds an edge; `sequence` is the caller's stable tie-break.
    #[must_use]
    pub const fn new(source: usize, target: usize, weight: f32, sequence: u64) -> Self {
        Self {
            endpoints: (source, target),
            weight,
            sequence,
        }
    }

    #[must_use]
    pub const fn source(&self) -> usize {
        self.endpoints.0
    }

    #[must_use]
    pub const fn target(&self) -> usize {
        self.endpoints.1
    }

    #[must_use]
    pub const fn weight(&self) -> f32 {
        self.weight
    }

    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Validates the edge against `node_count` and orients it low-to-high.
    /// Loops yield `None`.
    fn oriented(self, node_count: usize) -> Result<Option<Self>, MstError> {
        let (left, right) = self.endpoints;
        if let Some(node) = [left, right].into_iter().find(|&node| node >= node_count) {
            return Err(MstError::InvalidNodeId { node, node_count });
        }
        if !self.weight.is_finite() {
            return Err(MstError::NonFiniteWeight { left, right });
        }
        Ok((left != right).then(|| Self {
            endpoints: (left.min(right), left.max(right)),
            ..self
        }))
    }
}

impl Eq for WeightedEdge {}

impl Ord for WeightedEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then(self.endpoints.cmp(&other.endpoints))
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for WeightedEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of [`parallel_kruskal`]: oriented edges in ascending weight order
/// plus the number of components they leave.
#[derive(Clone, Debug, PartialEq)]
pub struct MinimumSpanningForest {
    edges: Vec<WeightedEdge>,
    component_count: usize,
}

impl MinimumSpanningForest {
    #[must_use]
    pub fn edges(&self) -> &[WeightedEdge] {
        &self.edges
    }

    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.component_count
    }

    /// `true` when every node ended up in one component.
    #[must_use]
    pub const fn is_tree(&self) -> bool {
        self.component_count == 1
    }
}

/// Builds a minimum spanning forest over `node_count` nodes.
///
/// Edges are undirected; loops are dropped and parallel edges collapse to the
/// lightest one.
///
/// # Errors
/// [`MstError::EmptyGraph`] when `node_count == 0`,
/// [`MstError::InvalidNodeId`] for an out-of-range endpoint and
/// [`MstError::NonFiniteWeight`] for a NaN or infinite weight.
///
/// # Examples
/// ```
/// use docluster_core::{WeightedEdge, parallel_kruskal};
///
/// let edges = [
///     WeightedEdge::new(0, 1, 1.0, 0),
///     WeightedEdge::new(1, 2, 3.0, 1),
///     WeightedEdge::new(0, 2, 2.0, 2),
/// ];
/// let forest = parallel_kruskal(3, &edges).expect("valid graph");
/// assert!(forest.is_tree());
/// assert_eq!(forest.edges().len(), 2);
/// ```
pub fn parallel_kruskal(
    node_count: usize,
    edges: &[WeightedEdge],
) -> Result<MinimumSpanningForest, MstError> {
    if node_count == 0 {
        return Err(MstError::EmptyGraph);
    }

    let candidates = sorted_candidates(edges, node_count)?;
    let mut components = DisjointSet::new(node_count);
    let mut forest = MinimumSpanningForest {
        edges: Vec::with_capacity(node_count - 1),
        component_count: node_count,
    };

    for edge in candidates {
        if forest.is_tree() {
            break;
        }
        let (left, right) = edge.endpoints;
        if components.find(left) != components.find(right) {
            components.union(left, right);
            forest.edges.push(edge);
            forest.component_count -= 1;
        }
    }
    Ok(forest)
}

fn sorted_candidates(
    edges: &[WeightedEdge],
    node_count: usize,
) -> Result<Vec<WeightedEdge>, MstError> {
    let oriented: Vec<Option<WeightedEdge>> = edges
        .par_iter()
        .map(|edge| edge.oriented(node_count))
        .collect::<Result<_, _>>()?;
    let mut candidates: Vec<WeightedEdge> = oriented.into_iter().flatten().collect();
    candidates.par_sort_unstable();
    Ok(candidates)
}

#[cfg(test)]
mod tests;

//! Density-based clustering behind a narrow `fit` interface.
//!
//! [`HdbscanBackend`] runs the CPU pipeline end to end:
//!
//! - Compute pairwise distances under the configured [`Metric`].
//! - Derive core distances from each point's `min_samples`-th nearest other
//!   point.
//! - Weight every pair by mutual reachability and build the minimum spanning
//!   forest (Kruskal).
//! - Condense the forest and select stable clusters.

use std::{num::NonZeroUsize, sync::Arc};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    distance::{DistanceError, Metric},
    error::define_error_codes,
    hierarchy::{HierarchyConfig, HierarchyError, extract_hierarchy},
    mst::{MstError, WeightedEdge, parallel_kruskal},
    tree::TreeEdge,
};

/// Parameters handed to a [`ClusterBackend`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackendConfig {
    /// Smallest group of points treated as a cluster.
    pub min_cluster_size: NonZeroUsize,
    /// Neighbourhood size used for core distances.
    pub min_samples: NonZeroUsize,
    /// Distance metric between points.
    pub metric: Metric,
    /// Whether the root cluster may be selected on its own.
    pub allow_single_cluster: bool,
}

/// Output of [`ClusterBackend::fit`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterFit {
    /// One label per input row: `0..k-1` or `-1` for noise.
    pub labels: Vec<i64>,
    /// Condensed tree with points `0..N-1` and clusters numbered from `N`.
    pub edges: Vec<TreeEdge>,
}

/// Errors raised by clustering backends.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BackendError {
    /// The input matrix had no rows.
    #[error("cannot cluster an empty matrix")]
    EmptyMatrix,
    /// A row differed in length from the first row.
    #[error("row {row} has dimension {found}, expected {expected}")]
    RaggedMatrix {
        /// Offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A pairwise distance could not be computed.
    #[error("distance between rows {left} and {right} failed: {error}")]
    Distance {
        /// First row of the pair.
        left: usize,
        /// Second row of the pair.
        right: usize,
        /// Underlying distance failure.
        #[source]
        error: DistanceError,
    },
    /// The worker pool could not be created.
    #[error("failed to build a pool of {jobs} workers: {message}")]
    ThreadPool {
        /// Requested worker count.
        jobs: usize,
        /// Builder message.
        message: Arc<str>,
    },
    /// Spanning forest construction failed.
    #[error("spanning forest failed: {message} ({code})")]
    SpanningForest {
        /// Code of the underlying [`MstError`].
        code: Arc<str>,
        /// Message of the underlying error.
        message: Arc<str>,
    },
    /// Hierarchy extraction failed.
    #[error("hierarchy extraction failed: {message} ({code})")]
    Hierarchy {
        /// Code of the underlying [`HierarchyError`].
        code: Arc<str>,
        /// Message of the underlying error.
        message: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`BackendError`] variants.
    enum BackendErrorCode for BackendError {
        /// The input matrix had no rows.
        EmptyMatrix => EmptyMatrix => "BACKEND_EMPTY_MATRIX",
        /// A row differed in length from the first row.
        RaggedMatrix => RaggedMatrix { .. } => "BACKEND_RAGGED_MATRIX",
        /// A pairwise distance could not be computed.
        Distance => Distance { .. } => "BACKEND_DISTANCE_FAILED",
        /// The worker pool could not be created.
        ThreadPool => ThreadPool { .. } => "BACKEND_THREAD_POOL",
        /// Spanning forest construction failed.
        SpanningForest => SpanningForest { .. } => "BACKEND_SPANNING_FOREST_FAILED",
        /// Hierarchy extraction failed.
        Hierarchy => Hierarchy { .. } => "BACKEND_HIERARCHY_FAILED",
    }
}

impl From<MstError> for BackendError {
    fn from(error: MstError) -> Self {
        Self::SpanningForest {
            code: Arc::from(error.code().as_str()),
            message: Arc::from(error.to_string()),
        }
    }
}

impl From<HierarchyError> for BackendError {
    fn from(error: HierarchyError) -> Self {
        Self::Hierarchy {
            code: Arc::from(error.code().as_str()),
            message: Arc::from(error.to_string()),
        }
    }
}

/// A hierarchical clustering implementation.
///
/// The tree engine and result assembly only consume the returned
/// [`ClusterFit`], so any backend producing condensed-tree edges in the same
/// numbering can be plugged in.
pub trait ClusterBackend {
    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Clusters the rows of `matrix`.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the input is malformed or a stage fails.
    fn fit(&self, matrix: &[Vec<f32>], config: &BackendConfig)
    -> Result<ClusterFit, BackendError>;
}

/// HDBSCAN over exact pairwise mutual-reachability distances.
#[derive(Clone, Debug, Default)]
pub struct HdbscanBackend {
    jobs: Option<NonZeroUsize>,
}

impl HdbscanBackend {
    /// Creates a backend that uses the global Rayon pool.
    #[must_use]
    pub const fn new() -> Self {
        Self { jobs: None }
    }

    /// Bounds the worker count; `0` uses every core.
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = NonZeroUsize::new(jobs);
        self
    }

    /// Returns the configured worker bound.
    #[must_use]
    pub const fn jobs(&self) -> Option<NonZeroUsize> {
        self.jobs
    }
}

impl ClusterBackend for HdbscanBackend {
    fn name(&self) -> &str {
        "hdbscan"
    }

    #[instrument(
        name = "backend.fit",
        skip(self, matrix, config),
        fields(rows = matrix.len(), metric = %config.metric)
    )]
    fn fit(
        &self,
        matrix: &[Vec<f32>],
        config: &BackendConfig,
    ) -> Result<ClusterFit, BackendError> {
        validate_matrix(matrix)?;
        match self.jobs {
            None => fit_hdbscan(matrix, config),
            Some(jobs) => rayon::ThreadPoolBuilder::new()
                .num_threads(jobs.get())
                .build()
                .map_err(|error| BackendError::ThreadPool {
                    jobs: jobs.get(),
                    message: Arc::from(error.to_string()),
                })?
                .install(|| fit_hdbscan(matrix, config)),
        }
    }
}

fn validate_matrix(matrix: &[Vec<f32>]) -> Result<(), BackendError> {
    let first = matrix.first().ok_or(BackendError::EmptyMatrix)?;
    let expected = first.len();
    match matrix.iter().position(|row| row.len() != expected) {
        Some(row) => Err(BackendError::RaggedMatrix {
            row,
            expected,
            found: matrix.get(row).map_or(0, Vec::len),
        }),
        None => Ok(()),
    }
}

fn fit_hdbscan(matrix: &[Vec<f32>], config: &BackendConfig) -> Result<ClusterFit, BackendError> {
    let items = matrix.len();
    let distances = pairwise_distances(matrix, config.metric)?;
    let core_distances: Vec<f32> = distances
        .par_iter()
        .enumerate()
        .map(|(point, row)| core_distance(point, row, config.min_samples))
        .collect();

    let mutual_edges = mutual_reachability_edges(&distances, &core_distances);
    let forest = parallel_kruskal(items, &mutual_edges)?;
    debug!(
        edges = forest.edges().len(),
        components = forest.component_count(),
        "built mutual-reachability spanning forest"
    );

    let hierarchy = extract_hierarchy(
        items,
        forest.edges(),
        HierarchyConfig::new(config.min_cluster_size)
            .with_allow_single_cluster(config.allow_single_cluster),
    )?;
    debug!(clusters = hierarchy.cluster_count(), "selected stable clusters");

    let (labels, edges) = hierarchy.into_parts();
    Ok(ClusterFit { labels, edges })
}

fn pairwise_distances(matrix: &[Vec<f32>], metric: Metric) -> Result<Vec<Vec<f32>>, BackendError> {
    matrix
        .par_iter()
        .enumerate()
        .map(|(left, row)| {
            matrix
                .iter()
                .enumerate()
                .map(|(right, other)| {
                    if left == right {
                        return Ok(0.0);
                    }
                    metric
                        .distance(row, other)
                        .map_err(|error| BackendError::Distance { left, right, error })
                })
                .collect()
        })
        .collect()
}

/// Distance to the `min_samples`-th nearest other point, or to the farthest
/// one when fewer exist.
fn core_distance(point: usize, row: &[f32], min_samples: NonZeroUsize) -> f32 {
    let mut others: Vec<f32> = row
        .iter()
        .enumerate()
        .filter(|&(other, _)| other != point)
        .map(|(_, &distance)| distance)
        .collect();
    if others.is_empty() {
        return 0.0;
    }
    let rank = min_samples.get().min(others.len()) - 1;
    let (_, kth, _) = others.select_nth_unstable_by(rank, f32::total_cmp);
    *kth
}

fn mutual_reachability_edges(distances: &[Vec<f32>], core_distances: &[f32]) -> Vec<WeightedEdge> {
    let items = distances.len();
    distances
        .par_iter()
        .enumerate()
        .flat_map_iter(|(left, row)| {
            let core_left = core_distances.get(left).copied().unwrap_or_default();
            row.iter()
                .enumerate()
                .skip(left + 1)
                .map(move |(right, &distance)| {
                    let core_right = core_distances.get(right).copied().unwrap_or_default();
                    let weight = distance.max(core_left).max(core_right);
                    WeightedEdge::new(left, right, weight, (left * items + right) as u64)
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::hierarchy::NOISE_LABEL;

    fn config(min_cluster_size: usize, min_samples: usize, metric: Metric) -> BackendConfig {
        BackendConfig {
            min_cluster_size: NonZeroUsize::new(min_cluster_size).expect("non-zero"),
            min_samples: NonZeroUsize::new(min_samples).expect("non-zero"),
            metric,
            allow_single_cluster: false,
        }
    }

    #[fixture]
    fn two_blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
            vec![10.1, 10.1],
        ]
    }

    #[rstest]
    #[case::euclidean(Metric::Euclidean)]
    #[case::manhattan(Metric::Manhattan)]
    fn separates_two_blobs(two_blobs: Vec<Vec<f32>>, #[case] metric: Metric) {
        let fit = HdbscanBackend::new()
            .fit(&two_blobs, &config(3, 2, metric))
            .expect("fit must succeed");

        assert_eq!(fit.labels.len(), 8);
        let first = fit.labels[0];
        let second = fit.labels[4];
        assert_ne!(first, NOISE_LABEL);
        assert_ne!(second, NOISE_LABEL);
        assert_ne!(first, second);
        assert!(fit.labels[..4].iter().all(|&label| label == first));
        assert!(fit.labels[4..].iter().all(|&label| label == second));
    }

    #[rstest]
    fn exports_condensed_tree_numbered_from_point_count(two_blobs: Vec<Vec<f32>>) {
        let fit = HdbscanBackend::new()
            .fit(&two_blobs, &config(3, 2, Metric::Euclidean))
            .expect("fit must succeed");

        let point_edges: Vec<&TreeEdge> =
            fit.edges.iter().filter(|edge| edge.child_size == 1).collect();
        assert_eq!(point_edges.len(), 8);
        assert!(fit.edges.iter().all(|edge| edge.parent >= 8));
        assert_eq!(fit.edges.iter().filter(|edge| edge.is_cluster_edge()).count(), 2);
    }

    #[rstest]
    fn bounded_pool_matches_global_pool(two_blobs: Vec<Vec<f32>>) {
        let settings = config(3, 2, Metric::Euclidean);
        let global = HdbscanBackend::new().fit(&two_blobs, &settings).expect("fit");
        let bounded = HdbscanBackend::new()
            .with_jobs(1)
            .fit(&two_blobs, &settings)
            .expect("fit");
        assert_eq!(global, bounded);
    }

    #[test]
    fn zero_jobs_means_every_core() {
        assert_eq!(HdbscanBackend::new().with_jobs(0).jobs(), None);
    }

    #[rstest]
    #[case::empty(vec![], BackendErrorCode::EmptyMatrix)]
    #[case::ragged(vec![vec![0.0, 1.0], vec![1.0]], BackendErrorCode::RaggedMatrix)]
    #[case::non_finite(vec![vec![0.0], vec![f32::NAN]], BackendErrorCode::Distance)]
    #[case::too_small(vec![vec![0.0], vec![1.0]], BackendErrorCode::Hierarchy)]
    fn rejects_unusable_input(#[case] matrix: Vec<Vec<f32>>, #[case] expected: BackendErrorCode) {
        let err = HdbscanBackend::new()
            .fit(&matrix, &config(3, 1, Metric::Euclidean))
            .expect_err("fit must fail");
        assert_eq!(err.code(), expected);
    }

    #[rstest]
    #[case::kth_neighbour(2, 2.0)]
    #[case::fewer_neighbours_than_requested(9, 5.0)]
    fn core_distance_uses_requested_rank(#[case] min_samples: usize, #[case] expected: f32) {
        let row = [0.0, 5.0, 1.0, 2.0];
        let min_samples = NonZeroUsize::new(min_samples).expect("non-zero");
        assert_eq!(core_distance(0, &row, min_samples), expected);
    }

    #[test]
    fn mutual_reachability_takes_largest_core() {
        let distances = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let edges = mutual_reachability_edges(&distances, &[0.5, 3.0]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight(), 3.0);
    }
}

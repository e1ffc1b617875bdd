//! Builder for [`PipelineConfig`].
//!
//! Every parameter is validated in [`PipelineConfigBuilder::build`], before
//! any store is touched.

use std::{num::NonZeroUsize, sync::Arc};

use crate::{Result, distance::Metric, error::DoclusterError, pipeline::PipelineConfig};

/// Default minimum cluster size.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 5;
/// Default core-distance neighbourhood size.
pub const DEFAULT_MIN_SAMPLES: usize = 5;
/// Default share of chunks a document needs to join a cluster.
pub const DEFAULT_MAJORITY_THRESHOLD: f64 = 0.5;
/// Default number of document ids per vector-store query.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Configures and validates [`PipelineConfig`] instances.
///
/// # Examples
/// ```
/// use docluster_core::{Metric, PipelineConfigBuilder};
///
/// let config = PipelineConfigBuilder::new("user-1")
///     .with_min_cluster_size(3)
///     .with_metric(Metric::Cosine)
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(config.min_cluster_size().get(), 3);
/// assert_eq!(config.metric(), Metric::Cosine);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    user_id: String,
    min_cluster_size: usize,
    min_samples: usize,
    metric: Metric,
    majority_threshold: f64,
    batch_size: usize,
    include_tree: bool,
    allow_single_cluster: bool,
}

impl PipelineConfigBuilder {
    /// Creates a builder for `user_id` populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use docluster_core::{Metric, PipelineConfigBuilder};
    ///
    /// let builder = PipelineConfigBuilder::new("user-1");
    /// assert_eq!(builder.min_cluster_size(), 5);
    /// assert_eq!(builder.metric(), Metric::Manhattan);
    /// ```
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            min_samples: DEFAULT_MIN_SAMPLES,
            metric: Metric::default(),
            majority_threshold: DEFAULT_MAJORITY_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            include_tree: false,
            allow_single_cluster: false,
        }
    }

    /// Overrides the minimum cluster size.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Returns the configured minimum cluster size.
    #[must_use]
    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Overrides the core-distance neighbourhood size.
    #[must_use]
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples;
        self
    }

    /// Selects the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Returns the configured metric.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Overrides the chunk-first majority threshold.
    #[must_use]
    pub fn with_majority_threshold(mut self, threshold: f64) -> Self {
        self.majority_threshold = threshold;
        self
    }

    /// Overrides the number of document ids per vector-store query.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Requests the cluster tree in the report.
    #[must_use]
    pub fn with_include_tree(mut self, include: bool) -> Self {
        self.include_tree = include;
        self
    }

    /// Lets the backend select the root as the only cluster.
    #[must_use]
    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    /// Validates the configuration and constructs a [`PipelineConfig`].
    ///
    /// # Errors
    /// Returns [`DoclusterError::EmptyUserId`] for a blank user id,
    /// [`DoclusterError::InvalidMinClusterSize`] below two,
    /// [`DoclusterError::InvalidMinSamples`] for zero,
    /// [`DoclusterError::InvalidMajorityThreshold`] outside `(0, 1]` and
    /// [`DoclusterError::InvalidBatchSize`] for zero.
    ///
    /// # Examples
    /// ```
    /// use docluster_core::{DoclusterError, PipelineConfigBuilder};
    ///
    /// let err = PipelineConfigBuilder::new("user-1")
    ///     .with_majority_threshold(0.0)
    ///     .build()
    ///     .expect_err("zero threshold is rejected");
    /// assert!(matches!(err, DoclusterError::InvalidMajorityThreshold { .. }));
    /// ```
    pub fn build(self) -> Result<PipelineConfig> {
        if self.user_id.trim().is_empty() {
            return Err(DoclusterError::EmptyUserId);
        }
        let min_cluster_size = NonZeroUsize::new(self.min_cluster_size)
            .filter(|size| size.get() >= 2)
            .ok_or(DoclusterError::InvalidMinClusterSize {
                got: self.min_cluster_size,
            })?;
        let min_samples = NonZeroUsize::new(self.min_samples).ok_or(
            DoclusterError::InvalidMinSamples {
                got: self.min_samples,
            },
        )?;
        if !(self.majority_threshold > 0.0 && self.majority_threshold <= 1.0) {
            return Err(DoclusterError::InvalidMajorityThreshold {
                got: self.majority_threshold,
            });
        }
        let batch_size = NonZeroUsize::new(self.batch_size).ok_or(
            DoclusterError::InvalidBatchSize {
                got: self.batch_size,
            },
        )?;

        Ok(PipelineConfig {
            user_id: Arc::from(self.user_id),
            min_cluster_size,
            min_samples,
            metric: self.metric,
            majority_threshold: self.majority_threshold,
            batch_size,
            include_tree: self.include_tree,
            allow_single_cluster: self.allow_single_cluster,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::DoclusterErrorCode;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfigBuilder::new("user").build().expect("defaults are valid");
        assert_eq!(config.min_cluster_size().get(), DEFAULT_MIN_CLUSTER_SIZE);
        assert_eq!(config.min_samples().get(), DEFAULT_MIN_SAMPLES);
        assert_eq!(config.batch_size().get(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.majority_threshold(), DEFAULT_MAJORITY_THRESHOLD);
        assert_eq!(config.metric(), Metric::Manhattan);
        assert!(!config.include_tree());
        assert_eq!(config.user_id(), "user");
    }

    #[rstest]
    #[case::blank_user(PipelineConfigBuilder::new("  "), DoclusterErrorCode::EmptyUserId)]
    #[case::cluster_size_one(
        PipelineConfigBuilder::new("u").with_min_cluster_size(1),
        DoclusterErrorCode::InvalidMinClusterSize
    )]
    #[case::cluster_size_zero(
        PipelineConfigBuilder::new("u").with_min_cluster_size(0),
        DoclusterErrorCode::InvalidMinClusterSize
    )]
    #[case::no_samples(
        PipelineConfigBuilder::new("u").with_min_samples(0),
        DoclusterErrorCode::InvalidMinSamples
    )]
    #[case::zero_threshold(
        PipelineConfigBuilder::new("u").with_majority_threshold(0.0),
        DoclusterErrorCode::InvalidMajorityThreshold
    )]
    #[case::threshold_above_one(
        PipelineConfigBuilder::new("u").with_majority_threshold(1.01),
        DoclusterErrorCode::InvalidMajorityThreshold
    )]
    #[case::nan_threshold(
        PipelineConfigBuilder::new("u").with_majority_threshold(f64::NAN),
        DoclusterErrorCode::InvalidMajorityThreshold
    )]
    #[case::empty_batches(
        PipelineConfigBuilder::new("u").with_batch_size(0),
        DoclusterErrorCode::InvalidBatchSize
    )]
    fn rejects_invalid_parameters(
        #[case] builder: PipelineConfigBuilder,
        #[case] expected: DoclusterErrorCode,
    ) {
        let err = builder.build().expect_err("configuration must be rejected");
        assert_eq!(err.code(), expected);
        assert!(err.is_invalid_input());
    }

    #[rstest]
    #[case::smallest_cluster(PipelineConfigBuilder::new("u").with_min_cluster_size(2))]
    #[case::full_threshold(PipelineConfigBuilder::new("u").with_majority_threshold(1.0))]
    #[case::single_sample(PipelineConfigBuilder::new("u").with_min_samples(1))]
    fn accepts_boundary_values(#[case] builder: PipelineConfigBuilder) {
        assert!(builder.build().is_ok());
    }
}

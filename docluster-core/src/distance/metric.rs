//! Metric selection for the clustering backend.

use core::fmt;

use serde::Serialize;

use super::kernels::{cosine_distance, euclidean_distance, manhattan_distance};
use super::types::{DistanceError, Result};

/// Distance metric used by the clustering backend.
///
/// Serialises as the lowercase name written into reports.
///
/// # Examples
/// ```
/// use docluster_core::Metric;
///
/// let d = Metric::Manhattan.distance(&[0.0, 0.0], &[1.0, 2.0])?;
/// assert_eq!(d, 3.0);
/// assert_eq!(Metric::Cosine.as_str(), "cosine");
/// # Ok::<(), docluster_core::DistanceError>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Straight-line (L2) distance.
    Euclidean,
    /// Taxicab (L1) distance.
    #[default]
    Manhattan,
    /// One minus cosine similarity.
    Cosine,
}

impl Metric {
    /// Returns the lowercase metric name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Cosine => "cosine",
        }
    }

    /// Computes the distance between `left` and `right` under this metric.
    ///
    /// Cosine distance against an all-zero embedding is `1.0`, as if the two
    /// were orthogonal.
    ///
    /// # Errors
    /// Returns [`DistanceError`] for empty, mismatched, or non-finite input.
    pub fn distance(self, left: &[f32], right: &[f32]) -> Result<f32> {
        let distance = match self {
            Self::Euclidean => euclidean_distance(left, right)?,
            Self::Manhattan => manhattan_distance(left, right)?,
            Self::Cosine => match cosine_distance(left, right) {
                Err(DistanceError::ZeroMagnitude { .. }) => return Ok(1.0),
                other => other?,
            },
        };
        Ok(distance.value())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Error and result types shared by the distance kernels.

use core::fmt;

use thiserror::Error;

/// Which argument of a kernel an error refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VectorKind {
    /// The first argument.
    Left,
    /// The second argument.
    Right,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Invalid input to a distance kernel.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DistanceError {
    /// An embedding had no components.
    #[error("vectors must have positive dimension")]
    ZeroLength,
    /// The embeddings had different dimensions.
    #[error("dimension mismatch: left={left}, right={right}")]
    DimensionMismatch {
        /// Dimension of the first argument.
        left: usize,
        /// Dimension of the second argument.
        right: usize,
    },
    /// A component was NaN or infinite.
    #[error("{which} vector contains a non-finite value at index {index}: {value}")]
    NonFinite {
        /// Argument holding the component.
        which: VectorKind,
        /// Component index.
        index: usize,
        /// The component itself.
        value: f32,
    },
    /// Cosine distance is undefined for an all-zero embedding.
    #[error("{which} vector has zero magnitude")]
    ZeroMagnitude {
        /// Argument with zero norm.
        which: VectorKind,
    },
}

/// Result alias for the kernels.
pub type Result<T> = core::result::Result<T, DistanceError>;

/// A validated, non-negative distance.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Distance(f32);

impl Distance {
    pub(crate) const fn from_raw(value: f32) -> Self {
        Self(value)
    }

    /// Returns the distance as `f32`.
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

fn check_finite(values: &[f32], which: VectorKind) -> Result<()> {
    if values.is_empty() {
        return Err(DistanceError::ZeroLength);
    }
    match values
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        Some((index, &value)) => Err(DistanceError::NonFinite {
            which,
            index,
            value,
        }),
        None => Ok(()),
    }
}

/// Checks both arguments and yields their components widened to `f64`.
pub(crate) fn component_pairs<'a>(
    left: &'a [f32],
    right: &'a [f32],
) -> Result<impl Iterator<Item = (f64, f64)> + 'a> {
    check_finite(left, VectorKind::Left)?;
    check_finite(right, VectorKind::Right)?;
    if left.len() != right.len() {
        return Err(DistanceError::DimensionMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(left
        .iter()
        .zip(right)
        .map(|(&l, &r)| (f64::from(l), f64::from(r))))
}

//! Euclidean, Manhattan and cosine kernels.
//!
//! Components are accumulated in `f64` and narrowed once at the end.

use super::types::{Distance, DistanceError, Result, VectorKind, component_pairs};

/// Straight-line distance between two embeddings.
///
/// # Examples
/// ```
/// use docluster_core::euclidean_distance;
///
/// let distance = euclidean_distance(&[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0])?;
/// assert!((distance.value() - 7.071_068).abs() < 1e-6);
/// # Ok::<(), docluster_core::DistanceError>(())
/// ```
///
/// # Errors
/// [`DistanceError::ZeroLength`], [`DistanceError::DimensionMismatch`] or
/// [`DistanceError::NonFinite`] for invalid input.
pub fn euclidean_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let squares: f64 = component_pairs(left, right)?
        .map(|(l, r)| (l - r) * (l - r))
        .sum();
    Ok(Distance::from_raw(squares.sqrt() as f32))
}

/// Sum of absolute component differences.
///
/// # Examples
/// ```
/// use docluster_core::manhattan_distance;
///
/// let distance = manhattan_distance(&[1.0, -2.0], &[4.0, 2.0])?;
/// assert!((distance.value() - 7.0).abs() < 1e-6);
/// # Ok::<(), docluster_core::DistanceError>(())
/// ```
///
/// # Errors
/// Same as [`euclidean_distance`].
pub fn manhattan_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let total: f64 = component_pairs(left, right)?
        .map(|(l, r)| (l - r).abs())
        .sum();
    Ok(Distance::from_raw(total as f32))
}

/// One minus the cosine similarity, in `[0, 2]`.
///
/// # Examples
/// ```
/// use docluster_core::cosine_distance;
///
/// let orthogonal = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0])?;
/// assert!((orthogonal.value() - 1.0).abs() < 1e-6);
/// # Ok::<(), docluster_core::DistanceError>(())
/// ```
///
/// # Errors
/// Same as [`euclidean_distance`], plus [`DistanceError::ZeroMagnitude`]
/// when either embedding is all zeros.
pub fn cosine_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let (dot, left_norm, right_norm) = component_pairs(left, right)?.fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, ln, rn), (l, r)| (dot + l * r, ln + l * l, rn + r * r),
    );
    if left_norm == 0.0 {
        return Err(DistanceError::ZeroMagnitude {
            which: VectorKind::Left,
        });
    }
    if right_norm == 0.0 {
        return Err(DistanceError::ZeroMagnitude {
            which: VectorKind::Right,
        });
    }
    // Rounding can push the similarity just outside [-1, 1].
    let similarity = (dot / (left_norm.sqrt() * right_norm.sqrt())).clamp(-1.0, 1.0);
    Ok(Distance::from_raw((1.0 - similarity) as f32))
}

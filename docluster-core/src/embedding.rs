//! Pooling chunk embeddings into one vector per document.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::{error::define_error_codes, retrieval::ChunkRecord};

/// Errors raised while pooling chunk vectors.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AggregationError {
    /// No vectors were supplied.
    #[error("cannot pool an empty set of vectors")]
    NoVectors,
    /// A vector had zero length.
    #[error("vectors must have positive dimension")]
    ZeroDimension,
    /// Vectors passed to one pooling call differed in length.
    #[error("vector {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        /// Position of the offending vector.
        index: usize,
        /// Dimension of the first vector.
        expected: usize,
        /// Dimension of the offending vector.
        found: usize,
    },
    /// A document's chunks carried vectors of different lengths.
    #[error("document `{document_id}` mixes dimensions {expected} and {found}")]
    DocumentDimensionMismatch {
        /// Document whose chunks disagree.
        document_id: Arc<str>,
        /// Dimension of the document's first chunk.
        expected: usize,
        /// Dimension of the offending chunk.
        found: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`AggregationError`] variants.
    enum AggregationErrorCode for AggregationError {
        /// No vectors were supplied.
        NoVectors => NoVectors => "AGGREGATION_NO_VECTORS",
        /// A vector had zero length.
        ZeroDimension => ZeroDimension => "AGGREGATION_ZERO_DIMENSION",
        /// Vectors passed to one pooling call differed in length.
        DimensionMismatch => DimensionMismatch { .. } => "AGGREGATION_DIMENSION_MISMATCH",
        /// A document's chunks carried vectors of different lengths.
        DocumentDimensionMismatch => DocumentDimensionMismatch { .. } => "AGGREGATION_DOCUMENT_DIMENSION_MISMATCH",
    }
}

/// Averages equal-length vectors and scales the mean to unit length.
///
/// The mean accumulates in `f64`. A zero mean is returned unchanged.
///
/// # Errors
/// Returns [`AggregationError`] for an empty input, zero-length vectors, or
/// mismatched dimensions.
///
/// # Examples
/// ```
/// use docluster_core::mean_pool;
///
/// let pooled = mean_pool(&[&[1.0, 0.0], &[0.0, 1.0]])?;
/// assert!((pooled[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
/// assert!((pooled[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
/// # Ok::<(), docluster_core::AggregationError>(())
/// ```
pub fn mean_pool(vectors: &[&[f32]]) -> Result<Vec<f32>, AggregationError> {
    let first = vectors.first().ok_or(AggregationError::NoVectors)?;
    let dimension = first.len();
    if dimension == 0 {
        return Err(AggregationError::ZeroDimension);
    }

    let mut sums = vec![0.0_f64; dimension];
    for (index, vector) in vectors.iter().enumerate() {
        if vector.len() != dimension {
            return Err(AggregationError::DimensionMismatch {
                index,
                expected: dimension,
                found: vector.len(),
            });
        }
        for (sum, &value) in sums.iter_mut().zip(vector.iter()) {
            *sum += f64::from(value);
        }
    }

    let count = vectors.len() as f64;
    let mean: Vec<f64> = sums.into_iter().map(|sum| sum / count).collect();
    let norm = mean.iter().map(|value| value * value).sum::<f64>().sqrt();
    let scale = if norm > 0.0 { norm } else { 1.0 };
    Ok(mean.into_iter().map(|value| (value / scale) as f32).collect())
}

/// One document's pooled embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentEmbedding {
    /// Document identifier.
    pub document_id: String,
    /// Title taken from the document's first chunk.
    pub title: Option<String>,
    /// Source taken from the document's first chunk.
    pub source: Option<String>,
    /// Number of chunks pooled.
    pub chunk_count: usize,
    /// Unit-length mean of the chunk vectors.
    pub vector: Vec<f32>,
}

/// Groups chunks by document and pools each group.
///
/// Documents are returned in the order their first chunk appears, so point
/// indices are stable for a fixed retrieval order.
///
/// # Errors
/// Returns [`AggregationError::DocumentDimensionMismatch`] when one document's
/// chunks differ in length, or [`AggregationError::ZeroDimension`] for empty
/// vectors.
pub fn aggregate_documents(
    chunks: &[ChunkRecord],
) -> Result<Vec<DocumentEmbedding>, AggregationError> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&ChunkRecord>> = HashMap::new();
    for chunk in chunks {
        let group = groups.entry(chunk.document_id.as_str()).or_default();
        if group.is_empty() {
            order.push(chunk.document_id.as_str());
        }
        group.push(chunk);
    }

    order
        .into_iter()
        .filter_map(|document_id| groups.remove(document_id))
        .map(pool_document)
        .collect()
}

fn pool_document(group: Vec<&ChunkRecord>) -> Result<DocumentEmbedding, AggregationError> {
    let first = group.first().ok_or(AggregationError::NoVectors)?;
    let expected = first.vector.len();
    if let Some(odd) = group.iter().find(|chunk| chunk.vector.len() != expected) {
        return Err(AggregationError::DocumentDimensionMismatch {
            document_id: Arc::from(first.document_id.as_str()),
            expected,
            found: odd.vector.len(),
        });
    }

    let vectors: Vec<&[f32]> = group.iter().map(|chunk| chunk.vector.as_slice()).collect();
    Ok(DocumentEmbedding {
        document_id: first.document_id.clone(),
        title: first.title.clone(),
        source: first.source.clone(),
        chunk_count: group.len(),
        vector: mean_pool(&vectors)?,
    })
}

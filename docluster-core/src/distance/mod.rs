//! Distance kernels for embedding vectors.
//!
//! Every kernel validates its input and reports the offending vector and
//! index on failure.

mod kernels;
mod metric;
mod types;

pub use self::kernels::{cosine_distance, euclidean_distance, manhattan_distance};
pub use self::metric::Metric;
pub use self::types::{Distance, DistanceError, VectorKind};

//! Error types for the docluster core library.
//!
//! Defines the pipeline error exposed by the public API, the macro that gives
//! every error enum a stable machine-readable code, and a result alias.

use std::{fmt, num::NonZeroUsize, sync::Arc};

use thiserror::Error;

use crate::{
    backend::BackendError,
    embedding::AggregationError,
    retrieval::{ChunkStoreError, MetadataStoreError},
};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident
                    $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(
                        Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )?
                            => $CodeTy::$CodeVariant,
                    )+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Which unit of clustering ran short of input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PointKind {
    /// One point per aggregated document.
    Documents,
    /// One point per chunk.
    Chunks,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Documents => f.write_str("documents"),
            Self::Chunks => f.write_str("chunks"),
        }
    }
}

/// Error type produced when configuring or running a clustering pipeline.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DoclusterError {
    /// Minimum cluster size must be at least two.
    #[error("min_cluster_size must be at least 2 (got {got})")]
    InvalidMinClusterSize {
        /// The invalid minimum cluster size supplied by the caller.
        got: usize,
    },
    /// Minimum samples must be at least one.
    #[error("min_samples must be at least 1 (got {got})")]
    InvalidMinSamples {
        /// The invalid neighbourhood size supplied by the caller.
        got: usize,
    },
    /// Majority threshold must lie in `(0, 1]`.
    #[error("majority_threshold must be in (0, 1] (got {got})")]
    InvalidMajorityThreshold {
        /// The rejected threshold.
        got: f64,
    },
    /// Retrieval batches must hold at least one document id.
    #[error("batch_size must be at least 1 (got {got})")]
    InvalidBatchSize {
        /// The rejected batch size.
        got: usize,
    },
    /// The user identifier was blank.
    #[error("user id must not be empty")]
    EmptyUserId,
    /// Resolving the user's document identifiers failed.
    #[error("failed to resolve documents for user `{user_id}`: {error}")]
    DocumentLookup {
        /// User whose documents were requested.
        user_id: Arc<str>,
        /// Underlying metadata store failure.
        #[source]
        error: MetadataStoreError,
    },
    /// The vector store could not be reached.
    #[error("vector store unavailable: {error}")]
    VectorStore {
        /// Underlying vector store failure.
        #[source]
        error: ChunkStoreError,
    },
    /// No chunk embeddings were found for the user.
    #[error("no chunk embeddings found for user `{user_id}`")]
    NoChunks {
        /// User whose chunks were requested.
        user_id: Arc<str>,
    },
    /// Fewer points were available than `min_cluster_size` requires.
    #[error(
        "user `{user_id}` has {count} {kind} but min_cluster_size requires {min_cluster_size}"
    )]
    InsufficientData {
        /// User whose data fell short.
        user_id: Arc<str>,
        /// Unit that was counted.
        kind: PointKind,
        /// Number of points available.
        count: usize,
        /// Minimum cluster size required by the backend.
        min_cluster_size: NonZeroUsize,
    },
    /// Chunk vectors could not be pooled into document vectors.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    /// The clustering backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

define_error_codes! {
    /// Stable codes describing [`DoclusterError`] variants.
    enum DoclusterErrorCode for DoclusterError {
        /// Minimum cluster size must be at least two.
        InvalidMinClusterSize => InvalidMinClusterSize { .. } => "DOCLUSTER_INVALID_MIN_CLUSTER_SIZE",
        /// Minimum samples must be at least one.
        InvalidMinSamples => InvalidMinSamples { .. } => "DOCLUSTER_INVALID_MIN_SAMPLES",
        /// Majority threshold must lie in `(0, 1]`.
        InvalidMajorityThreshold => InvalidMajorityThreshold { .. } => "DOCLUSTER_INVALID_MAJORITY_THRESHOLD",
        /// Retrieval batches must hold at least one document id.
        InvalidBatchSize => InvalidBatchSize { .. } => "DOCLUSTER_INVALID_BATCH_SIZE",
        /// The user identifier was blank.
        EmptyUserId => EmptyUserId => "DOCLUSTER_EMPTY_USER_ID",
        /// Resolving the user's document identifiers failed.
        DocumentLookup => DocumentLookup { .. } => "DOCLUSTER_DOCUMENT_LOOKUP_FAILED",
        /// The vector store could not be reached.
        VectorStore => VectorStore { .. } => "DOCLUSTER_VECTOR_STORE_UNAVAILABLE",
        /// No chunk embeddings were found for the user.
        NoChunks => NoChunks { .. } => "DOCLUSTER_NO_CHUNKS",
        /// Fewer points were available than `min_cluster_size` requires.
        InsufficientData => InsufficientData { .. } => "DOCLUSTER_INSUFFICIENT_DATA",
        /// Chunk vectors could not be pooled into document vectors.
        Aggregation => Aggregation(..) => "DOCLUSTER_AGGREGATION_FAILED",
        /// The clustering backend failed.
        Backend => Backend(..) => "DOCLUSTER_BACKEND_FAILED",
    }
}

impl DoclusterError {
    /// Returns `true` for configuration errors raised before any I/O.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidMinClusterSize { .. }
                | Self::InvalidMinSamples { .. }
                | Self::InvalidMajorityThreshold { .. }
                | Self::InvalidBatchSize { .. }
                | Self::EmptyUserId
        )
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, DoclusterError>;

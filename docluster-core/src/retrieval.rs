//! Store abstractions and batched chunk retrieval.
//!
//! The pipeline reads document identifiers and metadata from a
//! [`MetadataStore`] and chunk embeddings from a [`ChunkStore`]. Providers live
//! in their own crates; this module owns the contracts and the batching loop.

use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::define_error_codes;

/// One chunk embedding with the properties stored alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    /// Owning document.
    pub document_id: String,
    /// Position of the chunk within its document.
    pub chunk_index: i64,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Document title copied onto the chunk.
    pub title: Option<String>,
    /// Document source copied onto the chunk.
    pub source: Option<String>,
}

/// Supplementary document fields held by the metadata store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentMetadata {
    /// Document title.
    pub title: Option<String>,
    /// Document source path or URL.
    pub source: Option<String>,
    /// User-assigned tags.
    pub tags: Vec<String>,
    /// Generated summary.
    pub summary: Option<String>,
}

/// Errors surfaced by [`MetadataStore`] implementations.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum MetadataStoreError {
    /// The backing database does not exist.
    #[error("metadata database not found at `{path}`")]
    MissingDatabase {
        /// Location that was probed.
        path: Arc<str>,
    },
    /// The backing database could not be opened.
    #[error("failed to open metadata database `{path}`: {message}")]
    Open {
        /// Location that was opened.
        path: Arc<str>,
        /// Driver message.
        message: Arc<str>,
    },
    /// A query failed.
    #[error("metadata query failed: {message}")]
    Query {
        /// Driver message.
        message: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`MetadataStoreError`] variants.
    enum MetadataStoreErrorCode for MetadataStoreError {
        /// The backing database does not exist.
        MissingDatabase => MissingDatabase { .. } => "METADATA_MISSING_DATABASE",
        /// The backing database could not be opened.
        Open => Open { .. } => "METADATA_OPEN_FAILED",
        /// A query failed.
        Query => Query { .. } => "METADATA_QUERY_FAILED",
    }
}

/// Errors surfaced by [`ChunkStore`] implementations.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ChunkStoreError {
    /// The store did not answer its readiness probe.
    #[error("vector store at `{endpoint}` is not ready: {message}")]
    Unavailable {
        /// Probed endpoint.
        endpoint: Arc<str>,
        /// Transport or status detail.
        message: Arc<str>,
    },
    /// A query request failed in transit.
    #[error("vector store request failed: {message}")]
    Request {
        /// Transport or status detail.
        message: Arc<str>,
    },
    /// The store answered with a payload that could not be interpreted.
    #[error("vector store returned an invalid response: {message}")]
    InvalidResponse {
        /// Parse or schema detail.
        message: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`ChunkStoreError`] variants.
    enum ChunkStoreErrorCode for ChunkStoreError {
        /// The store did not answer its readiness probe.
        Unavailable => Unavailable { .. } => "CHUNK_STORE_UNAVAILABLE",
        /// A query request failed in transit.
        Request => Request { .. } => "CHUNK_STORE_REQUEST_FAILED",
        /// The store answered with a payload that could not be interpreted.
        InvalidResponse => InvalidResponse { .. } => "CHUNK_STORE_INVALID_RESPONSE",
    }
}

/// Relational store of documents owned by users.
///
/// # Examples
/// ```
/// use std::collections::HashMap;
/// use docluster_core::{DocumentMetadata, MetadataStore, MetadataStoreError};
///
/// struct Fixed;
///
/// impl MetadataStore for Fixed {
///     fn name(&self) -> &str { "fixed" }
///     fn document_ids(&self, _user_id: &str) -> Result<Vec<String>, MetadataStoreError> {
///         Ok(vec!["doc-1".to_owned()])
///     }
///     fn metadata(
///         &self,
///         _user_id: &str,
///         _ids: &[String],
///     ) -> Result<HashMap<String, DocumentMetadata>, MetadataStoreError> {
///         Ok(HashMap::new())
///     }
/// }
///
/// assert_eq!(Fixed.document_ids("user")?, ["doc-1"]);
/// # Ok::<(), MetadataStoreError>(())
/// ```
pub trait MetadataStore {
    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Lists the identifiers of every document owned by `user_id`.
    ///
    /// # Errors
    /// Returns [`MetadataStoreError`] when the store cannot be read.
    fn document_ids(&self, user_id: &str) -> Result<Vec<String>, MetadataStoreError>;

    /// Loads metadata for the given documents, keyed by document id.
    ///
    /// Documents missing from the store are absent from the map.
    ///
    /// # Errors
    /// Returns [`MetadataStoreError`] when the store cannot be read.
    fn metadata(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, DocumentMetadata>, MetadataStoreError>;
}

/// Vector store holding chunk embeddings.
pub trait ChunkStore {
    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Verifies the store is reachable.
    ///
    /// # Errors
    /// Returns [`ChunkStoreError::Unavailable`] when it is not.
    fn check_ready(&self) -> Result<(), ChunkStoreError>;

    /// Fetches every chunk belonging to `document_ids`.
    ///
    /// Chunks without a vector are omitted.
    ///
    /// # Errors
    /// Returns [`ChunkStoreError`] when the batch cannot be fetched.
    fn fetch_chunks(&self, document_ids: &[String]) -> Result<Vec<ChunkRecord>, ChunkStoreError>;
}

/// Fetches chunks for `document_ids` in batches of `batch_size`.
///
/// The readiness probe is fatal; a failed batch is logged at `warn` and
/// skipped.
///
/// # Errors
/// Returns [`ChunkStoreError`] when the readiness probe fails.
#[instrument(
    name = "retrieval.fetch",
    skip(store, document_ids),
    fields(store = store.name(), documents = document_ids.len(), batch_size = batch_size.get())
)]
pub fn fetch_chunks_batched<S>(
    store: &S,
    document_ids: &[String],
    batch_size: NonZeroUsize,
) -> Result<Vec<ChunkRecord>, ChunkStoreError>
where
    S: ChunkStore + ?Sized,
{
    store.check_ready()?;

    let mut chunks = Vec::new();
    for (batch, ids) in document_ids.chunks(batch_size.get()).enumerate() {
        match store.fetch_chunks(ids) {
            Ok(fetched) => {
                debug!(batch, documents = ids.len(), chunks = fetched.len(), "fetched batch");
                chunks.extend(fetched);
            }
            Err(err) => {
                warn!(
                    batch,
                    documents = ids.len(),
                    error = %err,
                    code = err.code().as_str(),
                    "skipping failed chunk batch"
                );
            }
        }
    }
    Ok(chunks)
}

/// Loads metadata, logging failures and degrading to an empty map.
#[instrument(name = "retrieval.metadata", skip(store, ids), fields(store = store.name()))]
pub fn load_metadata_best_effort<M>(
    store: &M,
    user_id: &str,
    ids: &[String],
) -> HashMap<String, DocumentMetadata>
where
    M: MetadataStore + ?Sized,
{
    store.metadata(user_id, ids).unwrap_or_else(|err| {
        warn!(error = %err, code = err.code().as_str(), "could not load document metadata");
        HashMap::new()
    })
}

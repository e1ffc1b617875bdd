//! Document-level and chunk-first clustering runs.
//!
//! Both runs share the same shape: resolve the user's documents, fetch chunk
//! embeddings in batches, cluster, then assemble the report. They differ in
//! what a point is. The document run pools chunks into one vector per
//! document; the chunk-first run clusters chunks directly and lets each
//! document's chunks vote.

use std::{collections::HashSet, num::NonZeroUsize, sync::Arc};

use tracing::{info, instrument, warn};

use crate::{
    Result,
    assembly::{assemble_chunk_report, assemble_document_report},
    backend::{BackendConfig, ClusterBackend},
    distance::Metric,
    embedding::aggregate_documents,
    error::{DoclusterError, PointKind},
    report::{ClusteringReport, ReportParameters},
    retrieval::{
        ChunkRecord, ChunkStore, MetadataStore, fetch_chunks_batched, load_metadata_best_effort,
    },
    tree::extract_cluster_tree,
};

/// Validated parameters for one clustering run.
///
/// Built by [`crate::PipelineConfigBuilder`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub(crate) user_id: Arc<str>,
    pub(crate) min_cluster_size: NonZeroUsize,
    pub(crate) min_samples: NonZeroUsize,
    pub(crate) metric: Metric,
    pub(crate) majority_threshold: f64,
    pub(crate) batch_size: NonZeroUsize,
    pub(crate) include_tree: bool,
    pub(crate) allow_single_cluster: bool,
}

impl PipelineConfig {
    /// Returns the user whose documents are clustered.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the minimum cluster size.
    #[must_use]
    pub fn min_cluster_size(&self) -> NonZeroUsize {
        self.min_cluster_size
    }

    /// Returns the core-distance neighbourhood size.
    #[must_use]
    pub fn min_samples(&self) -> NonZeroUsize {
        self.min_samples
    }

    /// Returns the distance metric.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Returns the chunk-first majority threshold.
    #[must_use]
    pub fn majority_threshold(&self) -> f64 {
        self.majority_threshold
    }

    /// Returns the number of document ids per vector-store query.
    #[must_use]
    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Returns whether the cluster tree is attached to the report.
    #[must_use]
    pub fn include_tree(&self) -> bool {
        self.include_tree
    }

    /// Returns whether the root may form the only cluster.
    #[must_use]
    pub fn allow_single_cluster(&self) -> bool {
        self.allow_single_cluster
    }

    /// Returns a copy that attaches the cluster tree.
    #[must_use]
    pub fn with_tree(mut self) -> Self {
        self.include_tree = true;
        self
    }

    fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            min_cluster_size: self.min_cluster_size,
            min_samples: self.min_samples,
            metric: self.metric,
            allow_single_cluster: self.allow_single_cluster,
        }
    }

    fn report_parameters(&self, majority_threshold: Option<f64>) -> ReportParameters {
        ReportParameters {
            min_cluster_size: self.min_cluster_size.get(),
            min_samples: self.min_samples.get(),
            metric: self.metric,
            majority_threshold,
        }
    }
}

fn fetch_user_chunks<M, S>(
    config: &PipelineConfig,
    metadata: &M,
    chunks: &S,
) -> Result<Vec<ChunkRecord>>
where
    M: MetadataStore + ?Sized,
    S: ChunkStore + ?Sized,
{
    let document_ids = metadata
        .document_ids(&config.user_id)
        .map_err(|error| DoclusterError::DocumentLookup {
            user_id: Arc::clone(&config.user_id),
            error,
        })?;
    if document_ids.is_empty() {
        warn!("user has no documents");
        return Err(DoclusterError::NoChunks {
            user_id: Arc::clone(&config.user_id),
        });
    }
    info!(documents = document_ids.len(), "resolved user documents");

    let records = fetch_chunks_batched(chunks, &document_ids, config.batch_size)
        .map_err(|error| DoclusterError::VectorStore { error })?;
    if records.is_empty() {
        return Err(DoclusterError::NoChunks {
            user_id: Arc::clone(&config.user_id),
        });
    }
    info!(chunks = records.len(), "fetched chunk embeddings");
    Ok(records)
}

/// Clusters a user's documents by their pooled chunk embeddings.
///
/// # Errors
/// Returns [`DoclusterError::DocumentLookup`] or
/// [`DoclusterError::VectorStore`] when a store fails,
/// [`DoclusterError::NoChunks`] when the user has no embeddings,
/// [`DoclusterError::InsufficientData`] when fewer documents than
/// `min_cluster_size` remain after pooling, and aggregation or backend
/// failures.
#[instrument(
    name = "pipeline.documents",
    err,
    skip(config, metadata, chunks, backend),
    fields(
        user_id = %config.user_id,
        min_cluster_size = %config.min_cluster_size,
        min_samples = %config.min_samples,
        metric = %config.metric,
        backend = backend.name()
    )
)]
pub fn run_document_pipeline<M, S, B>(
    config: &PipelineConfig,
    metadata: &M,
    chunks: &S,
    backend: &B,
) -> Result<ClusteringReport>
where
    M: MetadataStore + ?Sized,
    S: ChunkStore + ?Sized,
    B: ClusterBackend + ?Sized,
{
    let records = fetch_user_chunks(config, metadata, chunks)?;
    let documents = aggregate_documents(&records)?;
    if documents.len() < config.min_cluster_size.get() {
        return Err(DoclusterError::InsufficientData {
            user_id: Arc::clone(&config.user_id),
            kind: PointKind::Documents,
            count: documents.len(),
            min_cluster_size: config.min_cluster_size,
        });
    }

    let ids: Vec<String> = documents.iter().map(|doc| doc.document_id.clone()).collect();
    let stored = load_metadata_best_effort(metadata, &config.user_id, &ids);

    let matrix: Vec<Vec<f32>> = documents.iter().map(|doc| doc.vector.clone()).collect();
    let fit = backend.fit(&matrix, &config.backend_config())?;

    let mut report = assemble_document_report(
        &documents,
        &fit.labels,
        &stored,
        config.report_parameters(None),
        &config.user_id,
    );
    if config.include_tree {
        report.tree = Some(extract_cluster_tree(documents.len(), &fit.edges, &fit.labels));
    }
    info!(
        clusters = report.total_clusters,
        noise = report.noise_count,
        "document clustering complete"
    );
    Ok(report)
}

/// Clusters a user's chunks, then places each document by majority vote.
///
/// # Errors
/// Returns [`DoclusterError::DocumentLookup`] or
/// [`DoclusterError::VectorStore`] when a store fails,
/// [`DoclusterError::NoChunks`] when the user has no embeddings,
/// [`DoclusterError::InsufficientData`] when fewer chunks than
/// `min_cluster_size` were fetched, and backend failures.
#[instrument(
    name = "pipeline.chunks",
    err,
    skip(config, metadata, chunks, backend),
    fields(
        user_id = %config.user_id,
        min_cluster_size = %config.min_cluster_size,
        min_samples = %config.min_samples,
        metric = %config.metric,
        majority_threshold = config.majority_threshold,
        backend = backend.name()
    )
)]
pub fn run_chunk_pipeline<M, S, B>(
    config: &PipelineConfig,
    metadata: &M,
    chunks: &S,
    backend: &B,
) -> Result<ClusteringReport>
where
    M: MetadataStore + ?Sized,
    S: ChunkStore + ?Sized,
    B: ClusterBackend + ?Sized,
{
    let records = fetch_user_chunks(config, metadata, chunks)?;
    if records.len() < config.min_cluster_size.get() {
        return Err(DoclusterError::InsufficientData {
            user_id: Arc::clone(&config.user_id),
            kind: PointKind::Chunks,
            count: records.len(),
            min_cluster_size: config.min_cluster_size,
        });
    }

    let matrix: Vec<Vec<f32>> = records.iter().map(|chunk| chunk.vector.clone()).collect();
    let fit = backend.fit(&matrix, &config.backend_config())?;

    let mut seen = HashSet::new();
    let ids: Vec<String> = records
        .iter()
        .filter(|chunk| seen.insert(chunk.document_id.as_str()))
        .map(|chunk| chunk.document_id.clone())
        .collect();
    if ids.len() < config.min_cluster_size.get() {
        warn!(
            documents = ids.len(),
            min_cluster_size = config.min_cluster_size.get(),
            "fewer documents than min_cluster_size; document clusters may be sparse"
        );
    }
    let stored = load_metadata_best_effort(metadata, &config.user_id, &ids);

    let mut report = assemble_chunk_report(
        &records,
        &fit.labels,
        &stored,
        config.report_parameters(Some(config.majority_threshold)),
        config.majority_threshold,
        &config.user_id,
    );
    if config.include_tree {
        report.tree = Some(extract_cluster_tree(records.len(), &fit.edges, &fit.labels));
    }
    info!(
        clusters = report.total_clusters,
        noise = report.noise_count,
        multi_cluster = report.multi_cluster_count.unwrap_or_default(),
        "chunk clustering complete"
    );
    Ok(report)
}

//! Docluster core library.
//!
//! Clusters a user's documents by their chunk embeddings and rebuilds the
//! cluster hierarchy as a navigable tree. Stores and the clustering backend
//! sit behind traits so providers can live in their own crates.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod assembly;
mod backend;
mod builder;
mod distance;
mod embedding;
mod error;
mod hierarchy;
mod mst;
mod pipeline;
mod report;
mod retrieval;
mod tree;
mod union_find;

pub use crate::{
    assembly::{
        ChunkVote, DocumentAssignment, assemble_chunk_report, assemble_document_report,
        vote_document,
    },
    backend::{
        BackendConfig, BackendError, BackendErrorCode, ClusterBackend, ClusterFit, HdbscanBackend,
    },
    builder::{
        DEFAULT_BATCH_SIZE, DEFAULT_MAJORITY_THRESHOLD, DEFAULT_MIN_CLUSTER_SIZE,
        DEFAULT_MIN_SAMPLES, PipelineConfigBuilder,
    },
    distance::{
        Distance, DistanceError, Metric, VectorKind, cosine_distance, euclidean_distance,
        manhattan_distance,
    },
    embedding::{
        AggregationError, AggregationErrorCode, DocumentEmbedding, aggregate_documents, mean_pool,
    },
    error::{DoclusterError, DoclusterErrorCode, PointKind, Result},
    hierarchy::{
        CondensedHierarchy, HierarchyConfig, HierarchyError, HierarchyErrorCode, NOISE_LABEL,
        extract_hierarchy,
    },
    mst::{MinimumSpanningForest, MstError, MstErrorCode, WeightedEdge, parallel_kruskal},
    pipeline::{PipelineConfig, run_chunk_pipeline, run_document_pipeline},
    report::{
        ChunkAttribution, ClusterEntry, ClusteringReport, DocumentRecord,
        MULTI_CLUSTER_DESCRIPTION, MultiClusterGroup, NoiseGroup, ReportParameters,
    },
    retrieval::{
        ChunkRecord, ChunkStore, ChunkStoreError, ChunkStoreErrorCode, DocumentMetadata,
        MetadataStore, MetadataStoreError, MetadataStoreErrorCode, fetch_chunks_batched,
        load_metadata_best_effort,
    },
    tree::{
        ClusterTree, DegradedTree, EDGE_DISPLAY_LIMIT, NodeId, TREE_NOTE, TreeEdge, TreeError,
        TreeErrorCode, TreeExtraction, TreeNode, extract_cluster_tree, try_extract_cluster_tree,
    },
};

//! JSON report model.
//!
//! Field names follow the report format consumed by the tree viewer: report
//! and document fields are camelCase, `parameters` keys are snake_case, and
//! clusters are keyed by the decimal string of their label.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{distance::Metric, tree::TreeExtraction};

/// Explanation attached to the multi-cluster group.
pub const MULTI_CLUSTER_DESCRIPTION: &str =
    "Documents with chunks split across multiple clusters (did not meet majority threshold)";

/// How a document's chunks were distributed over clusters.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkAttribution {
    /// Most frequent chunk label.
    pub primary_cluster: i64,
    /// Share of chunks carrying the primary label, rounded to three decimals.
    pub primary_cluster_ratio: f64,
    /// Chunk count per label.
    pub chunk_cluster_distribution: BTreeMap<i64, usize>,
}

/// One document as listed in the report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Document identifier.
    pub document_id: String,
    /// Document title.
    pub title: Option<String>,
    /// Document source.
    pub source: Option<String>,
    /// Number of chunks behind the document.
    pub chunk_count: usize,
    /// Tags supplied by the metadata store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Summary supplied by the metadata store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Chunk vote, present for chunk-first reports.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<ChunkAttribution>,
}

/// Documents sharing one final label.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEntry {
    /// Member identifiers in document order.
    pub document_ids: Vec<String>,
    /// Member titles in document order.
    pub titles: Vec<Option<String>>,
    /// Distinct member sources, sorted.
    pub sources: Vec<Option<String>>,
    /// Member records.
    pub documents: Vec<DocumentRecord>,
    /// Number of members.
    pub size: usize,
}

impl ClusterEntry {
    /// Builds an entry from its member records.
    #[must_use]
    pub fn from_documents(documents: Vec<DocumentRecord>) -> Self {
        let mut sources: Vec<Option<String>> =
            documents.iter().map(|doc| doc.source.clone()).collect();
        sources.sort();
        sources.dedup();
        Self {
            document_ids: documents.iter().map(|doc| doc.document_id.clone()).collect(),
            titles: documents.iter().map(|doc| doc.title.clone()).collect(),
            sources,
            size: documents.len(),
            documents,
        }
    }
}

/// Documents left outside every cluster.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseGroup {
    /// Member identifiers.
    pub document_ids: Vec<String>,
    /// Member records.
    pub documents: Vec<DocumentRecord>,
    /// Number of members.
    pub count: usize,
}

impl NoiseGroup {
    /// Builds the group from its member records.
    #[must_use]
    pub fn from_documents(documents: Vec<DocumentRecord>) -> Self {
        Self {
            document_ids: documents.iter().map(|doc| doc.document_id.clone()).collect(),
            count: documents.len(),
            documents,
        }
    }
}

/// Documents whose chunks missed the majority threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiClusterGroup {
    /// Member identifiers.
    pub document_ids: Vec<String>,
    /// Member records.
    pub documents: Vec<DocumentRecord>,
    /// Number of members.
    pub count: usize,
    /// Fixed explanation of the group.
    pub description: String,
}

impl MultiClusterGroup {
    /// Builds the group from its member records.
    #[must_use]
    pub fn from_documents(documents: Vec<DocumentRecord>) -> Self {
        Self {
            document_ids: documents.iter().map(|doc| doc.document_id.clone()).collect(),
            count: documents.len(),
            documents,
            description: MULTI_CLUSTER_DESCRIPTION.to_owned(),
        }
    }
}

/// Clustering parameters echoed into the report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ReportParameters {
    /// Minimum cluster size.
    pub min_cluster_size: usize,
    /// Core-distance neighbourhood size.
    pub min_samples: usize,
    /// Distance metric.
    pub metric: Metric,
    /// Majority threshold, present for chunk-first reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub majority_threshold: Option<f64>,
}

/// The complete clustering report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringReport {
    /// Number of documents considered.
    pub total_documents: usize,
    /// Number of non-empty clusters.
    pub total_clusters: usize,
    /// Number of noise documents.
    pub noise_count: usize,
    /// Number of multi-cluster documents, chunk-first only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_cluster_count: Option<usize>,
    /// Clusters in ascending label order.
    pub clusters: BTreeMap<i64, ClusterEntry>,
    /// Noise documents.
    pub noise: NoiseGroup,
    /// Multi-cluster documents, chunk-first only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_cluster: Option<MultiClusterGroup>,
    /// Parameters used for the run.
    pub parameters: ReportParameters,
    /// User whose documents were clustered.
    pub user_id: String,
    /// Cluster tree, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeExtraction>,
}

impl ClusteringReport {
    /// Returns cluster sizes, largest first.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.clusters.values().map(|entry| entry.size).collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }
}

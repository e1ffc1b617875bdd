//! Grouping labelled documents into a [`ClusteringReport`].

use std::collections::{BTreeMap, HashMap};

use crate::{
    embedding::DocumentEmbedding,
    hierarchy::NOISE_LABEL,
    report::{
        ChunkAttribution, ClusterEntry, ClusteringReport, DocumentRecord, MultiClusterGroup,
        NoiseGroup, ReportParameters,
    },
    retrieval::{ChunkRecord, DocumentMetadata},
};

/// Where a document lands after its chunks have voted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DocumentAssignment {
    /// Assigned to the given final cluster.
    Cluster(i64),
    /// The most frequent chunk label was noise.
    Noise,
    /// A real cluster led but missed the threshold.
    MultiCluster,
}

/// Outcome of the majority vote over one document's chunk labels.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkVote {
    /// Most frequent label; ties go to the smallest label.
    pub primary_cluster: i64,
    /// Unrounded share of chunks carrying the primary label.
    pub primary_ratio: f64,
    /// Chunk count per label.
    pub distribution: BTreeMap<i64, usize>,
    /// Resulting placement.
    pub assignment: DocumentAssignment,
}

/// Applies the majority rule to one document's chunk labels.
///
/// The document joins the primary label when its share reaches `threshold`
/// and the label is not noise.
///
/// # Examples
/// ```
/// use docluster_core::{DocumentAssignment, vote_document};
///
/// assert_eq!(vote_document(&[2, 2, 5], 0.5).assignment, DocumentAssignment::Cluster(2));
/// assert_eq!(vote_document(&[2, 5], 0.5).assignment, DocumentAssignment::Cluster(2));
/// assert_eq!(vote_document(&[2, 5, 7], 0.5).assignment, DocumentAssignment::MultiCluster);
/// ```
#[must_use]
pub fn vote_document(labels: &[i64], threshold: f64) -> ChunkVote {
    let mut distribution = BTreeMap::new();
    for &label in labels {
        *distribution.entry(label).or_insert(0_usize) += 1;
    }

    // Ascending iteration keeps the smallest label on ties.
    let mut primary = None;
    for (&label, &count) in &distribution {
        if primary.is_none_or(|(_, best)| count > best) {
            primary = Some((label, count));
        }
    }
    let (primary_cluster, primary_count) = primary.unwrap_or((NOISE_LABEL, 0));
    let primary_ratio = if labels.is_empty() {
        0.0
    } else {
        primary_count as f64 / labels.len() as f64
    };

    let assignment = if primary_cluster == NOISE_LABEL {
        DocumentAssignment::Noise
    } else if primary_ratio >= threshold {
        DocumentAssignment::Cluster(primary_cluster)
    } else {
        DocumentAssignment::MultiCluster
    };

    ChunkVote {
        primary_cluster,
        primary_ratio,
        distribution,
        assignment,
    }
}

fn round_ratio(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 1000.0
}

fn document_record(
    document_id: &str,
    title: Option<&String>,
    source: Option<&String>,
    chunk_count: usize,
    metadata: &HashMap<String, DocumentMetadata>,
) -> DocumentRecord {
    let stored = metadata.get(document_id);
    DocumentRecord {
        document_id: document_id.to_owned(),
        title: stored
            .and_then(|meta| meta.title.clone())
            .or_else(|| title.cloned()),
        source: stored
            .and_then(|meta| meta.source.clone())
            .or_else(|| source.cloned()),
        chunk_count,
        tags: stored.map(|meta| meta.tags.clone()),
        summary: stored.and_then(|meta| meta.summary.clone()),
        attribution: None,
    }
}

fn into_clusters(grouped: BTreeMap<i64, Vec<DocumentRecord>>) -> BTreeMap<i64, ClusterEntry> {
    grouped
        .into_iter()
        .map(|(label, documents)| (label, ClusterEntry::from_documents(documents)))
        .collect()
}

/// Builds the document-level report from one label per aggregated document.
///
/// Documents beyond the end of `labels` are treated as noise.
#[must_use]
pub fn assemble_document_report(
    documents: &[DocumentEmbedding],
    labels: &[i64],
    metadata: &HashMap<String, DocumentMetadata>,
    parameters: ReportParameters,
    user_id: &str,
) -> ClusteringReport {
    let mut grouped: BTreeMap<i64, Vec<DocumentRecord>> = BTreeMap::new();
    let mut noise = Vec::new();
    for (index, document) in documents.iter().enumerate() {
        let record = document_record(
            &document.document_id,
            document.title.as_ref(),
            document.source.as_ref(),
            document.chunk_count,
            metadata,
        );
        match labels.get(index).copied().unwrap_or(NOISE_LABEL) {
            label if label < 0 => noise.push(record),
            label => grouped.entry(label).or_default().push(record),
        }
    }

    let clusters = into_clusters(grouped);
    ClusteringReport {
        total_documents: documents.len(),
        total_clusters: clusters.len(),
        noise_count: noise.len(),
        multi_cluster_count: None,
        clusters,
        noise: NoiseGroup::from_documents(noise),
        multi_cluster: None,
        parameters,
        user_id: user_id.to_owned(),
        tree: None,
    }
}

/// Builds the chunk-first report by voting each document's chunk labels.
///
/// `labels` holds one label per entry of `chunks`; chunks beyond its end
/// vote as noise. Documents appear in first-seen chunk order.
#[must_use]
pub fn assemble_chunk_report(
    chunks: &[ChunkRecord],
    labels: &[i64],
    metadata: &HashMap<String, DocumentMetadata>,
    parameters: ReportParameters,
    threshold: f64,
    user_id: &str,
) -> ClusteringReport {
    let mut order: Vec<&ChunkRecord> = Vec::new();
    let mut votes: HashMap<&str, Vec<i64>> = HashMap::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let entry = votes.entry(chunk.document_id.as_str()).or_default();
        if entry.is_empty() {
            order.push(chunk);
        }
        entry.push(labels.get(index).copied().unwrap_or(NOISE_LABEL));
    }

    let mut grouped: BTreeMap<i64, Vec<DocumentRecord>> = BTreeMap::new();
    let mut noise = Vec::new();
    let mut multi_cluster = Vec::new();
    for first in order {
        let chunk_labels = votes
            .get(first.document_id.as_str())
            .map_or(&[][..], Vec::as_slice);
        let vote = vote_document(chunk_labels, threshold);
        let mut record = document_record(
            &first.document_id,
            first.title.as_ref(),
            first.source.as_ref(),
            chunk_labels.len(),
            metadata,
        );
        record.attribution = Some(ChunkAttribution {
            primary_cluster: vote.primary_cluster,
            primary_cluster_ratio: round_ratio(vote.primary_ratio),
            chunk_cluster_distribution: vote.distribution,
        });
        match vote.assignment {
            DocumentAssignment::Cluster(label) => grouped.entry(label).or_default().push(record),
            DocumentAssignment::Noise => noise.push(record),
            DocumentAssignment::MultiCluster => multi_cluster.push(record),
        }
    }

    let clusters = into_clusters(grouped);
    let total_documents =
        clusters.values().map(|entry| entry.size).sum::<usize>() + noise.len() + multi_cluster.len();
    ClusteringReport {
        total_documents,
        total_clusters: clusters.len(),
        noise_count: noise.len(),
        multi_cluster_count: Some(multi_cluster.len()),
        clusters,
        noise: NoiseGroup::from_documents(noise),
        multi_cluster: Some(MultiClusterGroup::from_documents(multi_cluster)),
        parameters,
        user_id: user_id.to_owned(),
        tree: None,
    }
}

//! In-memory stores shared by the pipeline integration tests.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    sync::Arc,
};

use docluster_core::{
    BackendConfig, BackendError, ChunkRecord, ChunkStore, ChunkStoreError, ClusterBackend,
    ClusterFit, DocumentMetadata, MetadataStore, MetadataStoreError,
};

#[derive(Default)]
pub struct MemoryMetadata {
    pub ids: Vec<String>,
    pub metadata: HashMap<String, DocumentMetadata>,
    pub fail_ids: bool,
    pub fail_metadata: bool,
}

impl MemoryMetadata {
    #[must_use]
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|&id| id.to_owned()).collect(),
            ..Self::default()
        }
    }
}

impl MetadataStore for MemoryMetadata {
    fn name(&self) -> &str {
        "memory"
    }

    fn document_ids(&self, _user_id: &str) -> Result<Vec<String>, MetadataStoreError> {
        if self.fail_ids {
            return Err(MetadataStoreError::MissingDatabase {
                path: Arc::from("missing.db"),
            });
        }
        Ok(self.ids.clone())
    }

    fn metadata(
        &self,
        _user_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, DocumentMetadata>, MetadataStoreError> {
        if self.fail_metadata {
            return Err(MetadataStoreError::Query {
                message: Arc::from("no such table: documents"),
            });
        }
        Ok(self
            .metadata
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryChunks {
    pub chunks: Vec<ChunkRecord>,
    pub unavailable: bool,
    pub failing_document: Option<String>,
    pub batches: RefCell<Vec<Vec<String>>>,
}

impl MemoryChunks {
    #[must_use]
    pub fn new(chunks: Vec<ChunkRecord>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }
}

impl ChunkStore for MemoryChunks {
    fn name(&self) -> &str {
        "memory"
    }

    fn check_ready(&self) -> Result<(), ChunkStoreError> {
        if self.unavailable {
            return Err(ChunkStoreError::Unavailable {
                endpoint: Arc::from("http://localhost:8080"),
                message: Arc::from("connection refused"),
            });
        }
        Ok(())
    }

    fn fetch_chunks(&self, document_ids: &[String]) -> Result<Vec<ChunkRecord>, ChunkStoreError> {
        self.batches.borrow_mut().push(document_ids.to_vec());
        if let Some(failing) = &self.failing_document
            && document_ids.contains(failing)
        {
            return Err(ChunkStoreError::Request {
                message: Arc::from("502 Bad Gateway"),
            });
        }
        Ok(self
            .chunks
            .iter()
            .filter(|chunk| document_ids.contains(&chunk.document_id))
            .cloned()
            .collect())
    }
}

/// Backend returning fixed labels and no tree edges.
pub struct FixedBackend {
    pub labels: Vec<i64>,
    pub rows: Cell<usize>,
}

impl FixedBackend {
    #[must_use]
    pub fn new(labels: Vec<i64>) -> Self {
        Self {
            labels,
            rows: Cell::new(0),
        }
    }
}

impl ClusterBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fit(
        &self,
        matrix: &[Vec<f32>],
        _config: &BackendConfig,
    ) -> Result<ClusterFit, BackendError> {
        self.rows.set(matrix.len());
        Ok(ClusterFit {
            labels: self.labels.clone(),
            edges: Vec::new(),
        })
    }
}

#[must_use]
pub fn chunk(document_id: &str, index: i64, vector: Vec<f32>) -> ChunkRecord {
    ChunkRecord {
        document_id: document_id.to_owned(),
        chunk_index: index,
        vector,
        title: Some(format!("Title {document_id}")),
        source: Some(format!("{document_id}.md")),
    }
}

/// Two tight groups of documents, two chunks each.
#[must_use]
pub fn two_topic_chunks() -> Vec<ChunkRecord> {
    let mut chunks = Vec::new();
    for (doc, offset) in [("a1", 0.0), ("a2", 0.01), ("a3", 0.02)] {
        chunks.push(chunk(doc, 0, vec![1.0, offset, 0.0]));
        chunks.push(chunk(doc, 1, vec![1.0, 0.0, offset]));
    }
    for (doc, offset) in [("b1", 0.0), ("b2", 0.01), ("b3", 0.02)] {
        chunks.push(chunk(doc, 0, vec![offset, 0.0, 1.0]));
        chunks.push(chunk(doc, 1, vec![0.0, offset, 1.0]));
    }
    chunks
}

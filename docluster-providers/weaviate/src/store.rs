//! [`ChunkStore`] over a Weaviate instance.

use std::{sync::Arc, time::Duration};

use docluster_core::{ChunkRecord, ChunkStore, ChunkStoreError};
use serde_json::json;
use tracing::debug;

use crate::{
    query::{build_query, parse_chunks},
    transport::{HttpTransport, UreqTransport},
};

/// Default Weaviate base URL.
pub const DEFAULT_URL: &str = "http://localhost:8080";
/// Default chunk collection.
pub const DEFAULT_COLLECTION: &str = "DocumentChunk";

/// Connection settings for [`WeaviateChunkStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL, without a trailing `/v1`.
    pub url: String,
    /// Collection holding the chunk objects.
    pub collection: String,
    /// Named vector space to read, if the collection uses named vectors.
    pub vector_name: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            collection: DEFAULT_COLLECTION.to_owned(),
            vector_name: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Reads chunk embeddings from Weaviate through GraphQL.
#[derive(Debug, Clone)]
pub struct WeaviateChunkStore<T = UreqTransport> {
    config: StoreConfig,
    base_url: String,
    pub(crate) transport: T,
}

impl WeaviateChunkStore<UreqTransport> {
    /// Creates a store using a blocking `ureq` transport.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: HttpTransport> WeaviateChunkStore<T> {
    /// Creates a store over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(config: StoreConfig, transport: T) -> Self {
        let base_url = config.url.trim_end_matches('/').to_owned();
        Self {
            config,
            base_url,
            transport,
        }
    }

    /// Returns the connection settings.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn ready_url(&self) -> String {
        format!("{}/v1/.well-known/ready", self.base_url)
    }

    fn graphql_url(&self) -> String {
        format!("{}/v1/graphql", self.base_url)
    }
}

impl<T: HttpTransport> ChunkStore for WeaviateChunkStore<T> {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn check_ready(&self) -> Result<(), ChunkStoreError> {
        let url = self.ready_url();
        self.transport
            .get(&url)
            .map_err(|error| ChunkStoreError::Unavailable {
                endpoint: Arc::from(self.base_url.as_str()),
                message: Arc::from(error.message),
            })
    }

    fn fetch_chunks(&self, document_ids: &[String]) -> Result<Vec<ChunkRecord>, ChunkStoreError> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        let vector_name = self.config.vector_name.as_deref();
        let query = build_query(&self.config.collection, document_ids, vector_name);
        let response = self
            .transport
            .post_json(&self.graphql_url(), &json!({ "query": query }))
            .map_err(|error| ChunkStoreError::Request {
                message: Arc::from(error.message),
            })?;
        let chunks = parse_chunks(&response, &self.config.collection, vector_name)?;
        debug!(
            documents = document_ids.len(),
            chunks = chunks.len(),
            "decoded chunk batch"
        );
        Ok(chunks)
    }
}

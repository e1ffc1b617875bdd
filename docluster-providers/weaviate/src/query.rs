//! GraphQL query construction and response decoding.

use std::{collections::BTreeMap, sync::Arc};

use docluster_core::{ChunkRecord, ChunkStoreError};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Maximum number of objects requested per query.
pub const QUERY_LIMIT: usize = 10_000;

fn quoted(value: &str) -> String {
    // A JSON string literal is a valid GraphQL string literal.
    Value::String(value.to_owned()).to_string()
}

fn equal_filter(document_id: &str) -> String {
    format!(
        "{{path: [\"documentId\"], operator: Equal, valueText: {}}}",
        quoted(document_id)
    )
}

/// Builds the `Get` query for one batch of document ids.
///
/// Several ids are combined with an `Or` filter. With `vector_name` set the
/// named vector is requested from `_additional.vectors`, otherwise the
/// default `_additional.vector`.
///
/// # Examples
/// ```
/// use docluster_providers_weaviate::build_query;
///
/// let query = build_query("DocumentChunk", &["d1".to_owned()], None);
/// assert!(query.contains("DocumentChunk(limit: 10000"));
/// assert!(query.contains("valueText: \"d1\""));
/// ```
#[must_use]
pub fn build_query(collection: &str, document_ids: &[String], vector_name: Option<&str>) -> String {
    let filter = match document_ids {
        [single] => equal_filter(single),
        ids => {
            let operands: Vec<String> = ids.iter().map(|id| equal_filter(id)).collect();
            format!("{{operator: Or, operands: [{}]}}", operands.join(", "))
        }
    };
    let vector = vector_name.map_or_else(
        || "vector".to_owned(),
        |name| format!("vectors {{ {name} }}"),
    );
    format!(
        "{{ Get {{ {collection}(limit: {QUERY_LIMIT}, where: {filter}) \
         {{ documentId chunkIndex title source _additional {{ {vector} }} }} }} }}"
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChunk {
    document_id: Option<String>,
    chunk_index: Option<i64>,
    title: Option<String>,
    source: Option<String>,
    #[serde(rename = "_additional")]
    additional: Option<Additional>,
}

#[derive(Debug, Deserialize)]
struct Additional {
    vector: Option<Vec<f32>>,
    vectors: Option<BTreeMap<String, Option<Vec<f32>>>>,
}

impl Additional {
    /// Picks the vector requested by [`build_query`]: the named entry of
    /// `vectors`, or `vector` when no name is configured.
    fn into_vector(self, vector_name: Option<&str>) -> Option<Vec<f32>> {
        match vector_name {
            Some(name) => self.vectors?.remove(name).flatten(),
            None => self.vector,
        }
    }
}

fn invalid(message: impl Into<Arc<str>>) -> ChunkStoreError {
    ChunkStoreError::InvalidResponse {
        message: message.into(),
    }
}

/// Decodes the chunks of a `Get` response.
///
/// Objects without a vector or without a `documentId` are skipped.
///
/// # Errors
/// Returns [`ChunkStoreError::InvalidResponse`] when the response carries
/// GraphQL errors or lacks the collection array.
pub fn parse_chunks(
    response: &Value,
    collection: &str,
    vector_name: Option<&str>,
) -> Result<Vec<ChunkRecord>, ChunkStoreError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array)
        && let Some(first) = errors.first()
    {
        let message = first
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown GraphQL error");
        return Err(invalid(format!("GraphQL error: {message}")));
    }

    let objects = response
        .pointer(&format!("/data/Get/{collection}"))
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(format!("response has no `{collection}` array")))?;

    let mut chunks = Vec::with_capacity(objects.len());
    for object in objects {
        let raw: RawChunk = serde_json::from_value(object.clone())
            .map_err(|error| invalid(format!("malformed chunk object: {error}")))?;
        let Some(document_id) = raw.document_id else {
            debug!("skipping chunk without documentId");
            continue;
        };
        let Some(vector) = raw
            .additional
            .and_then(|additional| additional.into_vector(vector_name))
        else {
            debug!(document_id = %document_id, "skipping chunk without vector");
            continue;
        };
        chunks.push(ChunkRecord {
            document_id,
            chunk_index: raw.chunk_index.unwrap_or_default(),
            vector,
            title: raw.title,
            source: raw.source,
        });
    }
    Ok(chunks)
}

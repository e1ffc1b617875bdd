use std::cell::RefCell;

use docluster_core::{ChunkStore, ChunkStoreErrorCode};
use rstest::rstest;
use serde_json::{Value, json};

use super::{
    HttpTransport, StoreConfig, TransportError, WeaviateChunkStore, build_query, parse_chunks,
};

#[derive(Default)]
struct ScriptedTransport {
    ready: bool,
    response: Option<Value>,
    requests: RefCell<Vec<(String, Value)>>,
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<(), TransportError> {
        self.requests.borrow_mut().push((url.to_owned(), Value::Null));
        if self.ready {
            Ok(())
        } else {
            Err(TransportError::new("connection refused"))
        }
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        self.requests
            .borrow_mut()
            .push((url.to_owned(), body.clone()));
        self.response
            .clone()
            .ok_or_else(|| TransportError::new("http status: 500"))
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|&id| id.to_owned()).collect()
}

fn response(objects: Value) -> Value {
    json!({ "data": { "Get": { "DocumentChunk": objects } } })
}

#[test]
fn batches_are_combined_with_or() {
    let query = build_query("DocumentChunk", &ids(&["d1", "d\"2"]), None);
    assert!(query.contains("operator: Or"));
    assert!(query.contains(r#"valueText: "d1""#));
    assert!(query.contains(r#"valueText: "d\"2""#));
    assert!(query.contains("_additional { vector }"));
    assert!(query.contains("limit: 10000"));
}

#[test]
fn named_vectors_are_requested_by_name() {
    let query = build_query("DocumentChunk", &ids(&["d1"]), Some("content"));
    assert!(query.contains("_additional { vectors { content } }"));
    assert!(!query.contains("operator: Or"));
}

#[rstest]
#[case::default_vector(None, json!({"vector": [1.0, 2.0]}), Some(vec![1.0, 2.0]))]
#[case::named_vector(
    Some("content"),
    json!({"vectors": {"content": [3.0], "title": [4.0]}}),
    Some(vec![3.0])
)]
#[case::missing_named_vector(Some("content"), json!({"vectors": {"title": [4.0]}}), None)]
#[case::named_vectors_need_a_name(None, json!({"vectors": {"default": [5.0]}}), None)]
#[case::null_vector(None, json!({"vector": null}), None)]
fn selects_vector(
    #[case] vector_name: Option<&str>,
    #[case] additional: Value,
    #[case] expected: Option<Vec<f32>>,
) {
    let body = response(json!([{
        "documentId": "d1",
        "chunkIndex": 4,
        "title": "Doc",
        "source": "doc.md",
        "_additional": additional,
    }]));
    let chunks = parse_chunks(&body, "DocumentChunk", vector_name).expect("valid response");
    assert_eq!(chunks.first().map(|chunk| chunk.vector.clone()), expected);
    if let Some(chunk) = chunks.first() {
        assert_eq!(chunk.chunk_index, 4);
        assert_eq!(chunk.title.as_deref(), Some("Doc"));
    }
}

#[test]
fn skips_objects_without_document_id() {
    let body = response(json!([
        {"chunkIndex": 0, "_additional": {"vector": [1.0]}},
        {"documentId": "d2", "chunkIndex": 1, "_additional": {"vector": [2.0]}},
    ]));
    let chunks = parse_chunks(&body, "DocumentChunk", None).expect("valid response");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].document_id, "d2");
    assert_eq!(chunks[0].title, None);
}

#[rstest]
#[case::graphql_error(json!({"errors": [{"message": "Cannot query field"}]}))]
#[case::missing_collection(json!({"data": {"Get": {}}}))]
#[case::malformed_object(response(json!([{"documentId": 7}])))]
fn rejects_invalid_responses(#[case] body: Value) {
    let err = parse_chunks(&body, "DocumentChunk", None).expect_err("invalid response");
    assert_eq!(err.code(), ChunkStoreErrorCode::InvalidResponse);
}

#[test]
fn store_posts_graphql_to_versioned_endpoint() {
    let transport = ScriptedTransport {
        ready: true,
        response: Some(response(json!([
            {"documentId": "d1", "chunkIndex": 0, "_additional": {"vector": [1.0]}}
        ]))),
        ..ScriptedTransport::default()
    };
    let config = StoreConfig {
        url: "http://weaviate:8080/".to_owned(),
        ..StoreConfig::default()
    };
    let store = WeaviateChunkStore::with_transport(config, transport);

    store.check_ready().expect("ready");
    let chunks = store.fetch_chunks(&ids(&["d1"])).expect("fetch succeeds");
    assert_eq!(chunks.len(), 1);

    let requests = store_requests(&store);
    assert_eq!(requests[0].0, "http://weaviate:8080/v1/.well-known/ready");
    assert_eq!(requests[1].0, "http://weaviate:8080/v1/graphql");
    assert!(
        requests[1].1["query"]
            .as_str()
            .is_some_and(|query| query.contains("DocumentChunk"))
    );
}

fn store_requests(store: &WeaviateChunkStore<ScriptedTransport>) -> Vec<(String, Value)> {
    store.transport.requests.borrow().clone()
}

#[test]
fn unreachable_store_is_unavailable() {
    let store = WeaviateChunkStore::with_transport(StoreConfig::default(), ScriptedTransport::default());
    let err = store.check_ready().expect_err("not ready");
    assert_eq!(err.code(), ChunkStoreErrorCode::Unavailable);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn failed_request_is_a_request_error() {
    let store = WeaviateChunkStore::with_transport(StoreConfig::default(), ScriptedTransport::default());
    let err = store.fetch_chunks(&ids(&["d1"])).expect_err("server error");
    assert_eq!(err.code(), ChunkStoreErrorCode::Request);
}

#[test]
fn empty_batch_issues_no_request() {
    let store = WeaviateChunkStore::with_transport(StoreConfig::default(), ScriptedTransport::default());
    assert!(store.fetch_chunks(&[]).expect("nothing to fetch").is_empty());
    assert!(store_requests(&store).is_empty());
}

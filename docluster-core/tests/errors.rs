use std::{num::NonZeroUsize, sync::Arc};

use docluster_core::{
    AggregationError, BackendError, BackendErrorCode, ChunkStoreError, ChunkStoreErrorCode,
    DoclusterError, DoclusterErrorCode, MetadataStoreError, MetadataStoreErrorCode, PointKind,
};
use rstest::rstest;

#[rstest]
#[case(
    MetadataStoreError::MissingDatabase { path: Arc::from("data/docluster.db") },
    MetadataStoreErrorCode::MissingDatabase,
)]
#[case(
    MetadataStoreError::Open { path: Arc::from("x.db"), message: Arc::from("locked") },
    MetadataStoreErrorCode::Open,
)]
#[case(
    MetadataStoreError::Query { message: Arc::from("syntax error") },
    MetadataStoreErrorCode::Query,
)]
fn returns_expected_metadata_code(
    #[case] error: MetadataStoreError,
    #[case] expected: MetadataStoreErrorCode,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().to_string(), expected.as_str());
}

#[rstest]
#[case(
    ChunkStoreError::Unavailable { endpoint: Arc::from("http://w"), message: Arc::from("down") },
    ChunkStoreErrorCode::Unavailable,
)]
#[case(ChunkStoreError::Request { message: Arc::from("timeout") }, ChunkStoreErrorCode::Request)]
#[case(
    ChunkStoreError::InvalidResponse { message: Arc::from("missing data") },
    ChunkStoreErrorCode::InvalidResponse,
)]
fn returns_expected_chunk_store_code(
    #[case] error: ChunkStoreError,
    #[case] expected: ChunkStoreErrorCode,
) {
    assert_eq!(error.code(), expected);
}

#[rstest]
#[case(DoclusterError::InvalidMinClusterSize { got: 1 }, "DOCLUSTER_INVALID_MIN_CLUSTER_SIZE")]
#[case(DoclusterError::EmptyUserId, "DOCLUSTER_EMPTY_USER_ID")]
#[case(
    DoclusterError::NoChunks { user_id: Arc::from("u") },
    "DOCLUSTER_NO_CHUNKS",
)]
#[case(
    DoclusterError::InsufficientData {
        user_id: Arc::from("u"),
        kind: PointKind::Documents,
        count: 3,
        min_cluster_size: NonZeroUsize::new(5).expect("non-zero"),
    },
    "DOCLUSTER_INSUFFICIENT_DATA",
)]
#[case(
    DoclusterError::VectorStore {
        error: ChunkStoreError::Request { message: Arc::from("x") },
    },
    "DOCLUSTER_VECTOR_STORE_UNAVAILABLE",
)]
#[case(DoclusterError::from(AggregationError::NoVectors), "DOCLUSTER_AGGREGATION_FAILED")]
#[case(DoclusterError::from(BackendError::EmptyMatrix), "DOCLUSTER_BACKEND_FAILED")]
fn returns_expected_docluster_code(#[case] error: DoclusterError, #[case] expected: &str) {
    assert_eq!(error.code().as_str(), expected);
}

#[test]
fn insufficient_data_message_names_the_unit() {
    let error = DoclusterError::InsufficientData {
        user_id: Arc::from("u"),
        kind: PointKind::Chunks,
        count: 2,
        min_cluster_size: NonZeroUsize::new(5).expect("non-zero"),
    };
    assert_eq!(
        error.to_string(),
        "user `u` has 2 chunks but min_cluster_size requires 5"
    );
    assert!(!error.is_invalid_input());
}

#[test]
fn backend_failure_keeps_source_code() {
    let error = DoclusterError::from(BackendError::EmptyMatrix);
    let DoclusterError::Backend(inner) = &error else {
        panic!("expected backend variant");
    };
    assert_eq!(inner.code(), BackendErrorCode::EmptyMatrix);
    assert_eq!(error.code(), DoclusterErrorCode::Backend);
}

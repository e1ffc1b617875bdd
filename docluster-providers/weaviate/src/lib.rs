//! Weaviate-backed chunk embedding store.
//!
//! Chunks are read through the GraphQL `Get` endpoint, one query per batch of
//! document ids, with vectors requested through `_additional`.

mod query;
mod store;
mod transport;

pub use query::{QUERY_LIMIT, build_query, parse_chunks};
pub use store::{DEFAULT_COLLECTION, DEFAULT_URL, StoreConfig, WeaviateChunkStore};
pub use transport::{HttpTransport, TransportError, UreqTransport};

#[cfg(test)]
mod tests;

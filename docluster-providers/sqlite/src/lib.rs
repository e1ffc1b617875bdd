//! SQLite-backed document metadata store.

mod store;

pub use store::{MAX_BOUND_IDS, SqliteMetadataStore};

#[cfg(test)]
mod tests;

//! [`MetadataStore`] over the `documents` table.
//!
//! Expected schema: `documents(id, user_id, title, source, tags, summary)`,
//! where `tags` holds a JSON array of strings.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use docluster_core::{DocumentMetadata, MetadataStore, MetadataStoreError};
use rusqlite::{Connection, OpenFlags, params_from_iter, types::Value};
use tracing::{debug, warn};

/// Largest number of document ids bound into one `IN (...)` list.
///
/// Kept below SQLite's historical limit of 999 host parameters, leaving room
/// for the `user_id` parameter.
pub const MAX_BOUND_IDS: usize = 900;

/// Reads document ids and metadata from a SQLite database file.
///
/// Each call opens a short-lived read-only connection, so the store holds no
/// handle between pipeline stages.
#[derive(Debug, Clone)]
pub struct SqliteMetadataStore {
    name: String,
    path: PathBuf,
}

impl SqliteMetadataStore {
    /// Creates a store for the database at `path`.
    ///
    /// The file is not opened until the first query.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("sqlite:{}", path.display()),
            path,
        }
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, MetadataStoreError> {
        let path_label = || Arc::from(self.path.display().to_string());
        if !self.path.exists() {
            return Err(MetadataStoreError::MissingDatabase { path: path_label() });
        }
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|error| MetadataStoreError::Open {
            path: path_label(),
            message: Arc::from(error.to_string()),
        })
    }
}

fn query_error(error: &rusqlite::Error) -> MetadataStoreError {
    MetadataStoreError::Query {
        message: Arc::from(error.to_string()),
    }
}

fn parse_tags(document_id: &str, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|error| {
        warn!(document_id, error = %error, "ignoring unparsable tags");
        Vec::new()
    })
}

impl MetadataStore for SqliteMetadataStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn document_ids(&self, user_id: &str) -> Result<Vec<String>, MetadataStoreError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT id FROM documents WHERE user_id = ?1")
            .map_err(|error| query_error(&error))?;
        let ids = statement
            .query_map([user_id], |row| row.get::<_, String>(0))
            .map_err(|error| query_error(&error))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| query_error(&error))?;
        debug!(user_id, documents = ids.len(), "resolved document ids");
        Ok(ids)
    }

    fn metadata(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, DocumentMetadata>, MetadataStoreError> {
        let mut metadata = HashMap::with_capacity(ids.len());
        if ids.is_empty() {
            return Ok(metadata);
        }

        let connection = self.connect()?;
        for batch in ids.chunks(MAX_BOUND_IDS) {
            let placeholders = vec!["?"; batch.len()].join(",");
            let sql = format!(
                "SELECT id, title, source, tags, summary FROM documents \
                 WHERE user_id = ? AND id IN ({placeholders})"
            );
            let bound = std::iter::once(Value::Text(user_id.to_owned()))
                .chain(batch.iter().map(|id| Value::Text(id.clone())));

            let mut statement = connection
                .prepare(&sql)
                .map_err(|error| query_error(&error))?;
            let rows = statement
                .query_map(params_from_iter(bound), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })
                .map_err(|error| query_error(&error))?;

            for row in rows {
                let (id, title, source, tags, summary) = row.map_err(|error| query_error(&error))?;
                let tags = parse_tags(&id, tags.as_deref());
                metadata.insert(
                    id,
                    DocumentMetadata {
                        title,
                        source,
                        tags,
                        summary,
                    },
                );
            }
        }
        Ok(metadata)
    }
}

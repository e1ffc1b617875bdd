use docluster_core::{MetadataStore, MetadataStoreErrorCode};
use rstest::{fixture, rstest};
use rusqlite::{Connection, params};
use tempfile::TempDir;

use super::{MAX_BOUND_IDS, SqliteMetadataStore};

struct Database {
    _dir: TempDir,
    store: SqliteMetadataStore,
}

fn create_database(rows: &[(&str, &str, Option<&str>, Option<&str>)]) -> Database {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("docluster.db");
    let connection = Connection::open(&path).expect("create database");
    connection
        .execute_batch(
            "CREATE TABLE documents (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT,
                source TEXT,
                tags TEXT,
                summary TEXT
            );",
        )
        .expect("create table");
    for (id, user, title, tags) in rows {
        connection
            .execute(
                "INSERT INTO documents (id, user_id, title, source, tags, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, user, title, format!("{id}.pdf"), tags, Option::<String>::None],
            )
            .expect("insert row");
    }
    Database {
        store: SqliteMetadataStore::new(path),
        _dir: dir,
    }
}

#[fixture]
fn database() -> Database {
    create_database(&[
        ("d1", "alice", Some("First"), Some(r#"["rust","notes"]"#)),
        ("d2", "alice", None, Some("not json")),
        ("d3", "alice", Some("Third"), None),
        ("d4", "bob", Some("Other"), None),
    ])
}

#[rstest]
fn lists_documents_for_user(database: Database) {
    let mut ids = database.store.document_ids("alice").expect("query succeeds");
    ids.sort();
    assert_eq!(ids, vec!["d1", "d2", "d3"]);
    assert!(
        database
            .store
            .document_ids("carol")
            .expect("query succeeds")
            .is_empty()
    );
}

#[rstest]
fn loads_metadata_and_tolerates_bad_tags(database: Database) {
    let ids: Vec<String> = ["d1", "d2", "d4", "missing"]
        .iter()
        .map(|&id| id.to_owned())
        .collect();
    let metadata = database.store.metadata("alice", &ids).expect("query succeeds");

    assert_eq!(metadata.len(), 2);
    let first = &metadata["d1"];
    assert_eq!(first.title.as_deref(), Some("First"));
    assert_eq!(first.source.as_deref(), Some("d1.pdf"));
    assert_eq!(first.tags, vec!["rust", "notes"]);
    assert_eq!(first.summary, None);
    assert!(metadata["d2"].tags.is_empty());
    assert!(!metadata.contains_key("d4"));
}

#[test]
fn chunks_long_id_lists() {
    let owned: Vec<String> = (0..MAX_BOUND_IDS * 2 + 7).map(|i| format!("doc-{i}")).collect();
    let rows: Vec<(&str, &str, Option<&str>, Option<&str>)> = owned
        .iter()
        .map(|id| (id.as_str(), "alice", None, None))
        .collect();
    let database = create_database(&rows);

    let metadata = database.store.metadata("alice", &owned).expect("query succeeds");
    assert_eq!(metadata.len(), owned.len());
}

#[test]
fn empty_id_list_skips_the_database() {
    let store = SqliteMetadataStore::new("/nonexistent/docluster.db");
    assert!(store.metadata("alice", &[]).expect("no query needed").is_empty());
}

#[test]
fn missing_database_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteMetadataStore::new(dir.path().join("absent.db"));

    let err = store.document_ids("alice").expect_err("file does not exist");
    assert_eq!(err.code(), MetadataStoreErrorCode::MissingDatabase);
    assert!(!dir.path().join("absent.db").exists());
}

#[test]
fn missing_table_is_a_query_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.db");
    Connection::open(&path)
        .and_then(|c| c.execute_batch("CREATE TABLE other (x INTEGER);"))
        .expect("create database");

    let err = SqliteMetadataStore::new(path)
        .document_ids("alice")
        .expect_err("documents table is missing");
    assert_eq!(err.code(), MetadataStoreErrorCode::Query);
}

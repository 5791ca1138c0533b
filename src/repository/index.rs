//! SQLite-backed acquisition store for indexed records.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, parse_datetime, RepositoryError, Result};
use crate::models::{DocumentMetadata, IndexedRecord};
use crate::services::retry::{with_retries, RetryPolicy};

/// SQLite-backed store keyed on `stable_id`.
#[derive(Debug, Clone)]
pub struct IndexRepository {
    db_path: PathBuf,
    retry: RetryPolicy,
}

impl IndexRepository {
    /// Open (and initialize) the store at the given database path.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
            retry: RetryPolicy::exponential(5, Duration::from_secs(1), Duration::from_secs(16)),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = connect(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                content TEXT NOT NULL,
                index_time TEXT NOT NULL,
                date TEXT,
                time TEXT,
                location TEXT,
                mission_names TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Run one store operation on a fresh connection, retrying transient
    /// faults with capped exponential backoff.
    async fn call<T, F>(&self, what: &'static str, f: F) -> Result<T>
    where
        F: Fn(&Connection) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);
        with_retries(&self.retry, what, || {
            let db_path = self.db_path.clone();
            let f = Arc::clone(&f);
            async move {
                tokio::task::spawn_blocking(move || {
                    let conn = connect(&db_path)?;
                    f(&conn)
                })
                .await
                .map_err(|e| RepositoryError::Task(e.to_string()))?
            }
        })
        .await
    }

    /// Has this document already been indexed?
    pub async fn is_indexed(&self, stable_id: &str) -> Result<bool> {
        let stable_id = stable_id.to_string();
        self.call("index check", move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM files WHERE id = ?",
                    params![stable_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Insert or update the record for its stable id.
    ///
    /// Idempotent: repeated upserts of the same record are no-ops beyond
    /// the write itself.
    pub async fn upsert(&self, record: &IndexedRecord) -> Result<()> {
        let record = record.clone();
        self.call("record upsert", move |conn| {
            conn.execute(
                "INSERT INTO files (id, filename, content, index_time, date, time, location, mission_names)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     filename = excluded.filename,
                     content = excluded.content,
                     index_time = excluded.index_time,
                     date = excluded.date,
                     time = excluded.time,
                     location = excluded.location,
                     mission_names = excluded.mission_names",
                params![
                    record.id,
                    record.filename,
                    record.content,
                    record.index_time.to_rfc3339(),
                    record.metadata.date,
                    record.metadata.time,
                    record.metadata.location,
                    record.metadata.mission_names,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Get a record by stable id.
    pub async fn get(&self, stable_id: &str) -> Result<Option<IndexedRecord>> {
        let stable_id = stable_id.to_string();
        self.call("record fetch", move |conn| {
            let record = conn
                .query_row(
                    "SELECT id, filename, content, index_time, date, time, location, mission_names
                     FROM files WHERE id = ?",
                    params![stable_id],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    /// Case-insensitive substring search over content, location, and
    /// mission names. Presence matching only; no relevance scoring.
    pub async fn search(&self, query: &str) -> Result<Vec<IndexedRecord>> {
        let pattern = format!("%{}%", query.to_lowercase());
        self.call("record search", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, filename, content, index_time, date, time, location, mission_names
                 FROM files
                 WHERE LOWER(content) LIKE ?1
                    OR LOWER(location) LIKE ?1
                    OR LOWER(mission_names) LIKE ?1
                 ORDER BY id",
            )?;
            let records = stmt
                .query_map(params![pattern], row_to_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    /// Number of indexed records.
    pub async fn count(&self) -> Result<u64> {
        self.call("record count", move |conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<IndexedRecord> {
    let index_time: String = row.get("index_time")?;
    Ok(IndexedRecord {
        id: row.get("id")?,
        filename: row.get("filename")?,
        content: row.get("content")?,
        index_time: parse_datetime(&index_time),
        metadata: DocumentMetadata {
            date: row.get("date")?,
            time: row.get("time")?,
            location: row.get("location")?,
            mission_names: row.get("mission_names")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_record(id: &str) -> IndexedRecord {
        IndexedRecord {
            id: id.to_string(),
            filename: format!("national_archives/{}.pdf", id),
            content: "Page 1:\nOperation Mongoose in Dallas".to_string(),
            index_time: Utc::now(),
            metadata: DocumentMetadata {
                date: Some("November 22, 1963".to_string()),
                time: Some("2:30 PM".to_string()),
                location: Some("Dallas, Texas".to_string()),
                mission_names: Some("Operation Mongoose".to_string()),
            },
        }
    }

    fn open_repo(dir: &tempfile::TempDir) -> IndexRepository {
        IndexRepository::new(&dir.path().join("test.db")).unwrap()
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir);

        let record = sample_record("na_doc1");
        repo.upsert(&record).await.unwrap();
        repo.upsert(&record).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.is_indexed("na_doc1").await.unwrap());
        assert!(!repo.is_indexed("na_doc2").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_replaces_fields() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir);

        let mut record = sample_record("na_doc1");
        repo.upsert(&record).await.unwrap();

        record.content = "revised content".to_string();
        record.metadata.location = None;
        repo.upsert(&record).await.unwrap();

        let loaded = repo.get("na_doc1").await.unwrap().unwrap();
        assert_eq!(loaded.content, "revised content");
        assert_eq!(loaded.metadata.location, None);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_fields() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir);
        repo.upsert(&sample_record("na_doc1")).await.unwrap();

        assert_eq!(repo.search("mongoose").await.unwrap().len(), 1);
        assert_eq!(repo.search("DALLAS").await.unwrap().len(), 1);
        assert_eq!(repo.search("page 1").await.unwrap().len(), 1);
        assert!(repo.search("submarine").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_skips_null_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir);

        let mut record = sample_record("na_doc1");
        record.metadata.location = None;
        record.metadata.mission_names = None;
        repo.upsert(&record).await.unwrap();

        // NULL columns must not poison the match on content.
        assert_eq!(repo.search("operation").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reopen_sees_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let repo = IndexRepository::new(&db_path).unwrap();
            repo.upsert(&sample_record("na_doc1")).await.unwrap();
        }

        let repo = IndexRepository::new(&db_path).unwrap();
        assert!(repo.is_indexed("na_doc1").await.unwrap());
    }
}

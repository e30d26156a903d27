//! SQLite-backed cache store
//!
//! Schema:
//!
//! ```sql
//! semantic_cache(id INTEGER PRIMARY KEY, query_text TEXT UNIQUE,
//!                embedding BLOB, response TEXT, created_at TEXT)
//! ```
//!
//! Embeddings are little-endian `f32` blobs, timestamps RFC 3339 text.
//! The single connection sits behind a mutex, so upserts are serialized.

use crate::error::CacheError;
use crate::store::{decode_vector, encode_vector, CacheRecord, CacheStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS semantic_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query_text TEXT NOT NULL UNIQUE,
    embedding BLOB NOT NULL,
    response TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

const UPSERT: &str = "
INSERT INTO semantic_cache (query_text, embedding, response, created_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(query_text) DO UPDATE SET
    embedding = excluded.embedding,
    response = excluded.response,
    created_at = excluded.created_at
";

/// Raw row before vector/timestamp decoding
type RawRow = (String, Vec<u8>, String, String);

/// Persistent cache store on a SQLite file
#[derive(Debug)]
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteCacheStore {
    /// Open (or create) the store at `path`, creating parent directories
    ///
    /// # Errors
    /// - `CacheError::Io` if the parent directory cannot be created
    /// - `CacheError::Sqlite` if the database cannot be opened or migrated
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    /// Returns `CacheError::Sqlite` if the schema cannot be created
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?path, "semantic cache store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file location, `None` for in-memory stores
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn decode(row: RawRow) -> Result<CacheRecord, CacheError> {
        let (query_text, blob, response, created_at) = row;
        let embedding = decode_vector(&query_text, &blob)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| CacheError::MalformedTimestamp {
                query: query_text.clone(),
                value: created_at.clone(),
            })?;
        Ok(CacheRecord {
            query_text,
            embedding,
            response,
            created_at,
        })
    }
}

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

impl CacheStore for SqliteCacheStore {
    fn upsert(&self, record: CacheRecord) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            UPSERT,
            params![
                record.query_text,
                encode_vector(&record.embedding),
                record.response,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<CacheRecord>, CacheError> {
        let rows: Vec<RawRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT query_text, embedding, response, created_at FROM semantic_cache ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], raw_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(Self::decode).collect()
    }

    fn get(&self, query_text: &str) -> Result<Option<CacheRecord>, CacheError> {
        let row: Option<RawRow> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT query_text, embedding, response, created_at FROM semantic_cache WHERE query_text = ?1",
                params![query_text],
                raw_row,
            )
            .optional()?
        };
        row.map(Self::decode).transpose()
    }

    fn len(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM semantic_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

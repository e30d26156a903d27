//! Audit trail
//!
//! One record per completed (non-cached) investigation, append-only. The
//! file sink keeps a single JSON array and replaces it atomically on every
//! append, so readers never observe a half-written file.

use crate::error::AuditError;
use crate::types::{Caller, Report, RetrievedChunk, Role};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Default number of records returned by [`history`]
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// One completed investigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the investigation completed
    pub timestamp: DateTime<Utc>,
    /// Caller user name
    pub user: String,
    /// Caller role
    pub role: Role,
    /// Query as submitted
    pub query: String,
    /// Final classification
    pub classification: String,
    /// Final report
    pub report: Report,
    /// Synthesis model id
    pub model_version: String,
    /// Sources listed in the result
    pub sources_referenced: Vec<String>,
    /// Retrieved passages
    pub retrieved_chunks: Vec<RetrievedChunk>,
}

/// Durable append-only record store
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    /// Append one record atomically
    fn append(&self, record: AuditRecord) -> Result<(), AuditError>;

    /// All records, oldest first
    fn records(&self) -> Result<Vec<AuditRecord>, AuditError>;

    /// Records for one user, oldest first
    fn records_for_user(&self, user: &str) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.user == user)
            .collect())
    }
}

/// Most recent `limit` records visible to `caller`, oldest first
///
/// Admins see every record; analysts only their own.
///
/// # Errors
/// Propagates sink read errors
pub fn history(
    sink: &dyn AuditSink,
    caller: &Caller,
    limit: usize,
) -> Result<Vec<AuditRecord>, AuditError> {
    let mut records = if caller.role.is_admin() {
        sink.records()?
    } else {
        sink.records_for_user(&caller.user)?
    };
    let skip = records.len().saturating_sub(limit);
    records.drain(..skip);
    Ok(records)
}

/// In-process sink
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if no records were appended
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records.lock().push(record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self.records.lock().clone())
    }
}

/// Sink persisting a JSON array of records
#[derive(Debug)]
pub struct JsonFileAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileAuditSink {
    /// Sink at `path`; the file is created on first append
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Audit file location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| AuditError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, records: &[AuditRecord]) -> Result<(), AuditError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AuditError::Io(e.error))?;
        Ok(())
    }
}

impl AuditSink for JsonFileAuditSink {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        records.push(record);
        self.persist(&records)?;
        tracing::debug!(path = %self.path.display(), total = records.len(), "audit record appended");
        Ok(())
    }

    fn records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let _guard = self.write_lock.lock();
        self.load()
    }
}

//! Cache records and storage backends

use crate::error::CacheError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One cached response, keyed by exact query text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Exact query text (unique key)
    pub query_text: String,
    /// Embedding of `query_text`
    pub embedding: Vec<f32>,
    /// Serialized response payload (JSON)
    pub response: String,
    /// When this record was last written
    pub created_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Create record stamped with the current time
    #[inline]
    #[must_use]
    pub fn new(query_text: impl Into<String>, embedding: Vec<f32>, response: String) -> Self {
        Self {
            query_text: query_text.into(),
            embedding,
            response,
            created_at: Utc::now(),
        }
    }

    /// Embedding dimension
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// Persistence backend for cache records
///
/// `upsert` must be atomic per exact `query_text`: concurrent writers of the
/// same text leave exactly one record holding one writer's payload.
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Insert or overwrite the record for `record.query_text`
    fn upsert(&self, record: CacheRecord) -> Result<(), CacheError>;

    /// All records, in storage order
    fn records(&self) -> Result<Vec<CacheRecord>, CacheError>;

    /// Record for an exact query text
    fn get(&self, query_text: &str) -> Result<Option<CacheRecord>, CacheError>;

    /// Number of records
    fn len(&self) -> Result<usize, CacheError>;

    /// Whether the store holds no records
    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

/// In-process store; insertion order is storage order
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: RwLock<IndexMap<String, CacheRecord>>,
}

impl MemoryCacheStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn upsert(&self, record: CacheRecord) -> Result<(), CacheError> {
        self.records
            .write()
            .insert(record.query_text.clone(), record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<CacheRecord>, CacheError> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn get(&self, query_text: &str) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.records.read().get(query_text).cloned())
    }

    fn len(&self) -> Result<usize, CacheError> {
        Ok(self.records.read().len())
    }
}

/// Encode a vector as little-endian `f32` bytes
pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes
pub(crate) fn decode_vector(query: &str, bytes: &[u8]) -> Result<Vec<f32>, CacheError> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(CacheError::MalformedVector {
            query: query.to_string(),
            reason: format!("blob of {} bytes is not a non-empty f32 sequence", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

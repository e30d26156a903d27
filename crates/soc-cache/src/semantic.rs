//! Semantic response cache
//!
//! Similarity-based read, exact-key write. See the crate docs for the
//! asymmetry; this module only adds the mechanics.

use crate::embedder::Embedder;
use crate::error::{CacheError, EmbedError};
use crate::similarity::match_score;
use crate::store::{CacheRecord, CacheStore};
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Default minimum cosine similarity for a hit
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.90;

/// Capacity of the in-process embedding memo
const EMBEDDING_MEMO_CAPACITY: u64 = 1024;

/// Embedding-keyed response cache
///
/// Cheap to clone; clones share the store, the embedder and the memo.
#[derive(Clone)]
pub struct SemanticCache {
    store: Arc<dyn CacheStore>,
    embedder: Arc<dyn Embedder>,
    threshold: f64,
    memo: Cache<String, Arc<Vec<f32>>>,
}

impl SemanticCache {
    /// Create cache over a store with the default 0.90 threshold
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            memo: Cache::new(EMBEDDING_MEMO_CAPACITY),
        }
    }

    /// With a custom similarity threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Get the similarity threshold
    #[inline]
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Look up a response for `query`; any failure is a miss
    pub async fn lookup<P: DeserializeOwned>(&self, query: &str) -> Option<P> {
        match self.try_lookup(query).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Look up a response for `query`
    ///
    /// Scans every record; the best score wins, earlier records win ties.
    /// Zero-norm vectors never match.
    ///
    /// # Errors
    /// - `CacheError::Embedding` if the query cannot be embedded
    /// - `CacheError::DimensionMismatch` if a stored vector has another dimension
    /// - store and payload decoding errors
    pub async fn try_lookup<P: DeserializeOwned>(
        &self,
        query: &str,
    ) -> Result<Option<P>, CacheError> {
        let query_vector = self.embed(query).await?;
        let records = self.with_store(|store| store.records()).await?;

        let mut best: Option<&CacheRecord> = None;
        let mut best_score = f64::NEG_INFINITY;

        for record in &records {
            if record.dimension() != query_vector.len() {
                return Err(CacheError::DimensionMismatch {
                    query: record.query_text.clone(),
                    expected: query_vector.len(),
                    actual: record.dimension(),
                });
            }
            let score = match_score(&query_vector, &record.embedding);
            if score > best_score {
                best_score = score;
                best = Some(record);
            }
        }

        match best {
            Some(record) if best_score >= self.threshold => {
                tracing::debug!(
                    matched = %record.query_text,
                    similarity = best_score,
                    "semantic cache hit"
                );
                Ok(Some(serde_json::from_str(&record.response)?))
            }
            _ => {
                tracing::debug!(
                    closest = best.map(|r| r.query_text.as_str()),
                    similarity = best_score,
                    records = records.len(),
                    "semantic cache miss"
                );
                Ok(None)
            }
        }
    }

    /// Store a response under the exact `query` text; failures are logged and dropped
    pub async fn store<P: Serialize + ?Sized>(&self, query: &str, response: &P) {
        if let Err(e) = self.try_store(query, response).await {
            tracing::warn!(error = %e, "cache store failed, response not cached");
        }
    }

    /// Store a response under the exact `query` text
    ///
    /// # Errors
    /// Embedding, serialization and store errors
    pub async fn try_store<P: Serialize + ?Sized>(
        &self,
        query: &str,
        response: &P,
    ) -> Result<(), CacheError> {
        let embedding = self.embed(query).await?;
        let payload = serde_json::to_string(response)?;
        let record = CacheRecord::new(query, embedding.as_ref().clone(), payload);
        self.with_store(move |store| store.upsert(record)).await
    }

    /// Number of stored records
    ///
    /// # Errors
    /// Store errors
    pub fn len(&self) -> Result<usize, CacheError> {
        self.store.len()
    }

    /// Whether no records are stored
    ///
    /// # Errors
    /// Store errors
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        self.store.is_empty()
    }

    /// Run a store operation on the blocking pool
    async fn with_store<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CacheStore) -> Result<T, CacheError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref())).await?
    }

    async fn embed(&self, text: &str) -> Result<Arc<Vec<f32>>, CacheError> {
        if let Some(vector) = self.memo.get(text).await {
            return Ok(vector);
        }
        let vector = self.embedder.embed(text).await?;
        if vector.is_empty() {
            return Err(EmbedError::Empty.into());
        }
        let vector = Arc::new(vector);
        self.memo.insert(text.to_owned(), Arc::clone(&vector)).await;
        Ok(vector)
    }
}

impl fmt::Debug for SemanticCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticCache")
            .field("store", &self.store)
            .field("threshold", &self.threshold)
            .field("memo_entries", &self.memo.entry_count())
            .finish_non_exhaustive()
    }
}

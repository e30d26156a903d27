//! Error types for the semantic cache

/// Errors raised by an [`Embedder`](crate::Embedder)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmbedError {
    /// Provider request failed
    #[error("embedding request failed: {0}")]
    Request(String),

    /// Provider returned no vector
    #[error("embedding provider returned an empty vector")]
    Empty,
}

/// Cache operation errors
///
/// None of these reach pipeline callers: `lookup` maps them to a miss and
/// `store` logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Embedding the query failed
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    /// Underlying SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO failure preparing the store location
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored vector blob cannot be decoded
    #[error("malformed embedding stored for '{query}': {reason}")]
    MalformedVector {
        /// Query text of the offending record
        query: String,
        /// Why decoding failed
        reason: String,
    },

    /// Stored row has an unreadable timestamp
    #[error("malformed timestamp stored for '{query}': {value}")]
    MalformedTimestamp {
        /// Query text of the offending record
        query: String,
        /// Raw stored value
        value: String,
    },

    /// Stored vector has a different dimension than the query vector
    #[error("dimension mismatch for '{query}': expected {expected}, found {actual}")]
    DimensionMismatch {
        /// Query text of the offending record
        query: String,
        /// Query vector dimension
        expected: usize,
        /// Stored vector dimension
        actual: usize,
    },

    /// Blocking store task panicked or was cancelled
    #[error("cache store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Payload (de)serialization failed
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

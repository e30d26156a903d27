//! SOC Semantic Cache
//!
//! Approximate-match response cache that sits in front of the investigation
//! pipeline.
//!
//! # Read/write asymmetry
//!
//! - **lookup** is similarity-based: the best cosine match at or above the
//!   threshold (default 0.90) is served
//! - **store** is exact-key: only a byte-identical query text overwrites an
//!   existing record, near-duplicates become separate records
//!
//! Caching is best-effort. `lookup` turns every failure into a miss and
//! `store` suppresses every failure; the fallible `try_*` forms exist for
//! callers that want the error.
//!
//! # Architecture
//!
//! ```text
//! query → Embedder → [moka memo] → linear cosine scan over CacheStore → payload
//!                                        ↑
//!                     MemoryCacheStore | SqliteCacheStore
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use soc_cache::{MemoryCacheStore, SemanticCache};
//! use std::sync::Arc;
//!
//! # async fn example(embedder: Arc<dyn soc_cache::Embedder>) {
//! let cache = SemanticCache::new(Arc::new(MemoryCacheStore::new()), embedder);
//!
//! cache.store("ransomware on host 7", &"report").await;
//! let hit: Option<String> = cache.lookup("ransomware on host 7").await;
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod embedder;
pub mod error;
pub mod semantic;
pub mod similarity;
pub mod sqlite;
pub mod store;

// Re-exports for convenience
pub use embedder::Embedder;
pub use error::{CacheError, EmbedError};
pub use semantic::{SemanticCache, DEFAULT_SIMILARITY_THRESHOLD};
pub use similarity::{cosine_similarity, match_score};
pub use sqlite::SqliteCacheStore;
pub use store::{CacheRecord, CacheStore, MemoryCacheStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the semantic cache
    pub use crate::{
        CacheError, CacheRecord, CacheStore, EmbedError, Embedder, MemoryCacheStore,
        SemanticCache, SqliteCacheStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

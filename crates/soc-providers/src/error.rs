//! Provider construction errors
//!
//! Call-time failures map onto the core error types
//! ([`ModelError`](soc_core::ModelError), [`EmbedError`](soc_cache::EmbedError),
//! [`RetrievalError`](soc_core::RetrievalError)).

use std::path::PathBuf;

/// Provider setup errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP client could not be built
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Passage file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File location
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Passage file line is not a passage object
    #[error("{path}:{line}: invalid passage: {source}")]
    Passage {
        /// File location
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

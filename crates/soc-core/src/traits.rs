//! Collaborator seams
//!
//! The pipeline reaches every external system through these traits. Model
//! prompts, the vector index and the log source live behind them.

use crate::error::{ModelError, RetrievalError};
use crate::types::RetrievedPassage;
use async_trait::async_trait;

/// Text completion model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceModel: Send + Sync {
    /// Complete a single prompt, returning the raw answer text
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;

    /// Model identifier recorded in the audit trail
    fn model_id(&self) -> String;
}

/// Knowledge-base retriever
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Top `k` passages for `query`, best first
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

/// Authentication log analyzer
///
/// Failures (missing or unreadable logs) are reported inside the summary
/// text; the pipeline passes it on verbatim.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogAnalyzer: Send + Sync {
    /// Summarize sources with at least `threshold` failed attempts
    async fn analyze(&self, threshold: u32) -> String;
}

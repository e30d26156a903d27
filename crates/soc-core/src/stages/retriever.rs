//! Retrieval stage

use crate::error::InvestigationError;
use crate::state_machine::RETRIEVAL_BLOCKED;
use crate::traits::KnowledgeRetriever;
use crate::types::{InvestigationState, PassageMetadata, RetrievedChunk, StateDelta};
use std::sync::Arc;

/// Default number of passages requested
pub const DEFAULT_TOP_K: usize = 3;

/// Citation prefix for the 1-based result `index`
///
/// `[Source 2: PB-7 v1.3]`, with `N/A` and `1.0` standing in for missing
/// metadata.
#[must_use]
pub fn citation_label(index: usize, metadata: &PassageMetadata) -> String {
    format!(
        "[Source {index}: {} v{}]",
        metadata.doc_id_or_default(),
        metadata.version_or_default()
    )
}

/// Fetches and labels knowledge-base passages
pub struct RetrievalStage {
    retriever: Arc<dyn KnowledgeRetriever>,
    top_k: usize,
}

impl RetrievalStage {
    /// Create stage requesting the default top 3
    #[must_use]
    pub fn new(retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        Self {
            retriever,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// With number of passages requested
    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set labeled context passages and their audit chunks
    ///
    /// A flagged query gets the blocked placeholder and no chunks; the
    /// retriever is not called.
    ///
    /// # Errors
    /// Returns `InvestigationError::Retrieval` if the retriever fails
    pub async fn run(&self, state: &InvestigationState) -> Result<StateDelta, InvestigationError> {
        if state.security_flag {
            tracing::info!("retrieval blocked by security flag");
            return Ok(StateDelta::new().with_context(vec![RETRIEVAL_BLOCKED.to_string()], Vec::new()));
        }

        let passages = self
            .retriever
            .retrieve(&state.sanitized_query, self.top_k)
            .await?;

        let mut context = Vec::with_capacity(passages.len());
        let mut chunks = Vec::with_capacity(passages.len());
        for (i, passage) in passages.into_iter().take(self.top_k).enumerate() {
            let index = i + 1;
            context.push(format!(
                "{} {}",
                citation_label(index, &passage.metadata),
                passage.content
            ));
            chunks.push(RetrievedChunk {
                label: format!("Source {index}"),
                content: passage.content,
                metadata: passage.metadata,
            });
        }

        tracing::info!(passages = chunks.len(), top_k = self.top_k, "context retrieved");
        Ok(StateDelta::new().with_context(context, chunks))
    }
}

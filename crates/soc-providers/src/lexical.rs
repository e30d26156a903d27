//! Term-overlap knowledge retriever
//!
//! Passages come from a JSONL file, one object per line:
//!
//! ```json
//! {"doc_id": "PB-RANSOM-01", "version": "1.2", "content": "Isolate the host...", "source": "playbooks"}
//! ```
//!
//! Ranking counts distinct query terms present in a passage; ties keep file
//! order. Passages sharing no term with the query are not returned.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use soc_core::{KnowledgeRetriever, PassageMetadata, RetrievalError, RetrievedPassage};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PassageRow {
    content: String,
    #[serde(flatten)]
    metadata: PassageMetadata,
}

#[derive(Debug)]
struct IndexedPassage {
    passage: RetrievedPassage,
    terms: HashSet<String>,
}

/// In-memory passage index
#[derive(Debug, Default)]
pub struct LexicalRetriever {
    passages: Vec<IndexedPassage>,
}

impl LexicalRetriever {
    /// Index passages in the given order
    #[must_use]
    pub fn from_passages(passages: impl IntoIterator<Item = RetrievedPassage>) -> Self {
        Self {
            passages: passages
                .into_iter()
                .map(|passage| IndexedPassage {
                    terms: terms(&passage.content).collect(),
                    passage,
                })
                .collect(),
        }
    }

    /// Load a JSONL passage file; blank lines are skipped
    ///
    /// # Errors
    /// - `ProviderError::Io` if the file cannot be read
    /// - `ProviderError::Passage` if a line is not a passage object
    pub async fn from_jsonl(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProviderError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let mut passages = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: PassageRow =
                serde_json::from_str(line).map_err(|source| ProviderError::Passage {
                    path: path.to_path_buf(),
                    line: i + 1,
                    source,
                })?;
            passages.push(RetrievedPassage::new(row.content, row.metadata));
        }

        tracing::info!(path = %path.display(), passages = passages.len(), "knowledge base loaded");
        Ok(Self::from_passages(passages))
    }

    /// Number of indexed passages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Check if the index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<RetrievedPassage> {
        let query_terms: HashSet<String> = terms(query).collect();
        let mut scored: Vec<(usize, &IndexedPassage)> = self
            .passages
            .iter()
            .map(|p| (p.terms.intersection(&query_terms).count(), p))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(_, p)| p.passage.clone())
            .collect()
    }
}

/// Lowercase alphanumeric terms of two or more characters
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
}

#[async_trait]
impl KnowledgeRetriever for LexicalRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let results = self.rank(query, k);
        tracing::debug!(k, returned = results.len(), "lexical retrieval");
        Ok(results)
    }
}

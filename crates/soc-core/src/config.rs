//! Investigator configuration

use crate::stages::log_gate::DEFAULT_OFFENDER_THRESHOLD;
use crate::stages::retriever::DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use soc_cache::DEFAULT_SIMILARITY_THRESHOLD;
use soc_guard::DEFAULT_MAX_CHARS;

/// Pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestigatorConfig {
    /// Minimum cosine similarity for a cache hit
    pub cache_threshold: f64,
    /// Passages requested from the retriever
    pub top_k: usize,
    /// Attempts at which a source IP counts as an offender
    pub offender_threshold: u32,
    /// Query length bound applied by the sanitizer
    pub max_query_chars: usize,
}

impl InvestigatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache similarity threshold
    #[inline]
    #[must_use]
    pub fn with_cache_threshold(mut self, threshold: f64) -> Self {
        self.cache_threshold = threshold;
        self
    }

    /// With retriever top-k
    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// With offender threshold
    #[inline]
    #[must_use]
    pub fn with_offender_threshold(mut self, threshold: u32) -> Self {
        self.offender_threshold = threshold;
        self
    }

    /// With query length bound
    #[inline]
    #[must_use]
    pub fn with_max_query_chars(mut self, max: usize) -> Self {
        self.max_query_chars = max;
        self
    }
}

impl Default for InvestigatorConfig {
    fn default() -> Self {
        Self {
            cache_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            offender_threshold: DEFAULT_OFFENDER_THRESHOLD,
            max_query_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = InvestigatorConfig::new();
        assert_eq!(config.cache_threshold, 0.90);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.offender_threshold, 50);
        assert_eq!(config.max_query_chars, 1000);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: InvestigatorConfig = serde_json::from_str(r#"{"top_k": 5}"#).unwrap();
        assert_eq!(config, InvestigatorConfig::new().with_top_k(5));
    }
}

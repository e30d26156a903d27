//! Embedding provider seam

use crate::error::EmbedError;
use async_trait::async_trait;

/// Produces fixed-dimension embedding vectors for text
///
/// Implementations must return vectors of one dimension for the lifetime of
/// a cache store; a mismatch against stored vectors is treated as a miss.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

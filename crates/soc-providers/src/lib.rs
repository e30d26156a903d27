//! SOC Providers
//!
//! Concrete collaborators for the investigator:
//! - [`OpenAiCompatClient`]: chat completions ([`InferenceModel`](soc_core::InferenceModel))
//!   and embeddings ([`Embedder`](soc_cache::Embedder)) over any
//!   OpenAI-compatible HTTP API
//! - [`LexicalRetriever`]: term-overlap ranking over a JSONL passage file
//!   ([`KnowledgeRetriever`](soc_core::KnowledgeRetriever))

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod lexical;
pub mod openai;

pub use error::ProviderError;
pub use lexical::LexicalRetriever;
pub use openai::{OpenAiCompatClient, ProviderConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Retrieval-augmented conversation memory.
//!
//! A per-conversation similarity index, a TTL-bounded query cache, and the
//! adapter that composes them behind `add_interaction` / `query_history`.

use anyhow::Result;
use async_trait::async_trait;

pub mod adapter;
pub mod cache;
pub mod index;

pub use adapter::{ConversationMemory, MemoryMode};
pub use cache::QueryCache;
pub use index::SimilarityIndex;

/// Produces a fixed-length numeric vector for a text.
///
/// This is the memory subsystem's only view of the embedding collaborator;
/// HTTP clients and test doubles plug in interchangeably.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds the text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

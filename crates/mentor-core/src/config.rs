//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryMode;

/// Essential configuration settings for the chat engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Number of context fragments to retrieve per query.
    pub search_k: usize,
    /// Number of characters accumulated before a chunk is emitted.
    pub buffer_size: usize,
    /// How long a cached retrieval result stays valid.
    pub cache_ttl: Duration,
    /// Maximum number of cached retrieval results.
    pub cache_capacity: usize,
    /// Maximum number of live sessions held by the registry.
    pub registry_capacity: usize,
    /// Model used for answer generation.
    pub chat_model: String,
    /// Model used for topic labeling.
    pub label_model: String,
    /// Memory strategy selected at construction.
    pub memory_mode: MemoryMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            search_k: 5,
            buffer_size: crate::chat::generator::DEFAULT_BUFFER_SIZE,
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 100,
            registry_capacity: 100,
            chat_model: "gpt-4o-mini".to_string(),
            label_model: "gpt-4o-mini".to_string(),
            memory_mode: MemoryMode::WithTranscript,
        }
    }
}

//! Conversational memory adapter.
//!
//! Wraps the similarity index and the query cache behind two operations:
//! append an interaction, and retrieve relevant history for a query. The
//! memory strategy is an explicit variant chosen at construction rather
//! than a runtime flag checked at every call site.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::chat::message::{MemoryTurn, MessageRole};
use crate::config::ChatConfig;
use crate::error::{MentorError, Result};
use crate::memory::cache::QueryCache;
use crate::memory::index::SimilarityIndex;
use crate::memory::EmbeddingProvider;

/// Memory strategy selected when the adapter is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryMode {
    /// Similarity retrieval only.
    SimilarityOnly,
    /// Similarity retrieval plus a role-aware transcript log for
    /// structured retrieval.
    WithTranscript,
}

/// Per-conversation memory: a similarity index fronted by a TTL cache,
/// with an optional role-aware transcript.
pub struct ConversationMemory {
    index: RwLock<SimilarityIndex>,
    cache: Mutex<QueryCache>,
    transcript: RwLock<Vec<MemoryTurn>>,
    mode: MemoryMode,
    search_k: usize,
}

impl ConversationMemory {
    /// Creates a memory instance, optionally seeded with initial context.
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` if embedding the seed fails.
    pub async fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        config: &ChatConfig,
        seed: Option<&str>,
    ) -> Result<Self> {
        let index = SimilarityIndex::with_seed(embedder, seed).await?;
        Ok(Self {
            index: RwLock::new(index),
            cache: Mutex::new(QueryCache::new(config.cache_ttl, config.cache_capacity)),
            transcript: RwLock::new(Vec::new()),
            mode: config.memory_mode,
            search_k: config.search_k,
        })
    }

    /// Retrieves history fragments relevant to a query, cache first.
    ///
    /// On a miss the similarity index is searched, each fragment is trimmed,
    /// and the result is written back to the cache.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the query is empty
    /// - `Retrieval` if the embedding/search path fails; never swallowed,
    ///   since the caller needs to know whether the prompt context is
    ///   trustworthy
    pub async fn query_history(&self, query: &str) -> Result<Vec<String>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(MentorError::invalid_argument(
                "query must be a non-empty string",
            ));
        }

        if let Some(hit) = self.cache.lock().await.get(trimmed) {
            debug!(query = trimmed, "retrieval cache hit");
            return Ok(hit);
        }

        let raw = self.index.read().await.search(trimmed, self.search_k).await?;
        let results: Vec<String> = raw.iter().map(|r| r.trim().to_string()).collect();

        self.cache.lock().await.put(trimmed, results.clone());
        Ok(results)
    }

    /// Retrieves relevant history as role-tagged turns.
    ///
    /// Fragments carrying a known `"Role:"` prefix come back typed; the
    /// rest are untagged.
    pub async fn query_turns(&self, query: &str) -> Result<Vec<MemoryTurn>> {
        let fragments = self.query_history(query).await?;
        Ok(fragments.iter().map(|f| MemoryTurn::parse(f)).collect())
    }

    /// Appends a paired human/AI interaction to the index.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either message is empty (no state mutation)
    /// - `Retrieval` if embedding fails
    pub async fn add_interaction(&self, human: &str, ai: &str) -> Result<()> {
        if human.trim().is_empty() {
            return Err(MentorError::invalid_argument(
                "human message must be a non-empty string",
            ));
        }
        if ai.trim().is_empty() {
            return Err(MentorError::invalid_argument(
                "AI message must be a non-empty string",
            ));
        }

        let human_turn = MemoryTurn::tagged(MessageRole::Human, human);
        let ai_turn = MemoryTurn::tagged(MessageRole::Assistant, ai);
        let texts = vec![human_turn.to_fragment(), ai_turn.to_fragment()];

        self.index.write().await.add(&texts).await?;

        if self.mode == MemoryMode::WithTranscript {
            let mut transcript = self.transcript.write().await;
            transcript.push(human_turn);
            transcript.push(ai_turn);
        }
        Ok(())
    }

    /// Appends a single message, optionally tagged with a role.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the message is empty (no state mutation)
    /// - `Retrieval` if embedding fails
    pub async fn add_message(&self, message: &str, role: Option<MessageRole>) -> Result<()> {
        if message.trim().is_empty() {
            return Err(MentorError::invalid_argument(
                "message must be a non-empty string",
            ));
        }

        let turn = MemoryTurn {
            role,
            content: message.to_string(),
        };
        self.index.write().await.add(&[turn.to_fragment()]).await?;

        if self.mode == MemoryMode::WithTranscript {
            self.transcript.write().await.push(turn);
        }
        Ok(())
    }

    /// Re-seeds the index and purges the cache in one step.
    ///
    /// Both locks are held across the reset, so no caller can observe the
    /// old index with a fresh cache or the other way around.
    pub async fn clear(&self, seed: Option<&str>) -> Result<()> {
        let mut index = self.index.write().await;
        let mut cache = self.cache.lock().await;
        index.clear(seed).await?;
        cache.purge();
        if self.mode == MemoryMode::WithTranscript {
            self.transcript.write().await.clear();
        }
        Ok(())
    }

    /// Returns the transcript recorded so far (empty in `SimilarityOnly`).
    pub async fn transcript(&self) -> Vec<MemoryTurn> {
        self.transcript.read().await.clone()
    }

    /// The memory strategy this adapter was built with.
    pub fn mode(&self) -> MemoryMode {
        self.mode
    }

    /// Number of fragments currently indexed.
    pub async fn indexed_fragments(&self) -> usize {
        self.index.read().await.len()
    }
}

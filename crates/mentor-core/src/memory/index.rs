//! In-memory similarity index.
//!
//! Stores (text, embedding) pairs and answers nearest-neighbor queries by
//! cosine similarity. The embedding function is pluggable through
//! [`EmbeddingProvider`]; every stored text gets its vector at insertion
//! time, and the store is append-only between clears.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{MentorError, Result};
use crate::memory::EmbeddingProvider;

struct IndexEntry {
    text: String,
    embedding: Vec<f32>,
}

/// A per-conversation vector index over short text fragments.
pub struct SimilarityIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: Vec<IndexEntry>,
}

impl SimilarityIndex {
    /// Creates an empty index backed by the given embedder.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Creates an index pre-populated with an optional seed text.
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` if embedding the seed fails.
    pub async fn with_seed(
        embedder: Arc<dyn EmbeddingProvider>,
        seed: Option<&str>,
    ) -> Result<Self> {
        let mut index = Self::new(embedder);
        index.clear(seed).await?;
        Ok(index)
    }

    /// Appends texts to the index, embedding each at insertion time.
    ///
    /// Validation happens before any embedding call, so an invalid input
    /// leaves the index untouched.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if any text is empty after trimming
    /// - `Retrieval` if the embedding provider fails
    pub async fn add(&mut self, texts: &[String]) -> Result<()> {
        for text in texts {
            if text.trim().is_empty() {
                return Err(MentorError::invalid_argument(
                    "indexed text must be a non-empty string",
                ));
            }
        }

        // Embed into a staging buffer first so a provider failure midway
        // does not leave a half-inserted batch behind.
        let mut staged = Vec::with_capacity(texts.len());
        for text in texts {
            let embedding = self
                .embedder
                .embed(text)
                .await
                .map_err(|e| MentorError::retrieval(e.to_string()))?;
            staged.push(IndexEntry {
                text: text.clone(),
                embedding,
            });
        }
        self.entries.extend(staged);
        Ok(())
    }

    /// Returns up to `k` stored texts, most similar to the query first.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the query is empty or `k` is zero
    /// - `Retrieval` if embedding the query fails
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MentorError::invalid_argument(
                "query must be a non-empty string",
            ));
        }
        if k == 0 {
            return Err(MentorError::invalid_argument("k must be positive"));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MentorError::retrieval(e.to_string()))?;

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&query_vector, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, entry)| entry.text.clone())
            .collect())
    }

    /// Discards all stored vectors and re-seeds with an optional text.
    ///
    /// The replacement is built before the swap, so a failed seed embedding
    /// leaves the previous contents intact — there is no half-cleared state.
    pub async fn clear(&mut self, seed: Option<&str>) -> Result<()> {
        let mut fresh = Vec::new();
        if let Some(seed) = seed {
            if !seed.trim().is_empty() {
                let embedding = self
                    .embedder
                    .embed(seed)
                    .await
                    .map_err(|e| MentorError::retrieval(e.to_string()))?;
                fresh.push(IndexEntry {
                    text: seed.to_string(),
                    embedding,
                });
            }
        }
        self.entries = fresh;
        Ok(())
    }

    /// Number of stored fragments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity with guards for zero-norm and mismatched vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

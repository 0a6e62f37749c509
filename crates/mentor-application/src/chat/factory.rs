//! Factory for creating ChatSession instances.
//!
//! Handles the conversion between persisted conversation history and a
//! live session: a cold conversation is rebuilt by replaying every stored
//! interaction into a fresh memory adapter, which is exactly the expensive
//! path the registry exists to amortize.

use std::sync::Arc;

use tracing::info;

use mentor_core::config::ChatConfig;
use mentor_core::conversation::ConversationStore;
use mentor_core::error::{MentorError, Result};
use mentor_core::llm::LanguageModel;
use mentor_core::memory::{ConversationMemory, EmbeddingProvider};

use super::session::ChatSession;

/// Builds live sessions from persisted conversation state.
pub struct SessionFactory {
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn ConversationStore>,
    config: ChatConfig,
}

impl SessionFactory {
    /// Creates a factory over the shared collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn ConversationStore>,
        config: ChatConfig,
    ) -> Self {
        Self {
            embedder,
            model,
            store,
            config,
        }
    }

    /// Creates a session, replaying any persisted history into fresh memory.
    ///
    /// A conversation with no stored history comes up empty, with no topic
    /// label — the first exchange will derive one.
    ///
    /// # Errors
    ///
    /// - `Retrieval` if history or label loading fails, or replay embedding
    ///   fails
    pub async fn create(&self, conversation_id: &str) -> Result<ChatSession> {
        let interactions = self
            .store
            .load_interactions(conversation_id)
            .await
            .map_err(|e| MentorError::retrieval(e.to_string()))?;
        let label = self
            .store
            .get_label(conversation_id)
            .await
            .map_err(|e| MentorError::retrieval(e.to_string()))?;

        let memory = ConversationMemory::new(self.embedder.clone(), &self.config, None).await?;
        for interaction in &interactions {
            memory
                .add_interaction(&interaction.question, &interaction.answer)
                .await?;
        }

        if !interactions.is_empty() {
            info!(
                conversation_id,
                replayed = interactions.len(),
                "reconstructed session from persisted history"
            );
        }

        Ok(ChatSession::new(
            conversation_id.to_string(),
            Arc::new(memory),
            self.model.clone(),
            self.store.clone(),
            &self.config,
            label,
        ))
    }

    /// The engine configuration sessions are built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

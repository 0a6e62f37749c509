//! Conversation service facade.
//!
//! Wires the session factory, the bounded registry, and the shared
//! collaborators into the operations an outer transport layer consumes:
//! start a conversation, ask a follow-up, stop an in-flight generation,
//! inspect or delete stored history.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use mentor_core::chat::GenerateOptions;
use mentor_core::config::ChatConfig;
use mentor_core::conversation::{ConversationStore, Interaction};
use mentor_core::error::{MentorError, Result};
use mentor_core::llm::LanguageModel;
use mentor_core::memory::EmbeddingProvider;
use mentor_infrastructure::AsyncDirConversationStore;
use mentor_interaction::{ApiConfig, OpenAiChatModel, OpenAiEmbeddings};

use crate::chat::factory::SessionFactory;
use crate::chat::registry::SessionRegistry;
use crate::chat::session::{AnswerStream, ChatSession};

/// Service for conversational interactions over persisted sessions.
pub struct ChatService {
    factory: SessionFactory,
    registry: SessionRegistry<ChatSession>,
    /// Cancellation handle for each conversation's latest generation.
    active: Mutex<HashMap<String, CancellationToken>>,
    store: Arc<dyn ConversationStore>,
}

impl ChatService {
    /// Creates a service over explicit collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn ConversationStore>,
        config: ChatConfig,
    ) -> Self {
        let registry = SessionRegistry::new(config.registry_capacity);
        let factory = SessionFactory::new(embedder, model, store.clone(), config);
        Self {
            factory,
            registry,
            active: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Creates a service with environment-configured API clients and a
    /// directory-backed store rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if credentials are missing or the store directory
    /// cannot be created.
    pub async fn try_from_env(base_dir: impl AsRef<Path>) -> Result<Self> {
        let api = ApiConfig::from_env()?;
        let store = AsyncDirConversationStore::new(base_dir)
            .await
            .map_err(|e| MentorError::config(e.to_string()))?;

        let config = ChatConfig {
            chat_model: api.chat_model.clone(),
            ..ChatConfig::default()
        };

        Ok(Self::new(
            Arc::new(OpenAiEmbeddings::new(api.clone())),
            Arc::new(OpenAiChatModel::new(api)),
            Arc::new(store),
            config,
        ))
    }

    /// Starts a brand-new conversation and streams its first answer.
    ///
    /// The generated conversation id is available on the returned stream.
    pub async fn start_conversation(&self, options: GenerateOptions) -> Result<AnswerStream> {
        let conversation_id = Uuid::new_v4().to_string();
        info!(%conversation_id, "starting conversation");
        self.ask(&conversation_id, options).await
    }

    /// Streams an answer within a conversation, reconstructing the session
    /// from persisted history if it is not live in the registry.
    pub async fn ask(
        &self,
        conversation_id: &str,
        options: GenerateOptions,
    ) -> Result<AnswerStream> {
        let session = self
            .registry
            .get_or_create(conversation_id, || self.factory.create(conversation_id))
            .await?;

        let cancel = CancellationToken::new();
        self.active
            .lock()
            .await
            .insert(conversation_id.to_string(), cancel.clone());

        session.answer(options, cancel).await
    }

    /// Cooperatively stops the conversation's in-flight generation.
    ///
    /// Returns `false` when no generation has been started for the id.
    pub async fn stop(&self, conversation_id: &str) -> bool {
        match self.active.lock().await.get(conversation_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns the persisted exchanges of a conversation, oldest first.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Interaction>> {
        self.store
            .load_interactions(conversation_id)
            .await
            .map_err(|e| MentorError::retrieval(e.to_string()))
    }

    /// Returns the conversation's stored topic label, if any.
    pub async fn topic(&self, conversation_id: &str) -> Result<Option<String>> {
        self.store
            .get_label(conversation_id)
            .await
            .map_err(|e| MentorError::retrieval(e.to_string()))
    }

    /// Drops a conversation's live session without touching stored state.
    pub async fn evict(&self, conversation_id: &str) -> bool {
        self.active.lock().await.remove(conversation_id);
        self.registry.evict(conversation_id).await
    }

    /// Removes a conversation entirely: live session and stored history.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.evict(conversation_id).await;
        self.store
            .delete_conversation(conversation_id)
            .await
            .map_err(|e| MentorError::persist(e.to_string()))
    }
}

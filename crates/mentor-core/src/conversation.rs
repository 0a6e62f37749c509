//! Conversation persistence model and repository trait.
//!
//! Defines the interface for persisting finished exchanges, decoupling the
//! engine's core logic from the specific storage mechanism (JSON files,
//! database, remote API).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One persisted question/answer exchange.
///
/// Immutable once stored: the orchestrator creates it after a generation
/// completes and it is only ever replayed, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// The user's question.
    pub question: String,
    /// The assistant's full, assembled answer.
    pub answer: String,
    /// Timestamp when the exchange completed (ISO 8601 format).
    pub timestamp: String,
}

impl Interaction {
    /// Creates an interaction stamped with the current time.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// An abstract repository for conversation persistence.
///
/// Each call is assumed durable and atomic. The engine performs no retries
/// here; failures surface to the orchestrator, which maps them into its own
/// error taxonomy.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a finished exchange to a conversation's history.
    ///
    /// # Arguments
    ///
    /// * `conversation_id` - The conversation the exchange belongs to
    /// * `question` - The user's question
    /// * `answer` - The assembled answer
    async fn append_interaction(
        &self,
        conversation_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<()>;

    /// Loads all exchanges for a conversation, oldest first.
    ///
    /// A conversation with no stored history returns an empty list, not an
    /// error.
    async fn load_interactions(&self, conversation_id: &str) -> Result<Vec<Interaction>>;

    /// Sets the conversation's short topic label.
    async fn set_label(&self, conversation_id: &str, label: &str) -> Result<()>;

    /// Returns the conversation's topic label, if one has been derived.
    async fn get_label(&self, conversation_id: &str) -> Result<Option<String>>;

    /// Removes a conversation and its history.
    ///
    /// Deleting a conversation that does not exist is not an error.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
}

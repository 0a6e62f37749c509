//! Chat session orchestrator.
//!
//! Ties one memory adapter and one generator to one persisted conversation.
//! `answer` retrieves relevant history, streams the model's output in
//! buffered chunks, and — once the stream is drained or cancelled —
//! persists the exchange, derives a first-turn topic label, and feeds the
//! interaction back into memory for later retrieval.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use mentor_core::chat::{
    GenerateOptions, GenerationEvent, ResponseGenerator, ResponseStream,
};
use mentor_core::config::ChatConfig;
use mentor_core::conversation::ConversationStore;
use mentor_core::error::{MentorError, Result};
use mentor_core::llm::{LanguageModel, ModelOptions};
use mentor_core::memory::ConversationMemory;

/// One item yielded at the outer boundary: a generation event stamped with
/// the conversation and message identity.
#[derive(Debug)]
pub struct AnswerEvent {
    /// The conversation this answer belongs to.
    pub conversation_id: String,
    /// Identity of this answer within the conversation.
    pub message_id: String,
    /// The underlying generation event.
    pub event: GenerationEvent,
}

/// Orchestrator for a single persisted conversation.
pub struct ChatSession {
    conversation_id: String,
    memory: Arc<ConversationMemory>,
    generator: ResponseGenerator,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn ConversationStore>,
    /// Last-known topic label; `None` until the first exchange derives one.
    topic: RwLock<Option<String>>,
    /// At most one generation in flight per session; a second caller waits.
    generation_lock: Arc<Mutex<()>>,
    label_options: ModelOptions,
}

impl ChatSession {
    /// Creates a session over the given collaborators.
    ///
    /// `label` carries the stored topic for reconstructed sessions; a fresh
    /// session passes `None` and derives one on its first exchange.
    pub fn new(
        conversation_id: String,
        memory: Arc<ConversationMemory>,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn ConversationStore>,
        config: &ChatConfig,
        label: Option<String>,
    ) -> Self {
        Self {
            conversation_id,
            generator: ResponseGenerator::new(model.clone(), config),
            memory,
            model,
            store,
            topic: RwLock::new(label),
            generation_lock: Arc::new(Mutex::new(())),
            label_options: ModelOptions::new(config.label_model.clone(), 0.0),
        }
    }

    /// The conversation this session serves.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The session's current topic label, if derived.
    pub async fn topic(&self) -> Option<String> {
        self.topic.read().await.clone()
    }

    /// Generates an answer for the question as a lazy chunk stream.
    ///
    /// Each call is a fresh generation; restart means calling again.
    /// History retrieval happens before any streaming, so a retrieval
    /// failure aborts the call rather than producing a context-free answer.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty question
    /// - `Retrieval` if the history lookup fails
    /// - `Generation` if the model call cannot be started
    pub async fn answer(
        self: Arc<Self>,
        options: GenerateOptions,
        cancel: CancellationToken,
    ) -> Result<AnswerStream> {
        let guard = self.generation_lock.clone().lock_owned().await;

        let history = self.memory.query_history(&options.question).await?;
        let inner = self.generator.start(&options, &history, cancel).await?;

        Ok(AnswerStream {
            inner,
            question: options.question,
            message_id: Uuid::new_v4().to_string(),
            collected: String::new(),
            finalized: false,
            session: self,
            _guard: guard,
        })
    }

    /// Re-seeds the session's memory, discarding all indexed context.
    pub async fn reset_context(&self, seed: Option<&str>) -> Result<()> {
        self.memory.clear(seed).await
    }

    /// Runs the post-stream side effects for a finished exchange.
    ///
    /// Ordering matters: the exchange is persisted before it becomes
    /// retrievable, so a stored interaction is never invisible to a replay
    /// while being visible to in-memory retrieval.
    async fn finalize_exchange(&self, question: &str, answer: &str) -> Result<()> {
        if answer.trim().is_empty() {
            debug!(
                conversation_id = %self.conversation_id,
                "no answer text delivered, skipping persistence"
            );
            return Ok(());
        }

        self.store
            .append_interaction(&self.conversation_id, question, answer)
            .await
            .map_err(|e| {
                warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "failed to persist interaction"
                );
                MentorError::persist(e.to_string())
            })?;

        self.ensure_label(question).await;

        self.memory.add_interaction(question, answer).await?;
        Ok(())
    }

    /// Derives and stores the topic label on the session's first exchange.
    ///
    /// Runs while the generation lock is held, so concurrent first turns
    /// cannot both fire the label call. Best-effort: a failure is logged
    /// and the next first-exchange finalize tries again.
    async fn ensure_label(&self, question: &str) {
        let mut topic = self.topic.write().await;
        if topic.is_some() {
            return;
        }

        let prompt = format!(
            "Determine the topic of the question below. \
             Reply with the topic only, no other text.\n\nQuestion: {question}"
        );
        let label = match self.model.complete(&prompt, &self.label_options).await {
            Ok(label) => label.trim().to_string(),
            Err(e) => {
                warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "topic labeling failed"
                );
                return;
            }
        };
        if label.is_empty() {
            return;
        }

        if let Err(e) = self.store.set_label(&self.conversation_id, &label).await {
            warn!(
                conversation_id = %self.conversation_id,
                error = %e,
                "failed to persist topic label"
            );
            return;
        }
        *topic = Some(label);
    }
}

/// A lazy stream of [`AnswerEvent`]s for one `answer` call.
///
/// Holds the session's generation lock until it is dropped; the post-stream
/// side effects run exactly once, when the terminal event is produced.
pub struct AnswerStream {
    session: Arc<ChatSession>,
    inner: ResponseStream,
    question: String,
    message_id: String,
    collected: String,
    finalized: bool,
    _guard: OwnedMutexGuard<()>,
}

impl AnswerStream {
    /// Identity of the answer being generated.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The conversation this stream belongs to.
    pub fn conversation_id(&self) -> &str {
        self.session.conversation_id()
    }

    /// Produces the next event.
    ///
    /// `Done` runs the finalizer (persist, label, memory feedback) before
    /// it is returned; a finalizer failure is surfaced as a terminal
    /// `Failed` event without invalidating the text already streamed. A
    /// `Failed` generation persists nothing — the session stays usable for
    /// another attempt.
    pub async fn next_event(&mut self) -> Option<AnswerEvent> {
        let event = self.inner.next_event().await?;

        let event = match event {
            GenerationEvent::Chunk(chunk) => {
                self.collected.push_str(&chunk.text);
                GenerationEvent::Chunk(chunk)
            }
            GenerationEvent::Done(outcome) => {
                self.finalized = true;
                match self
                    .session
                    .finalize_exchange(&self.question, &self.collected)
                    .await
                {
                    Ok(()) => GenerationEvent::Done(outcome),
                    Err(err) => GenerationEvent::Failed(err),
                }
            }
            GenerationEvent::Failed(err) => {
                self.finalized = true;
                GenerationEvent::Failed(err)
            }
        };

        Some(AnswerEvent {
            conversation_id: self.session.conversation_id().to_string(),
            message_id: self.message_id.clone(),
            event,
        })
    }
}

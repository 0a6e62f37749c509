//! Streaming response generation with fixed-size buffering.
//!
//! Drives one language-model call with a composed prompt, reshapes the
//! provider's arbitrarily sized fragments into fixed-size chunks, and
//! supports cooperative mid-stream cancellation through an explicit token.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chat::options::{
    AnswerChunk, ChunkMetadata, GenerateOptions, GenerationEvent, GenerationOutcome,
};
use crate::config::ChatConfig;
use crate::error::{MentorError, Result};
use crate::llm::{LanguageModel, ModelOptions, TextStream};

/// Characters accumulated before a chunk is emitted.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

const SYSTEM_PROMPT: &str = "You are an expert learning assistant. Give clear, accurate, \
well-structured explanations that build on the prior discussion, use concrete examples, \
and close with a few follow-up questions that deepen understanding.";

/// Composes prompts and starts buffered generations.
pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
    buffer_size: usize,
    temperature: f32,
    default_model: String,
}

impl ResponseGenerator {
    /// Creates a generator over the given model with configured defaults.
    pub fn new(model: Arc<dyn LanguageModel>, config: &ChatConfig) -> Self {
        Self {
            model,
            buffer_size: config.buffer_size.max(1),
            temperature: config.temperature,
            default_model: config.chat_model.clone(),
        }
    }

    /// Starts a generation for the question, with retrieved history folded
    /// into the prompt.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the question is empty
    /// - `Generation` if the model call cannot be started
    pub async fn start(
        &self,
        options: &GenerateOptions,
        history: &[String],
        cancel: CancellationToken,
    ) -> Result<ResponseStream> {
        let question = options.question.trim();
        if question.is_empty() {
            return Err(MentorError::invalid_argument(
                "question must be a non-empty string",
            ));
        }

        let extra = options.extra_instructions.as_deref().unwrap_or("");
        let prompt = compose_prompt(question, history, extra);
        let prompt_chars = question.chars().count() + extra.chars().count();

        let model_options = ModelOptions {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            temperature: self.temperature,
            max_tokens: None,
        };

        let inner = self
            .model
            .stream(&prompt, &model_options)
            .await
            .map_err(|e| MentorError::generation(e.to_string()))?;

        Ok(ResponseStream {
            inner,
            buffer: String::new(),
            pending: VecDeque::new(),
            finished: false,
            buffer_size: self.buffer_size,
            prompt_chars,
            emitted_chars: 0,
            started_at: Instant::now(),
            cancel,
        })
    }

    /// The configured chunk threshold, in characters.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// Builds the full prompt from system text, retrieved context, the question
/// and any extra instructions.
fn compose_prompt(question: &str, history: &[String], extra_instructions: &str) -> String {
    let context = if history.is_empty() {
        "(no prior discussion)".to_string()
    } else {
        history.join("\n")
    };
    format!(
        "{SYSTEM_PROMPT}\n\n\
         Context from previous discussions:\n{context}\n\n\
         Current question: {question}\n\
         Additional instructions: {extra_instructions}"
    )
}

/// A pull-style stream of [`GenerationEvent`]s for one generation.
///
/// Drive it with `while let Some(event) = stream.next_event().await`.
/// The terminal event is always `Done` or `Failed`; afterwards the stream
/// yields `None`.
pub struct ResponseStream {
    inner: TextStream,
    buffer: String,
    pending: VecDeque<GenerationEvent>,
    finished: bool,
    buffer_size: usize,
    prompt_chars: usize,
    emitted_chars: usize,
    started_at: Instant,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("buffer", &self.buffer)
            .field("pending", &self.pending)
            .field("finished", &self.finished)
            .field("buffer_size", &self.buffer_size)
            .field("prompt_chars", &self.prompt_chars)
            .field("emitted_chars", &self.emitted_chars)
            .field("started_at", &self.started_at)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl ResponseStream {
    /// Produces the next event, pulling model fragments as needed.
    ///
    /// The cancellation token is checked once per incoming fragment, before
    /// it is consumed: on observation the partial buffer is flushed as a
    /// final chunk — exactly the characters received so far — and the stream
    /// ends with `Done(Cancelled)`.
    pub async fn next_event(&mut self) -> Option<GenerationEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            if self.cancel.is_cancelled() {
                self.flush_partial();
                self.finish(GenerationOutcome::Cancelled);
                continue;
            }

            match self.inner.next().await {
                Some(Ok(fragment)) => {
                    self.buffer.push_str(&fragment);
                    self.drain_full_chunks();
                }
                Some(Err(err)) => {
                    // The partial buffer is dropped: emitting it would make a
                    // truncated answer indistinguishable from a complete one.
                    self.buffer.clear();
                    self.finished = true;
                    self.pending
                        .push_back(GenerationEvent::Failed(MentorError::generation(
                            err.to_string(),
                        )));
                }
                None => {
                    self.flush_partial();
                    self.finish(GenerationOutcome::Completed);
                }
            }
        }
    }

    /// Whether the terminal event has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    /// Emits exact `buffer_size`-character chunks while the buffer holds at
    /// least that many characters.
    fn drain_full_chunks(&mut self) {
        while let Some(split_at) = boundary_after(&self.buffer, self.buffer_size) {
            let rest = self.buffer.split_off(split_at);
            let chunk = std::mem::replace(&mut self.buffer, rest);
            self.push_chunk(chunk);
        }
    }

    fn flush_partial(&mut self) {
        if !self.buffer.is_empty() {
            let chunk = std::mem::take(&mut self.buffer);
            self.push_chunk(chunk);
        }
    }

    fn finish(&mut self, outcome: GenerationOutcome) {
        self.finished = true;
        self.pending.push_back(GenerationEvent::Done(outcome));
    }

    fn push_chunk(&mut self, text: String) {
        self.emitted_chars += text.chars().count();
        let metadata = ChunkMetadata {
            timestamp: Utc::now(),
            latency_seconds: self.started_at.elapsed().as_secs_f64(),
            response_chars: self.emitted_chars,
            prompt_chars: self.prompt_chars,
        };
        self.pending
            .push_back(GenerationEvent::Chunk(AnswerChunk { text, metadata }));
    }
}

/// Byte index of the boundary after `n` characters, if the string holds at
/// least that many.
fn boundary_after(s: &str, n: usize) -> Option<usize> {
    let mut count = 0;
    for (idx, _) in s.char_indices() {
        if count == n {
            return Some(idx);
        }
        count += 1;
    }
    if count >= n { Some(s.len()) } else { None }
}

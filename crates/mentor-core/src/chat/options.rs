//! Generation options and streamed output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MentorError;

/// Options for generating one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// The user's current question.
    pub question: String,
    /// Model override for this call; the configured chat model otherwise.
    pub model: Option<String>,
    /// Additional instructions folded into the prompt.
    pub extra_instructions: Option<String>,
}

impl GenerateOptions {
    /// Creates options for a question with engine defaults.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            model: None,
            extra_instructions: None,
        }
    }
}

/// Metadata accompanying each streamed chunk.
///
/// Counts are simple character lengths, not tokenizer output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// When this chunk was emitted.
    pub timestamp: DateTime<Utc>,
    /// Seconds elapsed since generation started.
    pub latency_seconds: f64,
    /// Running count of response characters emitted so far, this chunk
    /// included.
    pub response_chars: usize,
    /// Character count of the question plus extra instructions.
    pub prompt_chars: usize,
}

/// A unit of streamed output text plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerChunk {
    /// The chunk text.
    pub text: String,
    /// Generation metadata at the time of emission.
    pub metadata: ChunkMetadata,
}

/// How a generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationOutcome {
    /// The model's stream was exhausted normally.
    Completed,
    /// A cooperative stop was observed mid-stream.
    Cancelled,
}

/// One item of the generation stream.
///
/// Every produced item is a tagged outcome, so a consumer cannot mistake a
/// failure for a normal end-of-stream.
#[derive(Debug)]
pub enum GenerationEvent {
    /// A buffered chunk of answer text.
    Chunk(AnswerChunk),
    /// Terminal event: the stream finished.
    Done(GenerationOutcome),
    /// Terminal event: the stream aborted.
    Failed(MentorError),
}

impl GenerationEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::Done(_) | GenerationEvent::Failed(_))
    }
}

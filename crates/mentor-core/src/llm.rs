//! Language-model collaborator trait.
//!
//! The engine talks to its model through this seam so that HTTP clients,
//! local runtimes, and test doubles are interchangeable. Retry policy
//! belongs to implementations, not to the engine.

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

/// A lazy stream of incrementally produced text fragments.
///
/// Fragment sizes are whatever the provider sends; the generator's buffering
/// layer reshapes them into fixed-size chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Per-call model parameters.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
}

impl ModelOptions {
    /// Creates options for the given model with the given temperature.
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: None,
        }
    }
}

/// A language model that can stream a response or complete a short prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Starts a streaming generation for the prompt.
    ///
    /// The returned stream yields text fragments as the model produces them;
    /// an `Err` item means the generation failed mid-stream.
    async fn stream(&self, prompt: &str, options: &ModelOptions) -> Result<TextStream>;

    /// Runs a non-streaming completion, for lightweight auxiliary calls
    /// such as topic labeling.
    async fn complete(&self, prompt: &str, options: &ModelOptions) -> Result<String>;
}

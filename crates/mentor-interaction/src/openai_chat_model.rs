//! OpenAiChatModel - direct REST implementation of the language-model seam.
//!
//! Calls an OpenAI-compatible Chat Completions API. `complete` is a plain
//! request/response round trip; `stream` enables SSE and forwards delta
//! fragments as they arrive. The retry budget covers request establishment
//! only — a stream that breaks mid-flight surfaces the error to the caller.

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use mentor_core::llm::{LanguageModel, ModelOptions, TextStream};

use crate::config::ApiConfig;
use crate::error::{backoff_delay, ApiError};
use crate::sse::SseLineBuffer;

/// Language-model client for OpenAI-compatible HTTP APIs.
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    config: ApiConfig,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// One SSE payload: `choices[0].delta.content` carries the fragment.
#[derive(Deserialize)]
struct StreamChunk {
    choices: Option<Vec<StreamChoice>>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl OpenAiChatModel {
    /// Creates a client with the provided configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Creates a client from environment variables.
    pub fn try_from_env() -> mentor_core::Result<Self> {
        Ok(Self::new(ApiConfig::from_env()?))
    }

    fn build_body(&self, prompt: &str, options: &ModelOptions, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: options.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: stream.then_some(true),
        }
    }

    /// Sends the request, retrying retryable failures up to the budget.
    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> std::result::Result<reqwest::Response, ApiError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut attempt = 0;
        loop {
            let err = match self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    ApiError::from_status(status, text)
                }
                Err(e) => ApiError::from(e),
            };

            if attempt >= self.config.max_retries || !err.is_retryable() {
                return Err(err);
            }
            debug!(attempt, error = %err, "retrying chat completion request");
            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn stream(&self, prompt: &str, options: &ModelOptions) -> Result<TextStream> {
        let body = self.build_body(prompt, options, true);
        let response = self.send_request(&body).await?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(forward_sse(response, tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn complete(&self, prompt: &str, options: &ModelOptions) -> Result<String> {
        let body = self.build_body(prompt, options, false);
        let response = self.send_request(&body).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ApiError::Parse("response contained no content".to_string()))?;
        Ok(content)
    }
}

/// Reads the SSE body and forwards delta fragments over the channel.
///
/// Ends on the `[DONE]` sentinel or when the receiver is dropped; a broken
/// transport is forwarded as an `Err` item so the consumer sees the failure
/// rather than a silent end-of-stream.
async fn forward_sse(response: reqwest::Response, tx: mpsc::Sender<Result<String>>) {
    let mut bytes = response.bytes_stream();
    let mut lines = SseLineBuffer::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(Err(ApiError::Network(e.to_string()).into()))
                    .await;
                return;
            }
        };

        for line in lines.push(&chunk) {
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload == "[DONE]" {
                return;
            }
            // Keep-alives and unknown event shapes are skipped.
            let parsed: StreamChunk = match serde_json::from_str(payload) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let content = parsed
                .choices
                .and_then(|c| c.into_iter().next())
                .and_then(|c| c.delta.content);
            if let Some(content) = content {
                if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                    return;
                }
            }
        }
    }
    // Provider closed the stream without [DONE]; treat as exhaustion.
}

//! OpenAiEmbeddings - REST implementation of the embedding seam.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mentor_core::memory::EmbeddingProvider;

use crate::config::ApiConfig;
use crate::error::{backoff_delay, ApiError};

/// Embedding client for OpenAI-compatible HTTP APIs.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    config: ApiConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
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

    async fn send_request(
        &self,
        body: &EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ApiError> {
        let url = format!("{}/embeddings", self.config.base_url);
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
                Ok(response) if response.status().is_success() => {
                    return response
                        .json()
                        .await
                        .map_err(|e| ApiError::Parse(e.to_string()));
                }
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
            debug!(attempt, error = %err, "retrying embedding request");
            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: self.config.embedding_model.clone(),
            input: text.to_string(),
        };
        let response = self.send_request(&body).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ApiError::Parse("response contained no embedding".to_string()))?;
        Ok(embedding)
    }
}

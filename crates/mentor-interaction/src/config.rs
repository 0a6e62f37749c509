//! API client configuration.
//!
//! Reads connection settings from environment variables. Works against any
//! OpenAI-compatible endpoint (the base URL is overridable for proxies and
//! self-hosted gateways).

use mentor_core::error::{MentorError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Connection settings for the chat and embedding clients.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Default chat model identifier.
    pub chat_model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// How many times a failed request is retried before giving up.
    /// Retry policy lives here, in the collaborator, not in the engine.
    pub max_retries: u32,
}

impl ApiConfig {
    /// Creates a config with the given key and defaults for the rest.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Priority: `MENTOR_API_KEY`, then `OPENAI_API_KEY`. Optional
    /// overrides: `MENTOR_BASE_URL`, `MENTOR_CHAT_MODEL`,
    /// `MENTOR_EMBEDDING_MODEL`, `MENTOR_MAX_RETRIES`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("MENTOR_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                MentorError::config(
                    "MENTOR_API_KEY or OPENAI_API_KEY not found in environment variables",
                )
            })?;

        let base_url = std::env::var("MENTOR_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let chat_model =
            std::env::var("MENTOR_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let embedding_model = std::env::var("MENTOR_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        let max_retries = std::env::var("MENTOR_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Ok(Self {
            api_key,
            base_url,
            chat_model,
            embedding_model,
            max_retries,
        })
    }

    /// Overrides the base URL after construction.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

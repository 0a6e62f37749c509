//! HTTP collaborators for the Mentor engine.
//!
//! Implements the core's language-model and embedding seams against
//! OpenAI-compatible APIs, including SSE streaming and a bounded retry
//! policy. The engine itself never retries; this crate owns that concern.

pub mod config;
pub mod error;
pub mod openai_chat_model;
pub mod openai_embeddings;
mod sse;

pub use config::ApiConfig;
pub use error::ApiError;
pub use openai_chat_model::OpenAiChatModel;
pub use openai_embeddings::OpenAiEmbeddings;

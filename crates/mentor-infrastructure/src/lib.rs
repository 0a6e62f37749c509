//! Storage backends for the Mentor engine.

pub mod async_dir_conversation_store;

pub use async_dir_conversation_store::AsyncDirConversationStore;

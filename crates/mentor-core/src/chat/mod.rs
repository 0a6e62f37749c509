//! Chat generation types and the streaming generator.

pub mod generator;
pub mod message;
pub mod options;

pub use generator::{DEFAULT_BUFFER_SIZE, ResponseGenerator, ResponseStream};
pub use message::{MemoryTurn, MessageRole};
pub use options::{
    AnswerChunk, ChunkMetadata, GenerateOptions, GenerationEvent, GenerationOutcome,
};

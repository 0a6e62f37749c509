//! Session orchestration: factory, registry, and the per-conversation
//! chat session.

pub mod factory;
pub mod registry;
pub mod session;

pub use factory::SessionFactory;
pub use registry::SessionRegistry;
pub use session::{AnswerEvent, AnswerStream, ChatSession};

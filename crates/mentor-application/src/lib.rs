//! Application layer for the Mentor engine.
//!
//! Composes the core's memory and generation machinery with the HTTP
//! collaborators and storage backends into a conversation service.

pub mod chat;
pub mod service;

pub use chat::{AnswerEvent, AnswerStream, ChatSession, SessionFactory, SessionRegistry};
pub use service::ChatService;

//! Conversation message types.
//!
//! This module contains types for representing role-tagged fragments of
//! conversation memory, including roles and the `"Role: text"` wire form
//! used by the similarity index.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// Message from the user.
    Human,
    /// Message from the AI assistant.
    Assistant,
    /// System-generated message.
    System,
}

impl MessageRole {
    /// The textual label used when a message is stored in the index.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::Human => "Human",
            MessageRole::Assistant => "AI",
            MessageRole::System => "System",
        }
    }

    /// Resolves a stored label back to its role, if it matches one.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Human" => Some(MessageRole::Human),
            "AI" => Some(MessageRole::Assistant),
            "System" => Some(MessageRole::System),
            _ => None,
        }
    }
}

/// A single turn of conversation memory, optionally tagged with a role.
///
/// Fragments retrieved from the similarity index carry their role as a
/// leading `"Role:"` prefix; `parse` recovers the typed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTurn {
    /// The role of the turn's author, when one was recorded.
    pub role: Option<MessageRole>,
    /// The content of the turn, stripped of the role prefix.
    pub content: String,
}

impl MemoryTurn {
    /// Creates a turn tagged with a role.
    pub fn tagged(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            content: content.into(),
        }
    }

    /// Parses a stored fragment, splitting off a leading `"Role:"` prefix
    /// when it matches a known role label.
    pub fn parse(fragment: &str) -> Self {
        if let Some((prefix, rest)) = fragment.split_once(':') {
            if let Some(role) = MessageRole::from_label(prefix.trim()) {
                return Self {
                    role: Some(role),
                    content: rest.trim().to_string(),
                };
            }
        }
        Self {
            role: None,
            content: fragment.trim().to_string(),
        }
    }

    /// Renders the turn in the `"Role: text"` form stored by the index.
    pub fn to_fragment(&self) -> String {
        match self.role {
            Some(role) => format!("{}: {}", role.label(), self.content),
            None => self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_fragment() {
        let turn = MemoryTurn::parse("Human: What is a B-tree?");
        assert_eq!(turn.role, Some(MessageRole::Human));
        assert_eq!(turn.content, "What is a B-tree?");
    }

    #[test]
    fn test_parse_untagged_fragment() {
        let turn = MemoryTurn::parse("  plain context text  ");
        assert_eq!(turn.role, None);
        assert_eq!(turn.content, "plain context text");
    }

    #[test]
    fn test_parse_unknown_prefix_is_untagged() {
        // A colon alone does not make a role prefix
        let turn = MemoryTurn::parse("Note: remember this");
        assert_eq!(turn.role, None);
        assert_eq!(turn.content, "Note: remember this");
    }

    #[test]
    fn test_fragment_round_trip() {
        let turn = MemoryTurn::tagged(MessageRole::Assistant, "A hash table stores key-value pairs.");
        let parsed = MemoryTurn::parse(&turn.to_fragment());
        assert_eq!(parsed, turn);
    }
}

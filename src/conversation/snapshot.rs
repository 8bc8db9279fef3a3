//! Portable save/load form of a conversation.

use serde::{Deserialize, Serialize};

use super::Conversation;
use crate::error::ColloquyError;
use crate::types::{ChatMessage, Role};

/// Persisted form of a [`Conversation`].
///
/// Serializes to exactly two fields, `prompt` and `history`. Unknown fields are
/// ignored on load so newer writers stay readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConversationSnapshot {
    #[serde(default)]
    pub prompt: Option<String>,
    pub history: Vec<ChatMessage>,
}

impl ConversationSnapshot {
    /// Encode as compact JSON.
    pub fn to_json(&self) -> Result<String, ColloquyError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON, mapping any shape mismatch to [`ColloquyError::InvalidFormat`].
    pub fn from_json(json: &str) -> Result<Self, ColloquyError> {
        serde_json::from_str(json).map_err(|e| ColloquyError::InvalidFormat(e.to_string()))
    }
}

impl Conversation {
    /// Capture the prompt and the full history, system entry included.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            prompt: self.system_prompt.clone(),
            history: self.messages.clone(),
        }
    }

    /// Replace this conversation with the contents of a snapshot.
    ///
    /// The system message is rebuilt from `prompt`; system entries inside
    /// `history` are dropped.
    pub fn restore(&mut self, snapshot: ConversationSnapshot) {
        self.messages.clear();
        self.set_system_prompt(snapshot.prompt.unwrap_or_default());
        self.messages.extend(
            snapshot
                .history
                .into_iter()
                .filter(|m| m.role != Role::System),
        );
    }

    /// Parse a JSON snapshot and restore it. On error nothing is modified.
    pub fn load_json(&mut self, json: &str) -> Result<(), ColloquyError> {
        let snapshot = ConversationSnapshot::from_json(json)?;
        self.restore(snapshot);
        Ok(())
    }
}

//! Message types for conversation history.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ColloquyError;

/// A role-tagged message in a conversation.
///
/// Messages carry no identifier; their position in the history is their identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Build a message from loosely typed parts, rejecting empty values.
    pub fn parse(role: &str, content: &str) -> Result<Self, ColloquyError> {
        if role.trim().is_empty() || content.is_empty() {
            return Err(ColloquyError::InvalidArgument(
                "role and content cannot be empty".into(),
            ));
        }
        let role = Role::from_str(role.trim())
            .map_err(|_| ColloquyError::InvalidArgument(format!("unknown role '{role}'")))?;
        Ok(Self::new(role, content))
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Speaker label used in flattened transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

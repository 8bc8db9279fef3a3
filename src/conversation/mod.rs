//! Conversation message history management.
//!
//! A [`Conversation`] is an ordered log of [`ChatMessage`]s with one extra rule:
//! the system prompt, when set, is a single message pinned at index 0.

pub mod snapshot;
pub mod transcript;

pub use snapshot::ConversationSnapshot;

use tracing::debug;

use crate::error::ColloquyError;
use crate::types::{ChatMessage, Role};

/// Manages a conversation's message history and its system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    system_prompt: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system prompt already in place.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.set_system_prompt(prompt);
        conversation
    }

    /// Append a message from loosely typed parts.
    ///
    /// Fails with [`ColloquyError::InvalidArgument`] when either part is empty.
    pub fn append(&mut self, role: &str, content: &str) -> Result<(), ColloquyError> {
        let message = ChatMessage::parse(role, content)?;
        self.append_message(message)
    }

    /// Append a typed message to the end of the history.
    ///
    /// A system-role message replaces the pinned system prompt instead of
    /// landing at the tail, so the history never holds two of them.
    pub fn append_message(&mut self, message: ChatMessage) -> Result<(), ColloquyError> {
        if message.content.is_empty() {
            return Err(ColloquyError::InvalidArgument(
                "message content cannot be empty".into(),
            ));
        }
        if message.role == Role::System {
            debug!("system message appended; replacing the pinned system prompt");
            self.set_system_prompt(message.content);
            return Ok(());
        }
        self.messages.push(message);
        Ok(())
    }

    pub(crate) fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub(crate) fn add_assistant_message(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    /// Replace the system prompt. An empty prompt clears it.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.messages.retain(|m| m.role != Role::System);

        if prompt.is_empty() {
            self.system_prompt = None;
        } else {
            self.messages.insert(0, ChatMessage::system(prompt.clone()));
            self.system_prompt = Some(prompt);
        }
    }

    /// Remove the system prompt without touching the rest of the history.
    pub fn clear_system_prompt(&mut self) {
        self.set_system_prompt(String::new());
    }

    /// The active system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Wipe the history. The system prompt survives and is re-pinned.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Some(prompt) = &self.system_prompt {
            self.messages.push(ChatMessage::system(prompt.clone()));
        }
    }

    /// Remove the most recent assistant message and the user message before it.
    ///
    /// Returns `false` and leaves the history untouched when no such pair exists.
    pub fn revert_last_exchange(&mut self) -> bool {
        let Some(assistant_idx) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return false;
        };
        let Some(user_idx) = self.messages[..assistant_idx]
            .iter()
            .rposition(|m| m.role == Role::User)
        else {
            return false;
        };

        self.messages.remove(assistant_idx);
        self.messages.remove(user_idx);
        true
    }

    /// Remove up to `count` messages from the tail and return how many went.
    ///
    /// Reaching back into the pinned system message also clears the prompt.
    pub fn revert_last(&mut self, count: usize) -> usize {
        let removed = count.min(self.messages.len());
        if removed == 0 {
            return 0;
        }
        self.messages.truncate(self.messages.len() - removed);

        let still_pinned = self
            .messages
            .first()
            .is_some_and(|m| m.role == Role::System);
        if self.system_prompt.is_some() && !still_pinned {
            self.system_prompt = None;
        }

        debug!(
            removed,
            remaining = self.messages.len(),
            "reverted messages from history"
        );
        removed
    }

    /// Flatten the non-system history into `"<Role>: <content>"` lines.
    pub fn build_context_text(&self) -> String {
        let mut text = String::new();
        for message in self.messages.iter().filter(|m| m.role != Role::System) {
            text.push_str(message.role.label());
            text.push_str(": ");
            text.push_str(&message.content);
            text.push('\n');
        }
        text.truncate(text.trim_end().len());
        text
    }

    /// Get all messages, system message first when present.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Get the last N messages.
    pub fn last_n(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Number of messages, including the system message.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

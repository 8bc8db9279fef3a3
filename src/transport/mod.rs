//! Transport capability: the component that actually talks to the model service.
//!
//! The SDK never builds HTTP requests itself. Applications plug in a
//! [`ChatTransport`] (usually produced by a [`TransportFactory`] owned by the
//! [`SdkContext`](crate::context::SdkContext)).

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ColloquyError;
use crate::types::{ChatMessage, StructuredResult, TextStreamDelta};

/// Stream of deltas produced by [`ChatTransport::stream_text`].
pub type TextDeltaStream = BoxStream<'static, Result<TextStreamDelta, ColloquyError>>;

/// Result of a plain text completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCompletion {
    pub success: bool,
    pub text: String,
}

impl TextCompletion {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            text: String::new(),
        }
    }

    /// The text, if the call succeeded and produced any.
    pub fn into_text(self) -> Option<String> {
        (self.success && !self.text.is_empty()).then_some(self.text)
    }
}

/// Core trait implemented by chat backends.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Model this transport sends requests to.
    fn model_name(&self) -> &str;

    /// Complete a conversation given as role-tagged messages.
    async fn complete_text(&self, messages: &[ChatMessage])
        -> Result<TextCompletion, ColloquyError>;

    /// Produce a schema-shaped object from a single flattened prompt.
    ///
    /// `system_prompt` is an auxiliary instruction, not part of the prompt text.
    async fn complete_structured(
        &self,
        schema_id: &str,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<Option<StructuredResult>, ColloquyError>;

    /// Produce a schema-shaped object from a full message history.
    async fn complete_structured_messages(
        &self,
        schema_id: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<StructuredResult>, ColloquyError>;

    /// Stream text deltas, ending with one `Done` delta carrying the full text.
    async fn stream_text(&self, messages: &[ChatMessage])
        -> Result<TextDeltaStream, ColloquyError>;
}

/// Builds transports for a model name.
pub trait TransportFactory: Send + Sync {
    fn create_chat_transport(
        &self,
        model: Option<&str>,
    ) -> Result<Arc<dyn ChatTransport>, ColloquyError>;
}

/// A factory that hands out one shared transport regardless of model.
#[derive(Clone)]
pub struct SharedTransportFactory {
    transport: Arc<dyn ChatTransport>,
}

impl SharedTransportFactory {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

impl std::fmt::Debug for SharedTransportFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTransportFactory")
            .field("model", &self.transport.model_name())
            .finish()
    }
}

impl TransportFactory for SharedTransportFactory {
    fn create_chat_transport(
        &self,
        model: Option<&str>,
    ) -> Result<Arc<dyn ChatTransport>, ColloquyError> {
        if let Some(model) = model {
            if model != self.transport.model_name() {
                tracing::debug!(
                    requested = model,
                    serving = self.transport.model_name(),
                    "shared transport ignores model override"
                );
            }
        }
        Ok(self.transport.clone())
    }
}

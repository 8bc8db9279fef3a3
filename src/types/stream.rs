//! Streaming types.

use serde::{Deserialize, Serialize};

/// A delta emitted by a transport while streaming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextStreamDelta {
    /// The incremental chunk, the full final text on `Done`, or the reason on `Error`.
    pub text: String,
    /// Event type.
    pub event_type: StreamEventType,
}

impl TextStreamDelta {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            event_type: StreamEventType::TextDelta,
        }
    }

    pub fn done(full_text: impl Into<String>) -> Self {
        Self {
            text: full_text.into(),
            event_type: StreamEventType::Done,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            text: reason.into(),
            event_type: StreamEventType::Error,
        }
    }
}

/// Type of stream event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    /// Incremental text content.
    TextDelta,
    /// Stream finished; carries the complete response.
    Done,
    /// The transport gave up mid-stream.
    Error,
}

//! Error types for Colloquy.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all Colloquy operations.
#[derive(Error, Debug)]
pub enum ColloquyError {
    /// The SDK or the client has not been wired to a transport yet.
    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The owning host object has been torn down.
    #[error("Inactive caller: {0}")]
    InactiveCaller(String),

    /// The remote call failed or returned an unusable payload.
    #[error("Transport failure: {message}")]
    TransportFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A conversation snapshot could not be parsed.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Operation canceled")]
    Canceled,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ColloquyError {
    /// Create a transport failure without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport failure wrapping the error that caused it.
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TransportFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotReady(_) => ErrorCategory::NotReady,
            Self::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            Self::InactiveCaller(_) => ErrorCategory::InactiveCaller,
            Self::TransportFailure { .. } => ErrorCategory::Transport,
            Self::InvalidFormat(_) | Self::Serialization(_) => ErrorCategory::Format,
            Self::Canceled => ErrorCategory::Canceled,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether repeating the same call could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Timeout | ErrorCategory::NotReady
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::NotReady => RecoverySuggestion::WaitForReady,
            ErrorCategory::Transport => RecoverySuggestion::RetryTurn,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::InvalidArgument | ErrorCategory::Format => {
                RecoverySuggestion::FixInput
            }
            ErrorCategory::InactiveCaller | ErrorCategory::Canceled => RecoverySuggestion::None,
            ErrorCategory::Io => RecoverySuggestion::CheckConfiguration,
        }
    }
}

/// Convenience alias.
pub type Result<T, E = ColloquyError> = std::result::Result<T, E>;

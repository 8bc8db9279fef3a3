//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotReady,
    InvalidArgument,
    InactiveCaller,
    Transport,
    Format,
    Canceled,
    Timeout,
    Configuration,
    Authentication,
    Io,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Initialize the SDK or call `setup` before talking.
    WaitForReady,
    /// The conversation is intact; the turn can be sent again.
    RetryTurn,
    IncreaseTimeout,
    CheckCredentials,
    CheckConfiguration,
    FixInput,
    None,
}

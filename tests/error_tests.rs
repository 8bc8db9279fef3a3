//! Tests for the error system.

use std::error::Error as _;

use colloquy::error::unified::*;
use colloquy::error::*;

#[test]
fn error_display_is_stable() {
    assert_eq!(
        ColloquyError::NotReady("no transport".into()).to_string(),
        "Not ready: no transport"
    );
    assert_eq!(ColloquyError::Canceled.to_string(), "Operation canceled");
    assert_eq!(ColloquyError::Timeout(250).to_string(), "Timeout after 250ms");
    assert_eq!(
        ColloquyError::transport("upstream 500").to_string(),
        "Transport failure: upstream 500"
    );
}

#[test]
fn transport_failure_keeps_its_source() {
    let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
    let err = ColloquyError::transport_with_source("request failed", cause);
    assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("reset"));
    assert!(ColloquyError::transport("bare").source().is_none());
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: ColloquyError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
        expected_recovery: RecoverySuggestion,
    }

    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: ColloquyError::NotReady("setup".into()),
            expected_category: ErrorCategory::NotReady,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::WaitForReady,
        },
        Case {
            error: ColloquyError::InvalidArgument("empty".into()),
            expected_category: ErrorCategory::InvalidArgument,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::FixInput,
        },
        Case {
            error: ColloquyError::InactiveCaller("gone".into()),
            expected_category: ErrorCategory::InactiveCaller,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::None,
        },
        Case {
            error: ColloquyError::transport("boom"),
            expected_category: ErrorCategory::Transport,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryTurn,
        },
        Case {
            error: ColloquyError::InvalidFormat("bad json".into()),
            expected_category: ErrorCategory::Format,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::FixInput,
        },
        Case {
            error: ColloquyError::Serialization(serde_error),
            expected_category: ErrorCategory::Format,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::FixInput,
        },
        Case {
            error: ColloquyError::Canceled,
            expected_category: ErrorCategory::Canceled,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::None,
        },
        Case {
            error: ColloquyError::Timeout(5000),
            expected_category: ErrorCategory::Timeout,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::IncreaseTimeout,
        },
        Case {
            error: ColloquyError::Configuration("bad-config".into()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: ColloquyError::Authentication("bad-token".into()),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: ColloquyError::Io(io_error),
            expected_category: ErrorCategory::Io,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category);
        assert_eq!(case.error.is_retryable(), case.expected_retryable);
        assert_eq!(case.error.recovery_suggestion(), case.expected_recovery);
    }
}

//! Structured (schema-shaped) model output.

/// Open string-keyed mapping returned by a structured completion.
///
/// Scanned by the normalizer, never mutated by the SDK.
pub type StructuredResult = serde_json::Map<String, serde_json::Value>;

/// Render a structured value the way it is recorded in history: strings verbatim,
/// `null` as empty, everything else as compact JSON.
pub fn stringify_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_not_quoted() {
        assert_eq!(stringify_value(&json!("hello")), "hello");
    }

    #[test]
    fn null_is_empty() {
        assert_eq!(stringify_value(&json!(null)), "");
    }

    #[test]
    fn composites_are_compact_json() {
        assert_eq!(stringify_value(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
        assert_eq!(stringify_value(&json!(42)), "42");
    }
}

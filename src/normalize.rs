//! Structured-response normalization: pick the "speakable" line out of a
//! schema-shaped model response so it can be recorded as assistant history.

use serde::Serialize;
use tracing::debug;

use crate::types::{stringify_value, StructuredResult};

/// Keys conventionally used by character schemas for in-character speech.
pub const PRIORITY_KEYS: [&str; 4] = ["talk", "Talk", "dialogue", "Dialogue"];

/// Generic chat-API field names tried when no priority key matches.
pub const FALLBACK_KEYS: [&str; 6] = ["response", "message", "content", "text", "speech", "say"];

/// Where an extracted utterance came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceSource {
    Priority(&'static str),
    Fallback(&'static str),
    /// No usable field; the text is a diagnostic rendering of the payload.
    Diagnostic,
}

/// An utterance extracted from a structured result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub source: UtteranceSource,
}

/// Extract the utterance, tagged with the key it came from.
///
/// `schema_id` only labels the diagnostic fallback; it never changes which key wins.
pub fn normalize(result: &StructuredResult, schema_id: &str) -> Utterance {
    if let Some((key, text)) = probe(result, &PRIORITY_KEYS) {
        debug!(schema = schema_id, field = key, "using priority field as utterance");
        return Utterance {
            text,
            source: UtteranceSource::Priority(key),
        };
    }
    if let Some((key, text)) = probe(result, &FALLBACK_KEYS) {
        debug!(schema = schema_id, field = key, "using fallback field as utterance");
        return Utterance {
            text,
            source: UtteranceSource::Fallback(key),
        };
    }

    debug!(schema = schema_id, "no utterance field found; recording raw payload");
    let payload = serde_json::Value::Object(result.clone()).to_string();
    Utterance {
        text: format!("[Structured Response ({schema_id}): {payload}]"),
        source: UtteranceSource::Diagnostic,
    }
}

/// Extract the utterance text. Never empty.
pub fn extract_utterance(result: &StructuredResult, schema_id: &str) -> String {
    normalize(result, schema_id).text
}

/// Extract the utterance from any serializable value.
///
/// Values that do not serialize to a JSON object get the diagnostic form.
pub fn extract_utterance_from<T: Serialize>(value: &T, schema_id: &str) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => extract_utterance(&map, schema_id),
        Ok(other) => format!("[Structured Response ({schema_id}): {other}]"),
        Err(e) => format!("[Structured Response ({schema_id}): unserializable: {e}]"),
    }
}

fn probe(result: &StructuredResult, keys: &[&'static str]) -> Option<(&'static str, String)> {
    keys.iter().find_map(|key| {
        let text = stringify_value(result.get(*key)?);
        (!text.trim().is_empty()).then_some((*key, text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> StructuredResult {
        match value {
            serde_json::Value::Object(m) => m,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    #[test]
    fn priority_beats_fallback() {
        let r = map(json!({"response": "bye", "talk": "hi"}));
        assert_eq!(
            normalize(&r, "npc"),
            Utterance {
                text: "hi".into(),
                source: UtteranceSource::Priority("talk"),
            }
        );
    }

    #[test]
    fn priority_order_is_fixed() {
        let r = map(json!({"Dialogue": "third", "Talk": "second"}));
        assert_eq!(extract_utterance(&r, "npc"), "second");
    }

    #[test]
    fn blank_values_are_skipped() {
        let r = map(json!({"talk": "   ", "dialogue": null, "say": "hey"}));
        assert_eq!(
            normalize(&r, "npc").source,
            UtteranceSource::Fallback("say")
        );
    }

    #[test]
    fn keys_are_case_sensitive() {
        let r = map(json!({"TALK": "loud"}));
        assert_eq!(normalize(&r, "npc").source, UtteranceSource::Diagnostic);
    }

    #[test]
    fn non_string_values_are_stringified() {
        let r = map(json!({"message": {"line": "hello"}}));
        assert_eq!(extract_utterance(&r, "npc"), r#"{"line":"hello"}"#);
    }

    #[test]
    fn diagnostic_embeds_schema_and_compact_payload() {
        let r = map(json!({"mood": "angry", "hp": 3}));
        let text = extract_utterance(&r, "guard_reply");
        assert!(text.contains("guard_reply"));
        assert!(text.contains(r#""mood":"angry""#));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn empty_payload_still_yields_text() {
        let text = extract_utterance(&StructuredResult::new(), "empty");
        assert!(!text.is_empty());
        assert!(text.contains("empty"));
    }

    #[test]
    fn typed_values_are_normalized() {
        #[derive(Serialize)]
        struct Reply {
            talk: String,
            emotion: String,
        }
        let reply = Reply {
            talk: "Greetings.".into(),
            emotion: "calm".into(),
        };
        assert_eq!(extract_utterance_from(&reply, "reply"), "Greetings.");
        assert!(extract_utterance_from(&vec![1, 2], "list").contains("[1,2]"));
    }
}

//! Human-readable rendering of a conversation for debugging.

use std::fmt::Write;

use crate::types::ChatMessage;

/// Render messages as a titled, numbered transcript.
pub fn render_transcript(title: &str, messages: &[ChatMessage]) -> String {
    let header = format!("==== {title} ({} messages) ====", messages.len());
    let mut out = String::new();
    let _ = writeln!(out, "{header}");

    if messages.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for (idx, message) in messages.iter().enumerate() {
        let mut lines = message.content.lines();
        let first = lines.next().unwrap_or_default();
        let _ = writeln!(out, "[{idx}] {}: {first}", message.role.label());
        for line in lines {
            let _ = writeln!(out, "      {line}");
        }
    }

    out.push_str(&"=".repeat(header.chars().count()));
    out
}

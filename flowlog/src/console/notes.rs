//! Removal of embedded console annotations from log lines.

use crate::core::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marks the start of an embedded annotation.
pub const PREAMBLE: &str = "\u{1b}[8mha:";

/// Marks the end of an embedded annotation.
pub const POSTAMBLE: &str = "\u{1b}[0m";

/// One annotation removed from a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Character offset in the cleaned message where the annotation applied.
    pub position: usize,
    /// The opaque annotation payload.
    pub note: String,
}

/// A log line with annotations split out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    /// Plain message text.
    pub message: String,
    /// Removed annotations; empty unless preservation is on.
    pub annotations: Vec<Annotation>,
}

impl ParsedLine {
    /// Writes `message` and, when present, `annotations` into a document.
    pub fn apply_to(self, document: &mut Document) {
        document.insert("message".to_string(), Value::String(self.message));
        if !self.annotations.is_empty() {
            let annotations = serde_json::to_value(self.annotations).unwrap_or(Value::Null);
            document.insert("annotations".to_string(), annotations);
        }
    }
}

/// Strips console annotations from raw lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNoteFilter {
    preserve_annotations: bool,
}

impl ConsoleNoteFilter {
    /// Creates a filter; `preserve_annotations` keeps the removed payloads.
    #[must_use]
    pub fn new(preserve_annotations: bool) -> Self {
        Self {
            preserve_annotations,
        }
    }

    /// Returns whether annotations are kept.
    #[must_use]
    pub fn preserves_annotations(&self) -> bool {
        self.preserve_annotations
    }

    /// Parses one raw line.
    ///
    /// Trailing line terminators are dropped. A preamble without a matching
    /// postamble ends the message at the preamble.
    #[must_use]
    pub fn parse(&self, raw: &[u8]) -> ParsedLine {
        let mut end = raw.len();
        while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        let line = String::from_utf8_lossy(&raw[..end]);

        if !line.contains(PREAMBLE) {
            return ParsedLine {
                message: line.into_owned(),
                annotations: Vec::new(),
            };
        }

        let mut message = String::with_capacity(line.len());
        let mut annotations = Vec::new();
        let mut rest: &str = &line;
        loop {
            let Some(start) = rest.find(PREAMBLE) else {
                message.push_str(rest);
                break;
            };
            message.push_str(&rest[..start]);

            let after_preamble = &rest[start + PREAMBLE.len()..];
            let Some(stop) = after_preamble.find(POSTAMBLE) else {
                break;
            };
            if self.preserve_annotations {
                annotations.push(Annotation {
                    position: message.chars().count(),
                    note: after_preamble[..stop].to_string(),
                });
            }
            rest = &after_preamble[stop + POSTAMBLE.len()..];
        }

        ParsedLine {
            message,
            annotations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn annotated(note: &str) -> String {
        format!("{PREAMBLE}{note}{POSTAMBLE}")
    }

    #[test]
    fn test_plain_line() {
        let parsed = ConsoleNoteFilter::new(true).parse(b"hello world\r\n");
        assert_eq!(parsed.message, "hello world");
        assert!(parsed.annotations.is_empty());
    }

    #[test]
    fn test_annotations_discarded() {
        let raw = format!("{}[Pipeline] sh{}", annotated("H4sIAAAA"), annotated("xyz"));
        let parsed = ConsoleNoteFilter::new(false).parse(raw.as_bytes());

        assert_eq!(parsed.message, "[Pipeline] sh");
        assert!(!parsed.message.contains('\u{1b}'));
        assert!(parsed.annotations.is_empty());
    }

    #[test]
    fn test_annotations_preserved() {
        let raw = format!("Running {}on agent{} done\n", annotated("AAA="), annotated("BBB="));
        let parsed = ConsoleNoteFilter::new(true).parse(raw.as_bytes());

        assert_eq!(parsed.message, "Running on agent done");
        assert_eq!(
            parsed.annotations,
            vec![
                Annotation {
                    position: 8,
                    note: "AAA=".to_string()
                },
                Annotation {
                    position: 16,
                    note: "BBB=".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_same_text_either_way() {
        let raw = format!("a{}b", annotated("n"));
        let kept = ConsoleNoteFilter::new(true).parse(raw.as_bytes());
        let dropped = ConsoleNoteFilter::new(false).parse(raw.as_bytes());
        assert_eq!(kept.message, dropped.message);
        assert_eq!(kept.annotations.len(), 1);
    }

    #[test]
    fn test_unterminated_annotation() {
        let raw = format!("before {PREAMBLE}dangling payload");
        let parsed = ConsoleNoteFilter::new(true).parse(raw.as_bytes());
        assert_eq!(parsed.message, "before ");
        assert!(parsed.annotations.is_empty());
    }

    #[test]
    fn test_position_counts_characters() {
        let raw = format!("é{}x", annotated("n"));
        let parsed = ConsoleNoteFilter::new(true).parse(raw.as_bytes());
        assert_eq!(parsed.annotations[0].position, 1);
    }

    #[test]
    fn test_apply_to_document() {
        let raw = format!("x{}", annotated("n"));
        let mut doc = Document::new();
        ConsoleNoteFilter::new(true)
            .parse(raw.as_bytes())
            .apply_to(&mut doc);
        assert_eq!(doc["message"], "x");
        assert_eq!(doc["annotations"], serde_json::json!([{"position": 1, "note": "n"}]));

        let mut doc = Document::new();
        ConsoleNoteFilter::new(false)
            .parse(raw.as_bytes())
            .apply_to(&mut doc);
        assert!(!doc.contains_key("annotations"));
    }
}

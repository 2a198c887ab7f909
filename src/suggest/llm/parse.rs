//! Salvaging `{tags, keywords}` out of free-form model output.
//!
//! This is a heuristic repair layer, not a parser with guarantees: it strips
//! code fences anywhere in the text and then looks for the first balanced
//! `{...}` that is valid JSON. Callers get `None` when nothing usable is
//! found and decide whether to ask the model again.

use super::error::SuggestError;
use crate::suggest::{dedup_in_order, Suggestions, MAX_KEYWORDS, MAX_TAGS};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json)?\n?").expect("fence pattern is valid"))
}

/// Remove every markdown fence marker, not just an outer wrapper.
pub(crate) fn strip_markdown_fences(text: &str) -> String {
    fence_pattern().replace_all(text, "").trim().to_string()
}

/// The `{...}` opening at byte `open`, up to its matching close.
///
/// Brackets inside string literals do not count. A `]` closing a `{` (or the
/// reverse) ends the candidate with `None`, as does running out of text.
/// All delimiters are ASCII, so byte offsets are always char boundaries.
fn balanced_object_at(text: &str, open: usize) -> Option<&str> {
    let mut closers = Vec::new();
    let mut bytes = text.bytes().enumerate().skip(open);
    while let Some((idx, byte)) = bytes.next() {
        match byte {
            b'"' => {
                // Skip to the closing quote, stepping over escapes.
                loop {
                    match bytes.next()? {
                        (_, b'\\') => {
                            bytes.next()?;
                        }
                        (_, b'"') => break,
                        _ => {}
                    }
                }
            }
            b'{' => closers.push(b'}'),
            b'[' => closers.push(b']'),
            b'}' | b']' => {
                if closers.pop() != Some(byte) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(&text[open..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced `{...}` in `text` that parses as a JSON object.
///
/// Braces in prose ahead of the payload (`use {title} here: {"tags": ...}`)
/// are skipped. If balanced candidates exist but none is valid JSON, the
/// first one is returned so the caller reports it as malformed.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let mut first_balanced = None;
    for (idx, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        let Some(candidate) = balanced_object_at(text, idx) else {
            continue;
        };
        if matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_))) {
            return Some(candidate);
        }
        first_balanced.get_or_insert(candidate);
    }
    first_balanced
}

/// String entries only, trimmed, blanks dropped.
fn string_entries(values: &[Value]) -> impl Iterator<Item = String> + '_ {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse an extracted object into capped, de-duplicated suggestions.
pub(crate) fn parse_suggestions(json: &str) -> Result<Suggestions, SuggestError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SuggestError::Parse(format!("Malformed JSON in AI response: {}", e)))?;

    let (Some(tags), Some(keywords)) = (
        value.get("tags").and_then(Value::as_array),
        value.get("keywords").and_then(Value::as_array),
    ) else {
        return Err(SuggestError::Parse(
            "Invalid response structure - tags or keywords not arrays".to_string(),
        ));
    };

    let mut tags = dedup_in_order(string_entries(tags));
    tags.truncate(MAX_TAGS);
    let keywords = string_entries(keywords).take(MAX_KEYWORDS).collect();

    Ok(Suggestions { tags, keywords })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_removes_json_wrapper() {
        let fenced = "```json\n{\"tags\": [\"a\"]}\n```";
        assert_eq!(strip_markdown_fences(fenced), "{\"tags\": [\"a\"]}");
    }

    #[test]
    fn test_strip_fences_removes_inner_markers() {
        let text = "Here you go:\n```\n{\"a\": 1}\n```\nDone";
        assert_eq!(strip_markdown_fences(text), "Here you go:\n{\"a\": 1}\nDone");
    }

    #[test]
    fn test_extract_plain_object() {
        let text = "Sure! {\"tags\": [\"x\"], \"keywords\": []} hope that helps";
        assert_eq!(
            extract_json_object(text),
            Some("{\"tags\": [\"x\"], \"keywords\": []}")
        );
    }

    #[test]
    fn test_extract_skips_prose_braces_before_payload() {
        let text = "I used {title} as a hint. {\"tags\": [\"x\"], \"keywords\": [\"y\"]}";
        assert_eq!(
            extract_json_object(text),
            Some("{\"tags\": [\"x\"], \"keywords\": [\"y\"]}")
        );
    }

    #[test]
    fn test_extract_ignores_braces_inside_strings() {
        let text = "{\"tags\": [\"a}b\"], \"keywords\": [\"{c\"]}";
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_handles_escaped_quotes_and_non_ascii() {
        let text = r#"Voilà: {"tags": ["caf\"é}", "naïve"], "keywords": []} fin"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"tags": ["caf\"é}", "naïve"], "keywords": []}"#)
        );
        assert_eq!(extract_json_object(r#"{"tags": ["a"}"#), None);
    }

    #[test]
    fn test_extract_returns_none_without_object() {
        assert_eq!(extract_json_object("no json in here at all"), None);
        assert_eq!(extract_json_object("{\"tags\": [\"cut off"), None);
    }

    #[test]
    fn test_extract_falls_back_to_first_balanced_candidate() {
        let text = "{tags: [a]} and {also: not json}";
        assert_eq!(extract_json_object(text), Some("{tags: [a]}"));
    }

    #[test]
    fn test_parse_truncates_and_dedups() {
        let tags: Vec<String> = (0..15).map(|i| format!("\"t{}\"", i % 14)).collect();
        let keywords: Vec<String> = (0..10).map(|i| format!("\"k{}\"", i)).collect();
        let json = format!(
            "{{\"tags\": [{}], \"keywords\": [{}]}}",
            tags.join(","),
            keywords.join(",")
        );
        let parsed = parse_suggestions(&json).unwrap();
        assert_eq!(parsed.tags.len(), MAX_TAGS);
        assert_eq!(parsed.tags[0], "t0");
        assert_eq!(parsed.tags[11], "t11");
        assert_eq!(parsed.keywords.len(), MAX_KEYWORDS);
        assert_eq!(parsed.keywords[7], "k7");
    }

    #[test]
    fn test_parse_drops_non_string_entries() {
        let parsed =
            parse_suggestions(r#"{"tags": ["a", 3, null, " b ", ""], "keywords": ["k"]}"#).unwrap();
        assert_eq!(parsed.tags, vec!["a", "b"]);
        assert_eq!(parsed.keywords, vec!["k"]);
    }

    #[test]
    fn test_parse_rejects_non_array_fields() {
        let err = parse_suggestions(r#"{"tags": "a, b", "keywords": []}"#).unwrap_err();
        assert!(matches!(err, SuggestError::Parse(msg) if msg.contains("Invalid response structure")));

        let err = parse_suggestions(r#"{"tags": []}"#).unwrap_err();
        assert!(matches!(err, SuggestError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse_suggestions("{tags: [a]}").unwrap_err();
        assert!(matches!(err, SuggestError::Parse(msg) if msg.starts_with("Malformed JSON")));
    }
}

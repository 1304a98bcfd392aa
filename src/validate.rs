//! Output validators for model responses.
//!
//! Nothing a model returns is trusted downstream until it has passed through
//! here: `match` is checked against a closed set, free text is truncated, and
//! `rewritten_suggestions` is normalized to a bounded list.

use crate::document::cap_chars;
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Closed set of analyze verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchVerdict {
    Yes,
    No,
    Partial,
}

impl MatchVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchVerdict::Yes => "yes",
            MatchVerdict::No => "no",
            MatchVerdict::Partial => "partial",
        }
    }
}

impl fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchVerdict {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" => Ok(MatchVerdict::Yes),
            "no" => Ok(MatchVerdict::No),
            "partial" => Ok(MatchVerdict::Partial),
            other => Err(ValidationError::InvalidMatch(other.to_string())),
        }
    }
}

/// Validated analyze fields for one row
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub verdict: MatchVerdict,
    pub if_yes_reason: String,
    pub suggestions: String,
}

/// Bounds applied to rewrite output
#[derive(Debug, Clone, Copy)]
pub struct RewriteBounds {
    pub max_items: usize,
    pub max_item_chars: usize,
}

/// Validate an analyze response: closed-set `match`, truncated free text
pub fn validate_verdict(object: &Map<String, Value>, max_field_chars: usize) -> Result<Verdict> {
    let raw_match = object.get("match").map(value_text).unwrap_or_default();
    let verdict = raw_match.parse::<MatchVerdict>()?;

    Ok(Verdict {
        verdict,
        if_yes_reason: bounded_field(object, "if_yes_reason", max_field_chars),
        suggestions: bounded_field(object, "suggestions", max_field_chars),
    })
}

/// Validate a rewrite response into a bounded list of suggestions.
///
/// A bare string is treated as a one-item list. Non-string list items are
/// kept as their JSON text. Line breaks inside an item become spaces, since
/// items are stored newline-joined.
pub fn validate_rewrite(object: &Map<String, Value>, bounds: RewriteBounds) -> Result<Vec<String>> {
    let items: Vec<String> = match object.get("rewritten_suggestions") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(values)) => values.iter().map(value_text).collect(),
        Some(other) => {
            return Err(ValidationError::InvalidRewrittenSuggestions(json_kind(other).to_string()).into())
        }
        None => {
            return Err(ValidationError::InvalidRewrittenSuggestions("nothing".to_string()).into())
        }
    };

    if items.len() > bounds.max_items {
        warn!(
            "Model returned {} rewritten suggestions, keeping {}",
            items.len(),
            bounds.max_items
        );
    }

    Ok(items
        .iter()
        .take(bounds.max_items)
        .map(|item| cap_chars(&single_line(item), bounds.max_item_chars))
        .collect())
}

fn single_line(item: &str) -> String {
    item.split(|c| c == '\n' || c == '\r')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn bounded_field(object: &Map<String, Value>, key: &str, max_chars: usize) -> String {
    let text = object.get(key).map(value_text).unwrap_or_default();
    if text.chars().count() > max_chars {
        warn!("Model field '{}' truncated to {} chars", key, max_chars);
    }
    cap_chars(&text, max_chars)
}

/// Strings as-is, null as empty, anything else as its JSON text
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    const BOUNDS: RewriteBounds = RewriteBounds {
        max_items: 10,
        max_item_chars: 2_000,
    };

    #[test]
    fn test_match_is_trimmed_and_lowercased() {
        let verdict = validate_verdict(
            &object(json!({"match": "  YES ", "if_yes_reason": "MFA documented", "suggestions": ""})),
            4_000,
        )
        .unwrap();
        assert_eq!(verdict.verdict, MatchVerdict::Yes);
        assert_eq!(verdict.if_yes_reason, "MFA documented");
        assert_eq!(verdict.suggestions, "");
    }

    #[test]
    fn test_unknown_match_is_rejected() {
        for bad in [json!("maybe"), json!(""), json!(true), json!(null), json!(["yes"])] {
            let err = validate_verdict(
                &object(json!({"match": bad, "if_yes_reason": "", "suggestions": ""})),
                4_000,
            )
            .unwrap_err();
            assert!(
                matches!(err, Error::Validation(ValidationError::InvalidMatch(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_free_text_truncated() {
        let long = "x".repeat(5_000);
        let verdict = validate_verdict(
            &object(json!({"match": "partial", "if_yes_reason": long, "suggestions": long})),
            4_000,
        )
        .unwrap();
        assert_eq!(verdict.if_yes_reason.chars().count(), 4_000);
        assert_eq!(verdict.suggestions.chars().count(), 4_000);
    }

    #[test]
    fn test_non_string_free_text_rendered_as_json() {
        let verdict = validate_verdict(
            &object(json!({"match": "no", "if_yes_reason": null, "suggestions": ["a", "b"]})),
            4_000,
        )
        .unwrap();
        assert_eq!(verdict.if_yes_reason, "");
        assert_eq!(verdict.suggestions, r#"["a","b"]"#);
    }

    #[test]
    fn test_verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_value(MatchVerdict::Partial).unwrap(), json!("partial"));
    }

    #[test]
    fn test_rewrite_string_becomes_single_item() {
        let items = validate_rewrite(
            &object(json!({"rewritten_suggestions": "Document MFA enforcement"})),
            BOUNDS,
        )
        .unwrap();
        assert_eq!(items, vec!["Document MFA enforcement"]);
    }

    #[test]
    fn test_rewrite_list_bounded() {
        let many: Vec<String> = (0..15).map(|i| format!("item {i} {}", "y".repeat(3_000))).collect();
        let items = validate_rewrite(&object(json!({"rewritten_suggestions": many})), BOUNDS).unwrap();
        assert_eq!(items.len(), 10);
        assert!(items.iter().all(|i| i.chars().count() == 2_000));
        assert!(items[9].starts_with("item 9 "));
    }

    #[test]
    fn test_rewrite_empty_list_is_valid() {
        let items = validate_rewrite(&object(json!({"rewritten_suggestions": []})), BOUNDS).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_rewrite_rejects_other_types() {
        for bad in [json!(42), json!({"a": 1}), json!(null), json!(false)] {
            let err = validate_rewrite(&object(json!({"rewritten_suggestions": bad})), BOUNDS)
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Validation(ValidationError::InvalidRewrittenSuggestions(_))
            ));
        }
    }

    #[test]
    fn test_rewrite_item_line_breaks_flattened() {
        let items = validate_rewrite(
            &object(json!({"rewritten_suggestions": ["one\ntwo", "three\r\nfour"]})),
            BOUNDS,
        )
        .unwrap();
        assert_eq!(items, vec!["one two", "three four"]);
    }

    #[test]
    fn test_rewrite_non_string_items_kept_as_json() {
        let items = validate_rewrite(&object(json!({"rewritten_suggestions": ["a", 2]})), BOUNDS).unwrap();
        assert_eq!(items, vec!["a", "2"]);
    }
}

//! Model invocation with JSON extraction and bounded retry.
//!
//! Each attempt makes a fresh backend call. Raw text is parsed as JSON by
//! trying, in order: the whole text, the first fenced code block, and the
//! outermost `{...}` span. An attempt succeeds only when the result is a
//! JSON object carrying every required field.

use super::{Backend, ClientRegistry};
use crate::error::Error;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// One request to a backend: which model, what to send, what must come back
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub backend: Backend,
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub required_fields: &'a [&'a str],
}

/// Call the backend until it returns a JSON object with every required field.
///
/// Configuration failures (unknown credentials, bad endpoint) and
/// non-retryable transport failures abort immediately. Everything else
/// consumes an attempt; after `max_attempts` the last failure is returned
/// inside `InvocationExhausted`.
pub async fn invoke(
    registry: &ClientRegistry,
    max_attempts: u32,
    call: &Invocation<'_>,
) -> Result<Map<String, Value>, Error> {
    let provider = registry.provider(call.backend)?;
    let max_attempts = max_attempts.max(1);
    let mut last_failure = String::new();

    for attempt in 1..=max_attempts {
        debug!(
            "{} attempt {} of {} [model: {}, prompt: {} chars]",
            provider.name(),
            attempt,
            max_attempts,
            call.model,
            call.user.len()
        );

        let raw = match provider.complete(call.model, call.system, call.user).await {
            Ok(raw) => raw,
            Err(e) if e.is_retryable() => {
                warn!("{} call failed (attempt {}): {}", provider.name(), attempt, e);
                last_failure = e.to_string();
                continue;
            }
            Err(e) => {
                warn!("{} call failed with non-retryable error: {}", provider.name(), e);
                return Err(e);
            }
        };

        let Some(object) = parse_json_object(&raw) else {
            warn!(
                "{} returned unparseable output (attempt {}, {} chars)",
                provider.name(),
                attempt,
                raw.len()
            );
            last_failure = format!("no JSON object in {} chars of output", raw.len());
            continue;
        };

        let missing = missing_fields(&object, call.required_fields);
        if !missing.is_empty() {
            warn!(
                "{} response missing fields {:?} (attempt {})",
                provider.name(),
                missing,
                attempt
            );
            last_failure = format!("missing fields: {}", missing.join(", "));
            continue;
        }

        return Ok(object);
    }

    Err(Error::InvocationExhausted {
        attempts: max_attempts,
        last_failure,
    })
}

/// Extract a JSON object from free-form model output
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(object) = as_object(text) {
        return Some(object);
    }

    if let Some(block) = fenced_block().captures(text).and_then(|c| c.get(1)) {
        if let Some(object) = as_object(block.as_str()) {
            return Some(object);
        }
    }

    outer_braces()
        .find(text)
        .and_then(|span| as_object(span.as_str()))
}

fn as_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn missing_fields<'a>(object: &Map<String, Value>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .filter(|field| !object.contains_key(**field))
        .copied()
        .collect()
}

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block pattern is valid")
    })
}

fn outer_braces() -> &'static Regex {
    static BRACES: OnceLock<Regex> = OnceLock::new();
    BRACES.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"))
}

//! Answer normalization
//!
//! Turns a raw reply into a typed value. The backend is asked for JSON but
//! does not always produce it, so parsing falls through a cascade:
//!
//! 1. strip surrounding whitespace and a single Markdown code fence
//! 2. the literal `null` is null
//! 3. strict JSON
//! 4. permissive literal syntax (see [`literal`])
//! 5. the trimmed text itself, as a string
//!
//! Shape checks for list- and mapping-typed answers happen after the cascade
//! and fail loudly rather than guessing.

mod literal;

#[cfg(test)]
mod proptests;

pub use literal::{key_string, parse_literal, LiteralError};

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n?```$")
        .expect("CODE_FENCE is a compile-time constant")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("unexpected shape for list-typed answer: {0}")]
    NotAList(String),
    #[error("unexpected shape for mapping-typed answer: {0}")]
    NotAMapping(String),
}

/// Trim the reply and unwrap a single surrounding code fence
pub fn clean_reply(reply: &str) -> &str {
    let trimmed = reply.trim();
    CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |inner| inner.as_str().trim())
}

/// Normalize a reply with no shape expectation
pub fn normalize(reply: &str) -> Value {
    let text = clean_reply(reply);
    if text == "null" {
        return Value::Null;
    }
    serde_json::from_str(text)
        .or_else(|_| parse_literal(text))
        .unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Normalize a reply that should be a list.
///
/// Mappings become the list of their keys; null and `{}` become empty.
pub fn normalize_list(reply: &str) -> Result<Vec<Value>, NormalizeError> {
    let text = clean_reply(reply);
    if text == "{}" {
        return Ok(Vec::new());
    }
    match normalize(text) {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(map) => Ok(map.into_iter().map(|(k, _)| Value::String(k)).collect()),
        _ => Err(NormalizeError::NotAList(text.to_string())),
    }
}

/// Normalize a reply that should be a key/value mapping.
///
/// Besides a plain mapping, two list encodings are merged in order (later
/// entries overwrite earlier ones): a list of mappings with any number of
/// keys each, and a list of `[key, value]` pairs with scalar keys.
pub fn normalize_mapping(reply: &str) -> Result<Map<String, Value>, NormalizeError> {
    let text = clean_reply(reply);
    let shape_error = || NormalizeError::NotAMapping(text.to_string());

    match normalize(text) {
        Value::Object(map) => Ok(map),
        Value::Array(items) => {
            let mut merged = Map::new();
            for item in items {
                match item {
                    Value::Object(entry) => merged.extend(entry),
                    Value::Array(pair) => {
                        let [key, value]: [Value; 2] =
                            pair.try_into().map_err(|_| shape_error())?;
                        let key = match key {
                            Value::Array(_) | Value::Object(_) | Value::Null => {
                                return Err(shape_error())
                            }
                            scalar => key_string(&scalar).ok_or_else(shape_error)?,
                        };
                        merged.insert(key, value);
                    }
                    _ => return Err(shape_error()),
                }
            }
            Ok(merged)
        }
        _ => Err(shape_error()),
    }
}

//! Commands in the surface syntax the store dialogue is taught
//!
//! String arguments are embedded as JSON string literals so keys, patterns
//! and questions containing quotes cannot break out of the call syntax.

use serde_json::Value;
use std::fmt;

/// One command sent to the store dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    mutating: bool,
}

impl Command {
    pub fn save(key: &str, value: &Value) -> Self {
        Self::mutation(format!("save({}, {value})", quote(key)))
    }

    pub fn delete(key: &str) -> Self {
        Self::mutation(format!("delete({})", quote(key)))
    }

    pub fn read(key: &str) -> Self {
        Self::read_only(format!("read({})", quote(key)))
    }

    pub fn all() -> Self {
        Self::read_only("all();".to_string())
    }

    pub fn filter(pattern: &str) -> Self {
        Self::read_only(format!("filter({})", quote(pattern)))
    }

    pub fn query(text: &str) -> Self {
        Self::read_only(format!("query({})", quote(text)))
    }

    /// A previously logged mutation, replayed verbatim
    pub fn logged(text: impl Into<String>) -> Self {
        Self::mutation(text.into())
    }

    fn mutation(text: String) -> Self {
        Self {
            text,
            mutating: true,
        }
    }

    fn read_only(text: String) -> Self {
        Self {
            text,
            mutating: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the command changes stored state and must be logged
    pub fn is_mutating(&self) -> bool {
        self.mutating
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

//! Resumable conversation identifiers
//!
//! The pair of conversation ids is all that is needed to pick a store back
//! up later without re-teaching either dialogue.

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationIds {
    pub store: Option<String>,
    pub log: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResumeFile {
    #[serde(flatten)]
    ids: ConversationIds,
    saved_at: DateTime<Utc>,
}

impl ConversationIds {
    pub fn new(store: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            store: Some(store.into()),
            log: Some(log.into()),
        }
    }

    /// Both dialogues can be resumed
    pub fn is_complete(&self) -> bool {
        self.store.is_some() && self.log.is_some()
    }

    /// Load ids saved by [`ConversationIds::save`]; `None` if the file does not exist
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Option<Self>> {
        let text = match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: ResumeFile = serde_json::from_str(&text)?;
        tracing::debug!(saved_at = %file.saved_at, "Loaded conversation ids");
        Ok(Some(file.ids))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = ResumeFile {
            ids: self.clone(),
            saved_at: Utc::now(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

//! Key-value store over a conversational backend
//!
//! Entities live only in the backend's memory of the store dialogue; this
//! type never caches them. Every mutation is sent to the action log and the
//! store dialogue together, so the log can rebuild the store from scratch.
//!
//! Operations take `&mut self`, which serializes them on one instance. Share
//! a store between tasks through [`KeyValueStore::into_shared`].

mod conversation_ids;

#[cfg(test)]
mod proptests;

pub use conversation_ids::ConversationIds;

use crate::action_log::ActionLog;
use crate::command::Command;
use crate::credentials::SharedCredentials;
use crate::dialogue::{DialogueClient, RetryPolicy};
use crate::error::{StoreError, StoreResult};
use crate::normalize::{clean_reply, normalize, normalize_list, normalize_mapping};
use crate::prompts::{DEFAULT_LOG_PROMPT, DEFAULT_STORE_PROMPT};
use crate::transport::RemoteSession;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A store shared between tasks, one operation at a time
pub type SharedStore = Arc<Mutex<KeyValueStore>>;

/// Tunables for a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub store_prompt: String,
    pub log_prompt: String,
    pub retry: RetryPolicy,
    /// Bound on the bootstrap loops of both dialogues
    pub max_bootstrap_attempts: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            store_prompt: DEFAULT_STORE_PROMPT.to_string(),
            log_prompt: DEFAULT_LOG_PROMPT.to_string(),
            retry: RetryPolicy::default(),
            max_bootstrap_attempts: 5,
        }
    }
}

pub struct KeyValueStore {
    primary: DialogueClient,
    log: ActionLog,
    store_prompt: String,
    max_bootstrap_attempts: u32,
    reset_on_start: bool,
}

impl KeyValueStore {
    /// A store that starts from empty dialogues
    pub fn new(
        session: Arc<dyn RemoteSession>,
        credentials: SharedCredentials,
        options: StoreOptions,
    ) -> Self {
        Self::build(session, credentials, ConversationIds::default(), options)
    }

    /// A store that continues previously bootstrapped dialogues.
    ///
    /// Incomplete ids cannot be resumed safely; the store then starts fresh.
    pub fn resume(
        session: Arc<dyn RemoteSession>,
        credentials: SharedCredentials,
        ids: ConversationIds,
        options: StoreOptions,
    ) -> Self {
        if !ids.is_complete() {
            tracing::warn!(?ids, "Incomplete conversation ids, starting a fresh store");
            return Self::new(session, credentials, options);
        }
        Self::build(session, credentials, ids, options)
    }

    fn build(
        session: Arc<dyn RemoteSession>,
        credentials: SharedCredentials,
        ids: ConversationIds,
        options: StoreOptions,
    ) -> Self {
        let reset_on_start = !ids.is_complete();
        let primary = DialogueClient::new(
            "store",
            session.clone(),
            credentials.clone(),
            ids.store,
            options.retry.clone(),
        );
        let log_dialogue =
            DialogueClient::new("log", session, credentials, ids.log, options.retry);
        Self {
            primary,
            log: ActionLog::new(log_dialogue, options.log_prompt, options.max_bootstrap_attempts),
            store_prompt: options.store_prompt,
            max_bootstrap_attempts: options.max_bootstrap_attempts.max(1),
            reset_on_start,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Prepare both dialogues.
    ///
    /// A fresh store wipes and re-teaches its dialogue until `all()` comes
    /// back empty; a resumed one only refreshes credentials.
    pub async fn start(&mut self) -> StoreResult<()> {
        self.start_with(self.reset_on_start).await
    }

    async fn start_with(&mut self, reset: bool) -> StoreResult<()> {
        tracing::debug!(reset, "Initializing key-value store");
        if reset {
            self.primary.reset();
        }
        self.primary.refresh_session().await?;
        if reset {
            self.bootstrap_primary().await?;
        }
        tracing::info!(conversation_id = ?self.primary.conversation_id(), "Key-value store is ready");

        if !self.log.is_started() {
            tracing::debug!("Store requires the action log, starting it now");
            self.log.start(reset).await?;
        }
        // later start() calls only refresh credentials
        self.reset_on_start = false;
        Ok(())
    }

    /// Derive a new bearer token for both dialogues, e.g. after `AuthExpired`
    pub async fn refresh_session(&self) -> StoreResult<()> {
        self.primary.refresh_session().await
    }

    async fn bootstrap_primary(&mut self) -> StoreResult<()> {
        let mut attempt = 1;
        loop {
            self.primary.send(&self.store_prompt).await?;
            tracing::debug!(attempt, "Verifying the store starts empty");
            let reply = self.primary.send(Command::all().as_str()).await?;
            if matches!(clean_reply(&reply), "{}" | "[]") {
                return Ok(());
            }
            if attempt >= self.max_bootstrap_attempts {
                return Err(StoreError::BootstrapFailed {
                    dialogue: self.primary.label(),
                    attempts: attempt,
                });
            }
            tracing::warn!(attempt, reply = %reply, "Store bootstrap not verified, retrying");
            self.primary.reset();
            self.primary.refresh_session().await?;
            attempt += 1;
        }
    }

    async fn ensure_log_started(&mut self) -> StoreResult<()> {
        if !self.log.is_started() {
            tracing::debug!("Store requires the action log, starting it now");
            self.log.start(self.reset_on_start).await?;
        }
        Ok(())
    }

    /// Send a command to the store dialogue and return the raw reply.
    ///
    /// Mutations are appended to the log at the same time unless `skip_log`
    /// is set; both turns must succeed.
    async fn execute(&mut self, command: &Command, skip_log: bool) -> StoreResult<String> {
        if skip_log || !command.is_mutating() {
            return self.primary.send(command.as_str()).await;
        }
        self.ensure_log_started().await?;
        tracing::debug!(command = %command, "Executing command and appending it to the action log");
        let ((), reply) = futures::future::try_join(
            self.log.append(command),
            self.primary.send(command.as_str()),
        )
        .await?;
        tracing::debug!("Command executed");
        Ok(reply)
    }

    pub async fn save(&mut self, key: &str, value: impl Into<Value>) -> StoreResult<Value> {
        let reply = self.execute(&Command::save(key, &value.into()), false).await?;
        Ok(normalize(&reply))
    }

    pub async fn delete(&mut self, key: &str) -> StoreResult<Value> {
        let reply = self.execute(&Command::delete(key), false).await?;
        Ok(normalize(&reply))
    }

    /// The value under `key`, or `Value::Null` when absent
    pub async fn read(&mut self, key: &str) -> StoreResult<Value> {
        let reply = self.execute(&Command::read(key), false).await?;
        Ok(normalize(&reply))
    }

    pub async fn all(&mut self) -> StoreResult<Map<String, Value>> {
        let reply = self.execute(&Command::all(), false).await?;
        Ok(normalize_mapping(&reply)?)
    }

    /// Values whose key matches `pattern` (or the keys, if the backend answers with a mapping)
    pub async fn filter(&mut self, pattern: &str) -> StoreResult<Vec<Value>> {
        let reply = self.execute(&Command::filter(pattern), false).await?;
        Ok(normalize_list(&reply)?)
    }

    /// Free-form question about the stored data
    pub async fn query(&mut self, text: &str) -> StoreResult<Value> {
        let reply = self.execute(&Command::query(text), false).await?;
        Ok(normalize(&reply))
    }

    /// Drop the last `n` mutations.
    ///
    /// This is a full rebuild, not an incremental rollback: the store
    /// dialogue is wiped and every remaining logged command is replayed, so
    /// the cost grows with the length of the history. Returns the reply to
    /// the last replayed command, or `None` when nothing remains.
    pub async fn undo(&mut self, n: usize) -> StoreResult<Option<Value>> {
        if n == 0 {
            return Err(StoreError::InvalidUndoCount);
        }
        tracing::info!(n, "Undo rebuilds the whole store from the action log, please wait");
        self.ensure_log_started().await?;
        let commands = self.log.undo(n).await?;
        self.start_with(true).await?;

        let mut last = None;
        for text in &commands {
            last = Some(self.execute(&Command::logged(text.as_str()), true).await?);
        }
        tracing::info!(replayed = commands.len(), "Undo finished");
        Ok(last.as_deref().map(normalize))
    }

    pub async fn undo_last(&mut self) -> StoreResult<Option<Value>> {
        self.undo(1).await
    }

    /// The logged mutations, oldest first
    pub async fn get_log(&mut self) -> StoreResult<Vec<String>> {
        self.ensure_log_started().await?;
        self.log.get().await
    }

    /// Ids to persist for [`KeyValueStore::resume`]
    pub fn conversation_ids(&self) -> ConversationIds {
        ConversationIds {
            store: self.primary.conversation_id().map(str::to_string),
            log: self.log.conversation_id().map(str::to_string),
        }
    }
}

//! Action log
//!
//! A second dialogue that records every mutating command as a turn. The
//! backend's memory of that dialogue is the log; nothing is kept locally.
//! `SHOW` lists the remembered commands and `UNDO n` forgets the last `n`.

use crate::command::Command;
use crate::dialogue::DialogueClient;
use crate::error::{StoreError, StoreResult};
use crate::normalize::clean_reply;
use crate::prompts::{self, ACKNOWLEDGMENT, SHOW};

pub struct ActionLog {
    dialogue: DialogueClient,
    bootstrap_prompt: String,
    max_bootstrap_attempts: u32,
    started: bool,
}

impl ActionLog {
    pub fn new(
        dialogue: DialogueClient,
        bootstrap_prompt: impl Into<String>,
        max_bootstrap_attempts: u32,
    ) -> Self {
        Self {
            dialogue,
            bootstrap_prompt: bootstrap_prompt.into(),
            max_bootstrap_attempts: max_bootstrap_attempts.max(1),
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.dialogue.conversation_id()
    }

    /// Make the log ready for use.
    ///
    /// With `reset`, the log dialogue is wiped and re-taught until it answers
    /// the bootstrap with a bare acknowledgment. Without it, the dialogue is
    /// assumed to be a resumed, already-taught conversation.
    pub async fn start(&mut self, reset: bool) -> StoreResult<()> {
        tracing::debug!(reset, "Initializing the action log");
        if reset {
            self.dialogue.reset();
        }
        self.dialogue.refresh_session().await?;

        if reset {
            let mut attempt = 1;
            loop {
                let reply = self.dialogue.send(&self.bootstrap_prompt).await?;
                if clean_reply(&reply) == ACKNOWLEDGMENT {
                    break;
                }
                if attempt >= self.max_bootstrap_attempts {
                    return Err(StoreError::BootstrapFailed {
                        dialogue: self.dialogue.label(),
                        attempts: attempt,
                    });
                }
                tracing::warn!(attempt, reply = %reply, "Log bootstrap not acknowledged, retrying");
                self.dialogue.reset();
                self.dialogue.refresh_session().await?;
                attempt += 1;
            }
        }

        self.started = true;
        tracing::info!(conversation_id = ?self.conversation_id(), "Action log is ready");
        Ok(())
    }

    /// Record one command. The log must answer with a bare acknowledgment.
    pub async fn append(&mut self, command: &Command) -> StoreResult<()> {
        tracing::debug!(command = %command, "Appending to action log");
        let reply = self.dialogue.send(command.as_str()).await?;
        expect_acknowledgment(command.as_str(), &reply)
    }

    /// Forget the last `n` commands and return the ones that remain
    pub async fn undo(&mut self, n: usize) -> StoreResult<Vec<String>> {
        if n == 0 {
            return Err(StoreError::InvalidUndoCount);
        }
        tracing::debug!(n, "Rewriting action log");
        let turn = prompts::undo(n);
        let reply = self.dialogue.send(&turn).await?;
        expect_acknowledgment(&turn, &reply)?;
        self.get().await
    }

    /// The remembered commands, oldest first
    pub async fn get(&mut self) -> StoreResult<Vec<String>> {
        tracing::debug!("Querying the action log");
        let reply = self.dialogue.send(SHOW).await?;
        Ok(parse_entries(&reply))
    }
}

fn expect_acknowledgment(command: &str, reply: &str) -> StoreResult<()> {
    if clean_reply(reply) == ACKNOWLEDGMENT {
        Ok(())
    } else {
        Err(StoreError::LogAcknowledgmentViolation {
            command: command.to_string(),
            reply: reply.to_string(),
        })
    }
}

/// A bare acknowledgment means an empty log; otherwise one command per line
fn parse_entries(reply: &str) -> Vec<String> {
    let text = clean_reply(reply);
    if text == ACKNOWLEDGMENT {
        return Vec::new();
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

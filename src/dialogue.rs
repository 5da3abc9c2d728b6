//! Dialogue client
//!
//! Owns one conversation with the backend: the continuation tokens that say
//! where the next turn attaches, and the retry policy for transient failures.
//! Tokens advance only after a successful exchange, so a retried turn always
//! attaches to the same parent as the failed one.

use crate::credentials::SharedCredentials;
use crate::error::{StoreError, StoreResult};
use crate::transport::{RemoteSession, TurnRequest};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Where in a conversation the next turn attaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationTokens {
    pub conversation_id: Option<String>,
    pub parent_message_id: String,
}

impl ContinuationTokens {
    /// A brand-new, empty conversation
    pub fn fresh() -> Self {
        Self {
            conversation_id: None,
            parent_message_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn resume(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            parent_message_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Bounded exponential backoff for transient backend failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first resend
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Total attempts, including the first one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: 8,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..retry {
            if delay >= self.max_delay {
                break;
            }
            delay = delay.mul_f64(self.multiplier).min(self.max_delay);
        }
        delay
    }
}

/// One conversation against the backend
pub struct DialogueClient {
    label: &'static str,
    session: Arc<dyn RemoteSession>,
    credentials: SharedCredentials,
    tokens: ContinuationTokens,
    retry: RetryPolicy,
}

impl DialogueClient {
    pub fn new(
        label: &'static str,
        session: Arc<dyn RemoteSession>,
        credentials: SharedCredentials,
        conversation_id: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        let tokens = conversation_id.map_or_else(ContinuationTokens::fresh, ContinuationTokens::resume);
        Self {
            label,
            session,
            credentials,
            tokens,
            retry,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.tokens.conversation_id.as_deref()
    }

    pub fn tokens(&self) -> &ContinuationTokens {
        &self.tokens
    }

    /// Start over in a new, empty conversation. Credentials are kept.
    pub fn reset(&mut self) {
        tracing::debug!(dialogue = self.label, "Resetting dialogue");
        self.tokens = ContinuationTokens::fresh();
    }

    pub async fn refresh_session(&self) -> StoreResult<()> {
        self.credentials.refresh(self.session.as_ref()).await
    }

    /// Send one turn and return the reply text.
    ///
    /// Overload and network failures are resent after the policy's backoff;
    /// everything else is returned immediately.
    pub async fn send(&mut self, text: &str) -> StoreResult<String> {
        let mut attempt = 1;
        loop {
            let request = TurnRequest {
                prompt: text.to_string(),
                message_id: Uuid::new_v4().to_string(),
                conversation_id: self.tokens.conversation_id.clone(),
                parent_message_id: self.tokens.parent_message_id.clone(),
            };
            let bearer = self.credentials.bearer_token().await;

            match self.session.converse(&request, bearer.as_deref()).await {
                Ok(reply) => {
                    self.tokens = ContinuationTokens {
                        conversation_id: Some(reply.conversation_id),
                        parent_message_id: reply.message_id,
                    };
                    tracing::debug!(dialogue = self.label, attempt, reply = %reply.text, "Got reply");
                    return Ok(reply.text);
                }
                Err(e) if e.kind.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        dialogue = self.label,
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e.message,
                        "Transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(StoreError::from_transport(e, attempt)),
            }
        }
    }
}

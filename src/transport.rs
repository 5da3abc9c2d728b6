//! Remote session abstraction
//!
//! The store only needs "stateful turn-based text exchange" from its backend.
//! Anything that can accept a prompt attached to a conversation and hand back
//! the reply plus the new continuation satisfies [`RemoteSession`].

mod chat_backend;
mod error;
mod types;


pub use chat_backend::{BackendConfig, ChatBackend};
pub use error::{TransportError, TransportErrorKind, AUTH_EXPIRED_MARKER, OVERLOAD_MARKERS};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for conversational backends
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Send one turn and return the reply with its continuation tokens
    async fn converse(
        &self,
        request: &TurnRequest,
        bearer_token: Option<&str>,
    ) -> Result<TurnReply, TransportError>;

    /// Derive a new bearer token from the long-lived session token
    async fn refresh_session(&self, session_token: &str) -> Result<SessionTokens, TransportError>;

    /// Backend name for log fields
    fn name(&self) -> &str;
}

/// Logging wrapper for remote sessions
pub struct LoggingSession {
    inner: Arc<dyn RemoteSession>,
    name: String,
}

impl LoggingSession {
    pub fn new(inner: Arc<dyn RemoteSession>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl RemoteSession for LoggingSession {
    async fn converse(
        &self,
        request: &TurnRequest,
        bearer_token: Option<&str>,
    ) -> Result<TurnReply, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.converse(request, bearer_token).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::debug!(
                    backend = %self.name,
                    duration_ms = %duration.as_millis(),
                    conversation_id = %reply.conversation_id,
                    reply_len = reply.text.len(),
                    "Turn completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.name,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Turn failed"
                );
            }
        }

        result
    }

    async fn refresh_session(&self, session_token: &str) -> Result<SessionTokens, TransportError> {
        let result = self.inner.refresh_session(session_token).await;
        if let Err(e) = &result {
            tracing::error!(backend = %self.name, error = %e.message, "Session refresh failed");
        }
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

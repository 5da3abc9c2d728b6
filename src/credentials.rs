//! Session credentials shared by the dialogues of one store

use crate::error::{StoreError, StoreResult};
use crate::transport::RemoteSession;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Long-lived session token plus the bearer token derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub session_token: String,
    pub bearer_token: Option<String>,
}

impl SessionCredentials {
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            bearer_token: None,
        }
    }
}

/// Cloneable handle to the credentials of one store
#[derive(Debug, Clone)]
pub struct SharedCredentials {
    inner: Arc<RwLock<SessionCredentials>>,
}

impl SharedCredentials {
    pub fn new(credentials: SessionCredentials) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    pub async fn bearer_token(&self) -> Option<String> {
        self.inner.read().await.bearer_token.clone()
    }

    pub async fn snapshot(&self) -> SessionCredentials {
        self.inner.read().await.clone()
    }

    /// Derive a fresh bearer token and adopt a rotated session token.
    ///
    /// Safe to call repeatedly.
    pub async fn refresh(&self, session: &dyn RemoteSession) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let tokens = session
            .refresh_session(&guard.session_token)
            .await
            .map_err(|e| StoreError::from_transport(e, 1))?;
        if tokens.session_token != guard.session_token {
            tracing::debug!("Session token rotated");
        }
        guard.session_token = tokens.session_token;
        guard.bearer_token = Some(tokens.bearer_token);
        Ok(())
    }
}

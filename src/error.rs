//! Store error types

use crate::normalize::NormalizeError;
use crate::transport::{TransportError, TransportErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Bearer token rejected; refresh credentials and retry the operation
    #[error("Session expired: {0}")]
    AuthExpired(String),
    #[error("Backend still overloaded after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
    #[error("Malformed response: {message}")]
    MalformedResponse {
        message: String,
        body: Option<String>,
    },
    #[error("Transport error: {0}")]
    Transport(TransportError),
    #[error("Log answered {command:?} with {reply:?} instead of OK")]
    LogAcknowledgmentViolation { command: String, reply: String },
    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizeError),
    #[error("{dialogue} dialogue did not accept its bootstrap after {attempts} attempts")]
    BootstrapFailed {
        dialogue: &'static str,
        attempts: u32,
    },
    #[error("Undo count must be at least 1")]
    InvalidUndoCount,
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Map a transport failure that will not be retried
    pub fn from_transport(error: TransportError, attempts: u32) -> Self {
        match error.kind {
            TransportErrorKind::Auth => Self::AuthExpired(error.message),
            TransportErrorKind::Malformed => Self::MalformedResponse {
                message: error.message,
                body: error.body,
            },
            TransportErrorKind::Overloaded | TransportErrorKind::Network => {
                Self::RetriesExhausted {
                    attempts,
                    message: error.message,
                }
            }
            TransportErrorKind::Unknown => Self::Transport(error),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

//! Transport error types

use thiserror::Error;

/// Body text the backend sends when the bearer token is no longer valid.
pub const AUTH_EXPIRED_MARKER: &str = "Your authentication token has expired";

/// Body fragments that signal a temporary overload unrelated to the request.
pub const OVERLOAD_MARKERS: &[&str] = &[
    "Rate limit reached for",
    "We're working to restore all services as soon as possible",
];

/// Transport error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    /// Raw response body, kept for diagnostics
    pub body: Option<String>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Auth, message)
    }

    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Overloaded, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Malformed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }

    /// Classify a raw response body by its status and known marker text.
    ///
    /// Only meaningful for bodies that are not a valid event stream; a reply
    /// may legitimately quote a marker phrase. Returns `None` when nothing
    /// matches.
    pub fn classify_body(status: u16, body: &str) -> Option<Self> {
        if body.contains(AUTH_EXPIRED_MARKER) || matches!(status, 401 | 403) {
            return Some(Self::auth(format!("Authentication failed (HTTP {status})")).with_body(body));
        }
        if let Some(marker) = OVERLOAD_MARKERS.iter().find(|m| body.contains(**m)) {
            return Some(
                Self::overloaded(format!("Backend overloaded: {marker}")).with_body(body),
            );
        }
        match status {
            429 => Some(Self::overloaded("Rate limited (HTTP 429)").with_body(body)),
            500..=599 => {
                Some(Self::overloaded(format!("Server unavailable (HTTP {status})")).with_body(body))
            }
            _ => None,
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Bearer token expired or rejected - not retryable, refresh credentials
    Auth,
    /// Rate limited or backend temporarily down - retryable with backoff
    Overloaded,
    /// Body was not the expected event stream - not retryable
    Malformed,
    /// Connection failures, timeouts - retryable
    Network,
    /// Unknown error
    Unknown,
}

impl TransportErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Overloaded | Self::Network)
    }
}

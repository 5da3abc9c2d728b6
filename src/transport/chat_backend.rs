//! HTTP backend for the conversational web API
//!
//! Replies arrive as an event stream of `data: {json}` lines, each carrying the
//! message generated so far. The last complete event is the answer.

use super::types::{SessionTokens, TurnReply, TurnRequest};
use super::{RemoteSession, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SESSION_COOKIE: &str = "__Secure-next-auth.session-token";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36";

/// Connection settings for [`ChatBackend`]
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://chat.openai.com".to_string(),
            model: "text-davinci-002-render".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Conversational web backend reached over HTTPS
pub struct ChatBackend {
    client: Client,
    config: BackendConfig,
}

impl ChatBackend {
    pub fn new(config: BackendConfig) -> Result<Self, TransportError> {
        let base = config.base_url.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_str(base)
            .map_err(|e| TransportError::unknown(format!("Invalid base URL {base}: {e}")))?;
        let referer = HeaderValue::from_str(&format!("{base}/chat"))
            .map_err(|e| TransportError::unknown(format!("Invalid base URL {base}: {e}")))?;
        headers.insert(ORIGIN, origin);
        headers.insert(REFERER, referer);
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RemoteSession for ChatBackend {
    async fn converse(
        &self,
        request: &TurnRequest,
        bearer_token: Option<&str>,
    ) -> Result<TurnReply, TransportError> {
        let payload = ConversationRequest {
            action: "next",
            messages: [OutgoingMessage {
                id: &request.message_id,
                role: "user",
                content: OutgoingContent {
                    content_type: "text",
                    parts: [&request.prompt],
                },
            }],
            conversation_id: request.conversation_id.as_deref(),
            parent_message_id: &request.parent_message_id,
            model: &self.config.model,
        };

        let mut builder = self
            .client
            .post(self.url("/backend-api/conversation"))
            .header(ACCEPT, "text/event-stream")
            .json(&payload);
        if let Some(token) = bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        interpret_body(status.as_u16(), &body)
    }

    async fn refresh_session(&self, session_token: &str) -> Result<SessionTokens, TransportError> {
        tracing::debug!("Refreshing session token");
        let response = self
            .client
            .get(self.url("/api/auth/session"))
            .header(COOKIE, format!("{SESSION_COOKIE}={session_token}"))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let rotated = rotated_session_token(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        if let Some(err) = TransportError::classify_body(status.as_u16(), &body) {
            return Err(err);
        }

        let session: AuthSession = serde_json::from_str(&body).map_err(|e| {
            TransportError::malformed(format!("Failed to parse session: {e}")).with_body(body.as_str())
        })?;
        let bearer_token = session.access_token.ok_or_else(|| {
            TransportError::auth("Session response carried no access token").with_body(body.as_str())
        })?;

        Ok(SessionTokens {
            session_token: rotated.unwrap_or_else(|| session_token.to_string()),
            bearer_token,
        })
    }

    fn name(&self) -> &str {
        &self.config.base_url
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        TransportError::network(format!("Connection failed: {e}"))
    } else {
        TransportError::unknown(format!("Request failed: {e}"))
    }
}

/// Pick the rotated session token out of `Set-Cookie` headers, if any
fn rotated_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, value)| name.trim() == SESSION_COOKIE && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

/// Turn a conversation response into a reply or a classified error.
///
/// A successful event stream is a reply even when its text happens to
/// contain a marker phrase; markers only classify bodies that are not one.
pub(crate) fn interpret_body(status: u16, body: &str) -> Result<TurnReply, TransportError> {
    let classified = || TransportError::classify_body(status, body);
    if (200..300).contains(&status) {
        return parse_event_stream(body).map_err(|err| classified().unwrap_or(err));
    }
    Err(classified()
        .unwrap_or_else(|| TransportError::unknown(format!("HTTP {status} error")).with_body(body)))
}

/// Extract the final reply from an event-stream body
fn parse_event_stream(body: &str) -> Result<TurnReply, TransportError> {
    let mut last = None;

    for line in body.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            continue;
        }
        let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
            continue;
        };
        if let Some(reply) = event.into_reply() {
            last = Some(reply);
        }
    }

    last.ok_or_else(|| {
        TransportError::malformed("Response is not an event stream with message content")
            .with_body(body)
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ConversationRequest<'a> {
    action: &'a str,
    messages: [OutgoingMessage<'a>; 1],
    conversation_id: Option<&'a str>,
    parent_message_id: &'a str,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    id: &'a str,
    role: &'a str,
    content: OutgoingContent<'a>,
}

#[derive(Debug, Serialize)]
struct OutgoingContent<'a> {
    content_type: &'a str,
    parts: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    message: Option<StreamMessage>,
    conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    id: String,
    content: StreamContent,
}

#[derive(Debug, Deserialize)]
struct StreamContent {
    #[serde(default)]
    parts: Vec<serde_json::Value>,
}

impl StreamEvent {
    fn into_reply(self) -> Option<TurnReply> {
        let message = self.message?;
        let conversation_id = self.conversation_id?;
        let text = message.content.parts.first()?.as_str()?.to_string();
        Some(TurnReply {
            text,
            conversation_id,
            message_id: message.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuthSession {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

//! Common types for conversational turns

/// One outgoing user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub prompt: String,
    /// Fresh id for the message being sent
    pub message_id: String,
    /// `None` starts a new conversation
    pub conversation_id: Option<String>,
    /// Message the new turn attaches to
    pub parent_message_id: String,
}

/// The backend's answer to one turn, with the continuation it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    pub conversation_id: String,
    pub message_id: String,
}

/// Result of a session refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// Long-lived token, possibly rotated by the backend
    pub session_token: String,
    /// Short-lived token sent with every turn
    pub bearer_token: String,
}

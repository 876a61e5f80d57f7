//! Chat data models
//!
//! Defines the message roles and the two message shapes the service works
//! with: the persisted transcript entry (`StoredMessage`) and the richer
//! in-turn message (`ChatMessage`) that also carries action plumbing.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::actions::{ActionRequest, ActionResult};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatRole {
    /// Fixed system instruction
    System,
    /// Message from the user
    User,
    /// Message from the assistant/AI
    Assistant,
    /// Assistant message that requests one or more actions
    ActionRequest,
    /// Result of exactly one prior action request
    ActionResult,
}

impl ChatRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::ActionRequest => "action-request",
            ChatRole::ActionResult => "action-result",
        }
    }
}

/// A persisted transcript entry
///
/// Only user and assistant messages are persisted; action plumbing lives in
/// the in-turn transcript and is rebuilt fresh each turn. The timestamp is a
/// wall-clock display string, matching what the history endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Role of the message sender
    pub role: ChatRole,
    /// Content of the message
    pub content: String,
    /// Wall-clock display timestamp (`HH:MM:SS`)
    pub timestamp: String,
}

impl StoredMessage {
    /// Create a new stored message stamped with the current wall-clock time
    pub fn new(role: ChatRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// A single message in the in-turn transcript
///
/// Ordering within the transcript is the ordering sent to the model. An
/// `ActionRequest` message owns the round's requests; each `ActionResult`
/// message references exactly one of them through `call_id`.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: ChatRole,
    /// Text content, if any
    pub content: Option<String>,
    /// Requests carried by an action-request message (empty otherwise)
    pub requests: Vec<ActionRequest>,
    /// Correlation id carried by an action-result message
    pub call_id: Option<String>,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    /// Create an action-request message from a model reply
    ///
    /// The optional text is the chatter the model emitted alongside its
    /// requests; it is preserved for the model's own context but never
    /// surfaced as a final answer.
    pub fn action_requests(content: Option<String>, requests: Vec<ActionRequest>) -> Self {
        Self {
            role: ChatRole::ActionRequest,
            content,
            requests,
            call_id: None,
        }
    }

    /// Create an action-result message from a gateway result
    pub fn action_result(result: &ActionResult) -> Self {
        Self {
            role: ChatRole::ActionResult,
            content: Some(result.model_payload().to_string()),
            requests: Vec::new(),
            call_id: Some(result.call_id.clone()),
        }
    }

    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            requests: Vec::new(),
            call_id: None,
        }
    }
}

impl From<&StoredMessage> for ChatMessage {
    fn from(stored: &StoredMessage) -> Self {
        Self {
            role: stored.role,
            content: Some(stored.content.clone()),
            requests: Vec::new(),
            call_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization_is_kebab_case() {
        let json = serde_json::to_string(&ChatRole::ActionRequest).unwrap();
        assert_eq!(json, "\"action-request\"");
        let role: ChatRole = serde_json::from_str("\"action-result\"").unwrap();
        assert_eq!(role, ChatRole::ActionResult);
    }

    #[test]
    fn test_stored_message_round_trip() {
        let message = StoredMessage::new(ChatRole::User, "hello".to_string());
        let json = serde_json::to_string(&message).unwrap();
        let parsed: StoredMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.role, ChatRole::User);
        assert_eq!(parsed.content, "hello");
        assert_eq!(parsed.timestamp, message.timestamp);
    }

    #[test]
    fn test_stored_to_chat_message_conversion() {
        let stored = StoredMessage::new(ChatRole::Assistant, "done".to_string());
        let chat = ChatMessage::from(&stored);
        assert_eq!(chat.role, ChatRole::Assistant);
        assert_eq!(chat.content.as_deref(), Some("done"));
        assert!(chat.requests.is_empty());
        assert!(chat.call_id.is_none());
    }
}

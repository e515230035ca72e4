use serde::{Deserialize, Serialize};

use crate::types::user::User;

/// A message as reported by the server, over HTTP or the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message body.
    pub content: String,
    /// Author of the message.
    pub user: User,
    /// Chat the message belongs to. Not all server responses include it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<u64>,
}

/// Parameters for submitting a new message to a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageCreateParams {
    /// Message body. Expected to be pre-trimmed and non-empty.
    pub content: String,
    /// Target chat identifier.
    pub chat_id: u64,
}

impl MessageCreateParams {
    /// Creates parameters for a message in the given chat.
    pub fn new(content: impl Into<String>, chat_id: u64) -> Self {
        Self {
            content: content.into(),
            chat_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_history_response() {
        let json = serde_json::json!({
            "id": 12,
            "content": "hello",
            "timestamp": "2026-01-01T10:00:00",
            "user_id": 3,
            "chat_id": 1,
            "user": {"id": 3, "username": "alice"},
        });
        let message: Message = serde_json::from_value(json).unwrap();
        assert_eq!(message.content, "hello");
        assert_eq!(message.user.username, "alice");
        assert_eq!(message.chat_id, Some(1));
    }

    #[test]
    fn message_without_chat_id() {
        let json = serde_json::json!({"content": "hi", "user": {"username": "bob"}});
        let message: Message = serde_json::from_value(json).unwrap();
        assert_eq!(message.chat_id, None);
    }

    #[test]
    fn create_params_serialization() {
        let params = MessageCreateParams::new("hello", 4);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hello", "chat_id": 4}));
    }
}

use serde::{Deserialize, Serialize};

/// A chat as listed by the server.
///
/// Chats are read-only from the client's perspective: they are fetched as a
/// list and never mutated locally. The wire shape carries additional fields
/// (`is_group`, `created_at`, `members`) that the client ignores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Server-assigned chat identifier.
    pub id: u64,
    /// Display name of the chat.
    pub name: String,
}

/// Parameters for creating a new chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatCreateParams {
    /// Display name for the new chat.
    pub name: String,
    /// Whether the chat is a group chat.
    pub is_group: bool,
    /// Initial member ids beyond the creator.
    pub members: Vec<u64>,
}

impl ChatCreateParams {
    /// Creates parameters for a group chat with no initial members beyond
    /// the creator.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_group: true,
            members: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_ignores_unknown_fields() {
        let json = serde_json::json!({
            "id": 1,
            "name": "General",
            "is_group": true,
            "created_at": "2026-01-01T00:00:00",
            "members": [],
        });
        let chat: Chat = serde_json::from_value(json).unwrap();
        assert_eq!(chat.id, 1);
        assert_eq!(chat.name, "General");
    }

    #[test]
    fn group_params_serialization() {
        let params = ChatCreateParams::group("General");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "General", "is_group": true, "members": []})
        );
    }
}

//! Wire-format events pushed from the hub to every participant.

use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// An event broadcast to all registered participants.
///
/// Serialized as `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundEvent {
    /// A message already stored in the history.
    #[serde(rename = "chat")]
    Chat(ChatMessage),
    /// Display identities of everyone currently connected.
    #[serde(rename = "user-list")]
    UserList(Vec<String>),
}

impl OutboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Chat(_) => "chat",
            OutboundEvent::UserList(_) => "user-list",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn chat_event_wire_format() {
        let message = ChatMessage {
            id: 7,
            user: "alice".to_string(),
            content: "hello".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 31, 22, 0, 9).unwrap(),
        };
        let json = serde_json::to_value(OutboundEvent::Chat(message)).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["data"]["id"], 7);
        assert_eq!(json["data"]["user"], "alice");
        assert_eq!(json["data"]["content"], "hello");
        assert_eq!(json["data"]["timestamp"], "2025-01-31T22:00:09Z");
    }

    #[test]
    fn user_list_event_wire_format() {
        let event = OutboundEvent::UserList(vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(event.kind(), "user-list");
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "user-list", "data": ["alice", "bob"] })
        );
    }
}

use serde::{Deserialize, Serialize};

use super::ids::{ChatroomId, MessageId};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    // Persisted payloads written by the web client use "ai".
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    /// Attached image as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl MessageRecord {
    pub fn new(
        id: MessageId,
        sender: Sender,
        text: impl Into<String>,
        image: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            image,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomRecord {
    pub id: ChatroomId,
    pub title: String,
}

impl ChatroomRecord {
    pub fn new(id: ChatroomId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Login blob kept under the `auth` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRecord {
    pub country: String,
    pub phone: String,
    pub logged_in: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wire_format_matches_web_client() {
        let record = MessageRecord::new(
            MessageId::from_millis(10),
            Sender::Assistant,
            "hi",
            None,
            10,
        );
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({"id": "10", "sender": "ai", "text": "hi", "timestamp": 10})
        );
    }

    #[test]
    fn assistant_sender_accepts_both_spellings() {
        let ai: Sender = serde_json::from_str("\"ai\"").unwrap();
        let assistant: Sender = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(ai, Sender::Assistant);
        assert_eq!(assistant, Sender::Assistant);
    }

    #[test]
    fn auth_record_uses_camel_case_flag() {
        let record = AuthRecord {
            country: "+1".to_string(),
            phone: "5551234567".to_string(),
            logged_in: true,
        };
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["loggedIn"], serde_json::json!(true));
    }
}

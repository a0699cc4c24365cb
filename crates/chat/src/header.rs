use parley_storage::{ChatroomId, ChatroomRecord};

pub const TYPING_STATUS: &str = "Gemini is typing...";
pub const ONLINE_STATUS: &str = "Online";

/// Everything the chatroom header renders, handed down by the session that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderState {
    pub chatroom_id: ChatroomId,
    pub title: String,
    pub typing: bool,
}

impl HeaderState {
    /// Uses the stored title when the chatroom is known, `Chatroom <id>` otherwise.
    pub fn for_chatroom(chatroom_id: &ChatroomId, record: Option<&ChatroomRecord>) -> Self {
        let title = record
            .map(|record| record.title.clone())
            .unwrap_or_else(|| format!("Chatroom {chatroom_id}"));

        Self {
            chatroom_id: chatroom_id.clone(),
            title,
            typing: false,
        }
    }

    pub fn status(&self) -> &'static str {
        if self.typing {
            TYPING_STATUS
        } else {
            ONLINE_STATUS
        }
    }
}

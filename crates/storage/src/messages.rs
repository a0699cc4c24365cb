use std::sync::Arc;

use super::KeyValueStore;
use super::codec;
use super::error::StorageResult;
use super::ids::ChatroomId;
use super::keys::messages_key;
use super::types::MessageRecord;

/// Per-chatroom message history, one JSON array per `messages-<id>` key.
#[derive(Clone)]
pub struct MessageStore {
    kv: Arc<dyn KeyValueStore>,
}

impl MessageStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Returns the stored sequence oldest-first; anything unreadable loads as empty.
    pub fn load(&self, chatroom_id: &ChatroomId) -> Vec<MessageRecord> {
        codec::load_or_default(self.kv.as_ref(), &messages_key(chatroom_id))
    }

    /// Overwrites the whole sequence for `chatroom_id`.
    pub fn save(&self, chatroom_id: &ChatroomId, messages: &[MessageRecord]) -> StorageResult<()> {
        codec::save(self.kv.as_ref(), &messages_key(chatroom_id), messages)
    }

    pub fn remove(&self, chatroom_id: &ChatroomId) -> StorageResult<()> {
        self.kv.remove(&messages_key(chatroom_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, MessageId, Sender};

    fn store() -> (Arc<MemoryStore>, MessageStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), MessageStore::new(kv))
    }

    fn message(millis: i64, sender: Sender) -> MessageRecord {
        MessageRecord::new(MessageId::from_millis(millis), sender, "text", None, millis)
    }

    #[test]
    fn load_returns_what_save_wrote() {
        let (_, messages) = store();
        let room = ChatroomId::new("1");
        let written = vec![
            message(1, Sender::User),
            MessageRecord::new(
                MessageId::from_millis(2),
                Sender::Assistant,
                "with image",
                Some("data:image/png;base64,AAAA".to_string()),
                2,
            ),
        ];

        messages.save(&room, &written).unwrap();
        assert_eq!(messages.load(&room), written);
    }

    #[test]
    fn missing_and_malformed_entries_load_empty() {
        let (kv, messages) = store();
        let room = ChatroomId::new("1");
        assert!(messages.load(&room).is_empty());

        kv.set("messages-1", "{not json").unwrap();
        assert!(messages.load(&room).is_empty());

        kv.set("messages-1", "{\"id\": 1}").unwrap();
        assert!(messages.load(&room).is_empty());
    }

    #[test]
    fn chatrooms_are_isolated_by_key() {
        let (kv, messages) = store();
        messages
            .save(&ChatroomId::new("a"), &[message(1, Sender::User)])
            .unwrap();
        messages.save(&ChatroomId::new("b"), &[]).unwrap();

        assert_eq!(messages.load(&ChatroomId::new("a")).len(), 1);
        assert!(messages.load(&ChatroomId::new("b")).is_empty());

        messages.remove(&ChatroomId::new("a")).unwrap();
        assert_eq!(kv.keys(), vec!["messages-b".to_string()]);
    }
}

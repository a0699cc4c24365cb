use std::sync::Arc;

use super::KeyValueStore;
use super::codec;
use super::error::StorageResult;
use super::ids::ChatroomId;
use super::keys::CHATROOMS_KEY;
use super::types::ChatroomRecord;

/// The chatroom collection, stored in creation order under a single key.
#[derive(Clone)]
pub struct ChatroomStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ChatroomStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Vec<ChatroomRecord> {
        codec::load_or_default(self.kv.as_ref(), CHATROOMS_KEY)
    }

    pub fn save(&self, chatrooms: &[ChatroomRecord]) -> StorageResult<()> {
        codec::save(self.kv.as_ref(), CHATROOMS_KEY, chatrooms)
    }

    pub fn find(&self, chatroom_id: &ChatroomId) -> Option<ChatroomRecord> {
        self.load()
            .into_iter()
            .find(|chatroom| &chatroom.id == chatroom_id)
    }
}

/// Case-insensitive title filter. An empty query keeps every chatroom; order is preserved.
pub fn filter_chatrooms<'a>(chatrooms: &'a [ChatroomRecord], query: &str) -> Vec<&'a ChatroomRecord> {
    if query.is_empty() {
        return chatrooms.iter().collect();
    }

    let needle = query.to_lowercase();
    chatrooms
        .iter()
        .filter(|chatroom| chatroom.title.to_lowercase().contains(&needle))
        .collect()
}

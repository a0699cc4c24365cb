pub mod auth;
pub mod chatrooms;
mod codec;
pub mod error;
pub mod ids;
pub mod json_file;
pub mod keys;
pub mod memory;
pub mod messages;
pub mod sqlite;
pub mod types;

pub use auth::AuthStore;
pub use chatrooms::{ChatroomStore, filter_chatrooms};
pub use error::{StorageError, StorageResult};
pub use ids::{ChatroomId, MessageId};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use messages::MessageStore;
pub use sqlite::SqliteStore;
pub use types::{AuthRecord, ChatroomRecord, MessageRecord, Sender};

/// String-keyed persistence slot, modeled on browser local storage.
///
/// Every typed store in this crate goes through this trait so backends can be swapped
/// without touching chat logic, and tests can run against [`MemoryStore`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

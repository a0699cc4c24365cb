use std::path::Path;
use std::sync::Arc;

use parley_chat::{CountrySource, JsonFileCountrySource, UnconfiguredCountrySource};
use parley_storage::json_file::DEFAULT_STORE_FILE_NAME;
use parley_storage::sqlite::DEFAULT_DATABASE_FILE_NAME;
use parley_storage::{
    AuthStore, ChatroomStore, JsonFileStore, KeyValueStore, MemoryStore, MessageStore,
    SqliteStore, StorageResult,
};

use crate::settings::{AppSettings, StorageBackend};

/// Typed stores sharing one key-value backend.
#[derive(Clone)]
pub struct Stores {
    pub chatrooms: ChatroomStore,
    pub messages: MessageStore,
    pub auth: AuthStore,
}

impl Stores {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            chatrooms: ChatroomStore::new(kv.clone()),
            messages: MessageStore::new(kv.clone()),
            auth: AuthStore::new(kv),
        }
    }
}

pub async fn open_key_value_store(settings: &AppSettings) -> StorageResult<Arc<dyn KeyValueStore>> {
    let data_dir = settings.resolved_data_dir();
    let store: Arc<dyn KeyValueStore> = match settings.storage {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Json => Arc::new(JsonFileStore::open(data_dir.join(DEFAULT_STORE_FILE_NAME))?),
        StorageBackend::Sqlite => {
            let location = data_dir.join(DEFAULT_DATABASE_FILE_NAME);
            Arc::new(SqliteStore::open(&location.to_string_lossy()).await?)
        }
    };

    tracing::info!(backend = ?settings.storage, data_dir = %data_dir.display(), "opened storage backend");
    Ok(store)
}

pub fn country_source(countries_file: Option<&Path>) -> Box<dyn CountrySource> {
    match countries_file {
        Some(path) => Box::new(JsonFileCountrySource::new(path)),
        None => Box::new(UnconfiguredCountrySource),
    }
}

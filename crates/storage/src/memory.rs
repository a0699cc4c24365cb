use std::collections::HashMap;
use std::sync::RwLock;

use super::KeyValueStore;
use super::error::{InvariantViolationSnafu, StorageResult};

/// Process-local store used by tests and the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self
            .entries
            .read()
            .map(|entries| entries.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| {
            InvariantViolationSnafu {
                stage: "memory-get",
                details: "memory store lock poisoned".to_string(),
            }
            .build()
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| {
            InvariantViolationSnafu {
                stage: "memory-set",
                details: "memory store lock poisoned".to_string(),
            }
            .build()
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| {
            InvariantViolationSnafu {
                stage: "memory-remove",
                details: "memory store lock poisoned".to_string(),
            }
            .build()
        })?;
        entries.remove(key);
        Ok(())
    }
}

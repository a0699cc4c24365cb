use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use snafu::ResultExt;

use super::KeyValueStore;
use super::error::{
    CreateStoreDirectorySnafu, EncodeValueSnafu, InvariantViolationSnafu, ParseStoreFileSnafu,
    ReadStoreFileSnafu, RenameStoreFileSnafu, StorageResult, WriteStoreFileSnafu,
};

pub const DEFAULT_STORE_FILE_NAME: &str = "local-storage.json";

/// Key-value store persisted as one JSON object on disk.
///
/// Entries are cached in memory and the whole document is rewritten on each mutation
/// through a temporary file so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = read_document(&path)?;
        tracing::info!(path = %path.display(), entries = entries.len(), "opened json key-value store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateStoreDirectorySnafu {
                stage: "json-store-create-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(entries).context(EncodeValueSnafu {
            stage: "json-store-encode-document",
            key: "*".to_string(),
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteStoreFileSnafu {
            stage: "json-store-write-temporary-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.path).context(RenameStoreFileSnafu {
            stage: "json-store-rename-temporary-file",
            from: temp_path,
            to: self.path.clone(),
        })?;

        Ok(())
    }

    fn mutate(
        &self,
        stage: &'static str,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| {
            InvariantViolationSnafu {
                stage,
                details: "json store lock poisoned".to_string(),
            }
            .build()
        })?;

        // Persist a staged copy first so the cache never gets ahead of the file.
        let mut staged = entries.clone();
        apply(&mut staged);
        self.persist(&staged)?;
        *entries = staged;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| {
            InvariantViolationSnafu {
                stage: "json-store-get",
                details: "json store lock poisoned".to_string(),
            }
            .build()
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate("json-store-set", |entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.mutate("json-store-remove", |entries| {
            entries.remove(key);
        })
    }
}

fn read_document(path: &Path) -> StorageResult<BTreeMap<String, String>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(source).context(ReadStoreFileSnafu {
                stage: "json-store-read-file",
                path: path.to_path_buf(),
            });
        }
    };

    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&text).context(ParseStoreFileSnafu {
        stage: "json-store-parse-file",
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_STORE_FILE_NAME);

        let store = JsonFileStore::open(&path).unwrap();
        store.set("chatrooms", "[]").unwrap();
        store.set("messages-1", "[1]").unwrap();
        store.remove("messages-1").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("chatrooms").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("messages-1").unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_reported_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STORE_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();

        let error = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(error, StorageError::ParseStoreFile { .. }));
    }
}

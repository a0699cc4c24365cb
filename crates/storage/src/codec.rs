use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use super::KeyValueStore;
use super::error::{EncodeValueSnafu, StorageResult};

/// Reads a JSON document, treating a missing key, malformed payload or backend failure
/// as the default value. Callers never see a read error.
pub(crate) fn load_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(error) => {
            tracing::warn!(key, %error, "key-value read failed, using empty value");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(key, %error, "stored value is malformed, using empty value");
            T::default()
        }
    }
}

pub(crate) fn save<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> StorageResult<()>
where
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value).context(EncodeValueSnafu {
        stage: "encode-json-value",
        key: key.to_string(),
    })?;
    store.set(key, &encoded)
}

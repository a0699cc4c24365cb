use std::sync::Arc;

use super::KeyValueStore;
use super::codec;
use super::error::StorageResult;
use super::keys::{AUTH_KEY, AUTH_TOKEN_KEY};
use super::types::AuthRecord;

/// Login state: the `auth` blob plus the session token that gates access.
#[derive(Clone)]
pub struct AuthStore {
    kv: Arc<dyn KeyValueStore>,
}

impl AuthStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Option<AuthRecord> {
        codec::load_or_default::<Option<AuthRecord>>(self.kv.as_ref(), AUTH_KEY)
    }

    pub fn token(&self) -> Option<String> {
        match self.kv.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(error) => {
                tracing::warn!(%error, "failed to read auth token");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn save(&self, record: &AuthRecord, token: &str) -> StorageResult<()> {
        codec::save(self.kv.as_ref(), AUTH_KEY, record)?;
        self.kv.set(AUTH_TOKEN_KEY, token)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.kv.remove(AUTH_TOKEN_KEY)?;
        self.kv.remove(AUTH_KEY)
    }
}

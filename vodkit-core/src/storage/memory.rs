use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use vodkit_contracts::storage::{PreferenceStore, StorageResult};

use super::{DEFAULT_PREFIX, storage_key};

/// Volatile store, used by tests and by hosts without durable storage.
#[derive(Debug, Clone)]
pub struct MemoryPreferenceStore {
    prefix: Arc<RwLock<String>>,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self {
            prefix: Arc::new(RwLock::new(DEFAULT_PREFIX.to_string())),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry lookup by its full (already prefixed) key.
    pub fn entry(&self, full_key: &str) -> Option<String> {
        self.entries.read().get(full_key).cloned()
    }

    fn key(&self, key: &str) -> String {
        storage_key(&self.prefix.read(), key)
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn initialize(&self, prefix: &str) -> StorageResult<()> {
        *self.prefix.write() = prefix.to_string();
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StorageResult<Option<String>> {
        let key = self.key(key);
        Ok(self.entries.read().get(&key).cloned())
    }

    async fn set_item(
        &self,
        key: &str,
        value: &str,
        use_prefix: bool,
    ) -> StorageResult<()> {
        let key = if use_prefix {
            self.key(key)
        } else {
            key.to_string()
        };
        self.entries.write().insert(key, value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let key = self.key(key);
        self.entries.write().remove(&key);
        Ok(())
    }
}

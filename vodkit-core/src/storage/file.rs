use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tracing::debug;
use vodkit_contracts::storage::{PreferenceStore, StorageError, StorageResult};

use super::{DEFAULT_PREFIX, storage_key};

/// Durable store keeping one file per key below a root directory.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    root: PathBuf,
    prefix: Arc<RwLock<String>>,
}

impl FilePreferenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: Arc::new(RwLock::new(DEFAULT_PREFIX.to_string())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, full_key: &str) -> PathBuf {
        let file_name: String = full_key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(file_name)
    }

    fn prefixed(&self, key: &str) -> String {
        storage_key(&self.prefix.read(), key)
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn initialize(&self, prefix: &str) -> StorageResult<()> {
        *self.prefix.write() = prefix.to_string();
        fs::create_dir_all(&self.root)
            .await
            .map_err(StorageError::WriteFailed)?;
        debug!(root = %self.root.display(), prefix, "preference store ready");
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(&self.prefixed(key));
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::ReadFailed(err)),
        }
    }

    async fn set_item(
        &self,
        key: &str,
        value: &str,
        use_prefix: bool,
    ) -> StorageResult<()> {
        let full_key = if use_prefix {
            self.prefixed(key)
        } else {
            key.to_string()
        };
        fs::create_dir_all(&self.root)
            .await
            .map_err(StorageError::WriteFailed)?;
        fs::write(self.path_for(&full_key), value)
            .await
            .map_err(StorageError::WriteFailed)
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(&self.prefixed(key));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::WriteFailed(err)),
        }
    }
}

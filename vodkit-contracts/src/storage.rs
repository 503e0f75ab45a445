//! Local preference store contract.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read from storage")]
    ReadFailed(#[source] std::io::Error),

    #[error("Failed to write to storage")]
    WriteFailed(#[source] std::io::Error),

    #[error("Failed to encode value for key {key}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key scoped storage, namespaced by a prefix set once at startup.
///
/// Keys are stored as `{prefix}.{key}`.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn initialize(&self, prefix: &str) -> StorageResult<()>;

    /// Raw stored text of a prefixed key.
    async fn get_raw(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set_item(
        &self,
        key: &str,
        value: &str,
        use_prefix: bool,
    ) -> StorageResult<()>;

    async fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Stored value parsed as JSON. Unparseable content reads as absent.
    async fn get_item(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self
            .get_raw(key)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    async fn set_json(&self, key: &str, value: &Value) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(value).map_err(|source| StorageError::Encode {
                key: key.to_string(),
                source,
            })?;
        self.set_item(key, &encoded, true).await
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vodkit_contracts::account::AccountService;
use vodkit_contracts::catalog::CatalogService;
use vodkit_contracts::storage::{PreferenceStore, StorageError};
use vodkit_model::lenient;
use vodkit_model::{
    Customer, PlaylistItem, SerializedWatchHistoryItem, WatchHistoryItem,
};

use super::{AccountWriteLock, PERSIST_KEY_WATCH_HISTORY, resolve_media};
use crate::config::ShelfConfig;
use crate::error::AccountResult;
use crate::state::{AccountState, Store, WatchHistoryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveProgressOutcome {
    Saved,
    /// No progress was reported; nothing changed.
    Ignored,
}

/// Keeps [`WatchHistoryState`] in sync with whichever store is
/// authoritative. The list is ordered most recently updated first and
/// unique by media id.
#[derive(Clone)]
pub struct WatchHistoryController {
    account: Store<AccountState>,
    history: Store<WatchHistoryState>,
    account_service: Option<Arc<dyn AccountService>>,
    catalog: Arc<dyn CatalogService>,
    storage: Arc<dyn PreferenceStore>,
    config: ShelfConfig,
    mutation: Arc<Mutex<()>>,
    account_writes: AccountWriteLock,
}

impl std::fmt::Debug for WatchHistoryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHistoryController")
            .field("config", &self.config)
            .field("has_account_service", &self.account_service.is_some())
            .finish_non_exhaustive()
    }
}

impl WatchHistoryController {
    pub fn new(
        account: Store<AccountState>,
        history: Store<WatchHistoryState>,
        account_service: Option<Arc<dyn AccountService>>,
        catalog: Arc<dyn CatalogService>,
        storage: Arc<dyn PreferenceStore>,
        config: ShelfConfig,
        account_writes: AccountWriteLock,
    ) -> Self {
        Self {
            account,
            history,
            account_service,
            catalog,
            storage,
            config,
            mutation: Arc::new(Mutex::new(())),
            account_writes,
        }
    }

    pub fn max_count(&self) -> usize {
        self.config.max_count
    }

    pub fn snapshot(&self) -> Vec<WatchHistoryItem> {
        self.history.with_state(|state| state.items.clone())
    }

    pub fn serialize(items: &[WatchHistoryItem]) -> Vec<SerializedWatchHistoryItem> {
        items.iter().map(WatchHistoryItem::serialize).collect()
    }

    pub async fn restore(&self) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.restore_locked().await
    }

    pub async fn persist(&self) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        let items = self.snapshot();
        self.persist_locked(&items).await
    }

    /// Record playback progress of `item`.
    ///
    /// The entry moves to the front, replacing any older entry for the same
    /// media; the oldest entries are evicted past the limit. Absent or zero
    /// progress is ignored.
    pub async fn save_item(
        &self,
        item: PlaylistItem,
        series_item: Option<&PlaylistItem>,
        progress: Option<f64>,
    ) -> AccountResult<SaveProgressOutcome> {
        let Some(progress) = progress.filter(|p| p.is_finite() && *p != 0.0)
        else {
            return Ok(SaveProgressOutcome::Ignored);
        };

        let _lock = self.mutation.lock().await;
        let entry = WatchHistoryItem::new(
            item,
            series_item.map(|series| series.mediaid.clone()),
            progress,
        );

        let mediaid = entry.mediaid.clone();
        let mut updated = vec![entry];
        updated.extend(
            self.snapshot()
                .into_iter()
                .filter(|existing| existing.mediaid != mediaid),
        );
        updated.truncate(self.max_count());

        self.history.update(|state| state.items = updated.clone());
        self.persist_locked(&updated).await?;
        Ok(SaveProgressOutcome::Saved)
    }

    pub async fn remove_item(&self, mediaid: &str) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        let updated: Vec<WatchHistoryItem> = self
            .snapshot()
            .into_iter()
            .filter(|item| item.mediaid != mediaid)
            .collect();

        self.history.update(|state| state.items = updated.clone());
        self.persist_locked(&updated).await
    }

    pub async fn clear(&self) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.history.update(|state| state.items = Vec::new());
        self.persist_locked(&[]).await
    }

    /// Same rule as favorites: an account with history keeps it, an empty
    /// account receives the anonymous history.
    pub async fn merge_after_login(
        &self,
        anonymous: Vec<WatchHistoryItem>,
    ) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.restore_locked().await?;

        let remote_empty =
            self.history.with_state(|state| state.items.is_empty());
        if !remote_empty || anonymous.is_empty() {
            return Ok(());
        }

        let mut merged = anonymous;
        merged.truncate(self.max_count());
        info!(count = merged.len(), "moving anonymous watch history into account");
        self.history.update(|state| state.items = merged.clone());
        self.persist_locked(&merged).await
    }

    pub async fn adopt(
        &self,
        anonymous: Vec<WatchHistoryItem>,
    ) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        let mut adopted = anonymous;
        adopted.truncate(self.max_count());
        self.history.update(|state| state.items = adopted.clone());
        self.persist_locked(&adopted).await
    }

    async fn restore_locked(&self) -> AccountResult<()> {
        let Some(playlist_id) = self.config.playlist_id.as_deref() else {
            debug!("continue watching list not configured; skipping restore");
            return Ok(());
        };

        let authenticated =
            self.account.with_state(AccountState::is_logged_in);
        let items = match self.load(playlist_id).await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, authenticated, "watch history restore failed; showing an empty list");
                self.history.update(|state| {
                    state.items = Vec::new();
                    state.items_loaded = false;
                    state.playlist_id = Some(playlist_id.to_string());
                });
                return Err(err);
            }
        };

        debug!(count = items.len(), authenticated, "watch history restored");
        self.history.update(|state| {
            state.items = items;
            state.items_loaded = true;
            state.playlist_id = Some(playlist_id.to_string());
        });
        Ok(())
    }

    /// Stored entries resolved against the catalog, first occurrence wins.
    async fn load(
        &self,
        playlist_id: &str,
    ) -> AccountResult<Vec<WatchHistoryItem>> {
        let user = self.account.with_state(|state| state.user.clone());
        let saved = match &user {
            Some(user) => self.saved_in_account(user).await?,
            None => self.saved_locally().await?,
        };

        let mut progress_by_id: HashMap<String, SerializedWatchHistoryItem> =
            HashMap::with_capacity(saved.len());
        let mut media_ids = Vec::with_capacity(saved.len());
        for entry in saved {
            if !progress_by_id.contains_key(&entry.mediaid) {
                media_ids.push(entry.mediaid.clone());
                progress_by_id.insert(entry.mediaid.clone(), entry);
            }
        }

        let mut items: Vec<WatchHistoryItem> =
            resolve_media(self.catalog.as_ref(), playlist_id, &media_ids)
                .await?
                .into_iter()
                .filter_map(|item| {
                    let stored = progress_by_id.remove(&item.mediaid)?;
                    Some(WatchHistoryItem::new(
                        item,
                        stored.series_id,
                        stored.progress,
                    ))
                })
                .collect();
        items.truncate(self.max_count());
        Ok(items)
    }

    async fn saved_in_account(
        &self,
        user: &Customer,
    ) -> AccountResult<Vec<SerializedWatchHistoryItem>> {
        match &self.account_service {
            Some(service) => Ok(service.get_watch_history(user).await?),
            None => Ok(user
                .external_data
                .as_ref()
                .and_then(|data| data.history.clone())
                .unwrap_or_default()),
        }
    }

    async fn saved_locally(
        &self,
    ) -> AccountResult<Vec<SerializedWatchHistoryItem>> {
        Ok(self
            .storage
            .get_item(PERSIST_KEY_WATCH_HISTORY)
            .await?
            .map(lenient::parse_list)
            .unwrap_or_default())
    }

    async fn persist_locked(
        &self,
        items: &[WatchHistoryItem],
    ) -> AccountResult<()> {
        let serialized = Self::serialize(items);

        let _write = self.account_writes.acquire().await;
        let user = self.account.with_state(|state| state.user.clone());
        if let (Some(user), Some(service)) = (user, &self.account_service) {
            service
                .update_watch_history(&user, serialized.clone())
                .await?;
            self.account.update(|state| {
                if let Some(current) = state.user.as_mut()
                    && current.id == user.id
                {
                    current
                        .external_data
                        .get_or_insert_with(Default::default)
                        .history = Some(serialized);
                }
            });
            return Ok(());
        }

        let encoded = serde_json::to_string(&serialized).map_err(|source| {
            StorageError::Encode {
                key: PERSIST_KEY_WATCH_HISTORY.to_string(),
                source,
            }
        })?;
        self.storage
            .set_item(PERSIST_KEY_WATCH_HISTORY, &encoded, true)
            .await?;
        Ok(())
    }
}

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vodkit_contracts::account::AccountService;
use vodkit_contracts::catalog::CatalogService;
use vodkit_contracts::storage::{PreferenceStore, StorageError};
use vodkit_model::lenient;
use vodkit_model::{Customer, Favorite, PlaylistItem, SerializedFavorite};

use super::{
    AccountWriteLock, MAX_WATCHLIST_ITEMS_COUNT, PERSIST_KEY_FAVORITES,
    resolve_media,
};
use crate::config::ShelfConfig;
use crate::error::AccountResult;
use crate::state::{AccountState, FavoritesState, FavoritesWarning, Store};

/// Result of a favorites mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added,
    AlreadyPresent,
    Removed,
    /// Nothing changed; a warning was placed in [`FavoritesState`].
    LimitReached { max: usize },
}

/// Keeps [`FavoritesState`] in sync with whichever store is authoritative.
///
/// Mutations are serialized so a toggle never exposes an intermediate list.
#[derive(Clone)]
pub struct FavoritesController {
    account: Store<AccountState>,
    favorites: Store<FavoritesState>,
    account_service: Option<Arc<dyn AccountService>>,
    catalog: Arc<dyn CatalogService>,
    storage: Arc<dyn PreferenceStore>,
    config: ShelfConfig,
    mutation: Arc<Mutex<()>>,
    account_writes: AccountWriteLock,
}

impl std::fmt::Debug for FavoritesController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesController")
            .field("config", &self.config)
            .field("has_account_service", &self.account_service.is_some())
            .finish_non_exhaustive()
    }
}

impl FavoritesController {
    pub fn new(
        account: Store<AccountState>,
        favorites: Store<FavoritesState>,
        account_service: Option<Arc<dyn AccountService>>,
        catalog: Arc<dyn CatalogService>,
        storage: Arc<dyn PreferenceStore>,
        config: ShelfConfig,
        account_writes: AccountWriteLock,
    ) -> Self {
        Self {
            account,
            favorites,
            account_service,
            catalog,
            storage,
            config,
            mutation: Arc::new(Mutex::new(())),
            account_writes,
        }
    }

    /// Effective limit: the configured count, never above the shared ceiling.
    pub fn max_count(&self) -> usize {
        self.config.max_count.min(MAX_WATCHLIST_ITEMS_COUNT)
    }

    pub fn has_reached_limit(&self, favorites: &[Favorite]) -> bool {
        favorites.len() >= self.max_count()
    }

    pub fn snapshot(&self) -> Vec<Favorite> {
        self.favorites.with_state(|state| state.favorites.clone())
    }

    pub fn serialize(favorites: &[Favorite]) -> Vec<SerializedFavorite> {
        favorites.iter().map(Favorite::serialize).collect()
    }

    /// Replace the list with the content of the authoritative store.
    pub async fn restore(&self) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.restore_locked().await
    }

    /// Write the current list to the authoritative store.
    pub async fn persist(&self) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        let favorites = self.snapshot();
        self.persist_locked(&favorites).await
    }

    /// Add `item` in front of the list unless present or the limit is hit.
    pub async fn save_item(
        &self,
        item: PlaylistItem,
    ) -> AccountResult<FavoriteOutcome> {
        let _lock = self.mutation.lock().await;
        self.save_locked(item).await
    }

    pub async fn remove_item(&self, mediaid: &str) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.remove_locked(mediaid).await
    }

    /// Add when absent, remove when present.
    pub async fn toggle_favorite(
        &self,
        item: PlaylistItem,
    ) -> AccountResult<FavoriteOutcome> {
        let _lock = self.mutation.lock().await;
        let present =
            self.favorites.with_state(|state| state.has_item(&item.mediaid));

        if present {
            self.remove_locked(&item.mediaid).await?;
            return Ok(FavoriteOutcome::Removed);
        }

        self.save_locked(item).await
    }

    pub async fn clear(&self) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.favorites.update(|state| {
            state.favorites = Vec::new();
            state.warning = None;
        });
        self.persist_locked(&[]).await
    }

    pub fn clear_warning(&self) {
        self.favorites.update(|state| state.warning = None);
    }

    /// Called right after login: keep the account list when it has entries,
    /// otherwise move the anonymous list into the account.
    pub async fn merge_after_login(
        &self,
        anonymous: Vec<Favorite>,
    ) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        self.restore_locked().await?;

        let remote_empty =
            self.favorites.with_state(|state| state.favorites.is_empty());
        if !remote_empty || anonymous.is_empty() {
            return Ok(());
        }

        let merged = self.capped(anonymous);
        info!(count = merged.len(), "moving anonymous favorites into account");
        self.favorites
            .update(|state| state.favorites = merged.clone());
        self.persist_locked(&merged).await
    }

    /// Called right after registration: the new account adopts the
    /// anonymous list as is.
    pub async fn adopt(&self, anonymous: Vec<Favorite>) -> AccountResult<()> {
        let _lock = self.mutation.lock().await;
        let adopted = self.capped(anonymous);
        self.favorites
            .update(|state| state.favorites = adopted.clone());
        self.persist_locked(&adopted).await
    }

    fn capped(&self, mut favorites: Vec<Favorite>) -> Vec<Favorite> {
        favorites.truncate(self.max_count());
        favorites
    }

    /// On failure the list is emptied so the previous authority's entries
    /// never stay on screen.
    async fn restore_locked(&self) -> AccountResult<()> {
        let Some(playlist_id) = self.config.playlist_id.as_deref() else {
            debug!("favorites list not configured; skipping restore");
            return Ok(());
        };

        let authenticated =
            self.account.with_state(AccountState::is_logged_in);
        let favorites = match self.load(playlist_id).await {
            Ok(favorites) => favorites,
            Err(err) => {
                warn!(error = %err, authenticated, "favorites restore failed; showing an empty list");
                self.favorites.update(|state| {
                    state.favorites = Vec::new();
                    state.playlist_id = Some(playlist_id.to_string());
                });
                return Err(err);
            }
        };

        debug!(count = favorites.len(), authenticated, "favorites restored");
        self.favorites.update(|state| {
            state.favorites = favorites;
            state.playlist_id = Some(playlist_id.to_string());
        });
        Ok(())
    }

    async fn load(&self, playlist_id: &str) -> AccountResult<Vec<Favorite>> {
        let user = self.account.with_state(|state| state.user.clone());
        let saved = match &user {
            Some(user) => self.saved_in_account(user).await?,
            None => self.saved_locally().await?,
        };

        let media_ids: Vec<String> =
            saved.into_iter().map(|fav| fav.mediaid).collect();
        Ok(resolve_media(self.catalog.as_ref(), playlist_id, &media_ids)
            .await?
            .into_iter()
            .map(Favorite::from)
            .collect())
    }

    async fn saved_in_account(
        &self,
        user: &Customer,
    ) -> AccountResult<Vec<SerializedFavorite>> {
        match &self.account_service {
            Some(service) => Ok(service.get_favorites(user).await?),
            None => Ok(user
                .external_data
                .as_ref()
                .and_then(|data| data.favorites.clone())
                .unwrap_or_default()),
        }
    }

    async fn saved_locally(&self) -> AccountResult<Vec<SerializedFavorite>> {
        Ok(self
            .storage
            .get_item(PERSIST_KEY_FAVORITES)
            .await?
            .map(lenient::parse_list)
            .unwrap_or_default())
    }

    async fn save_locked(
        &self,
        item: PlaylistItem,
    ) -> AccountResult<FavoriteOutcome> {
        let current = self.snapshot();

        if current.iter().any(|fav| fav.mediaid == item.mediaid) {
            return Ok(FavoriteOutcome::AlreadyPresent);
        }

        if self.has_reached_limit(&current) {
            let max = self.max_count();
            self.favorites.update(|state| {
                state.warning = Some(FavoritesWarning::LimitReached { max })
            });
            return Ok(FavoriteOutcome::LimitReached { max });
        }

        let mut updated = Vec::with_capacity(current.len() + 1);
        updated.push(Favorite::from(item));
        updated.extend(current);

        self.favorites.update(|state| {
            state.favorites = updated.clone();
            state.warning = None;
        });
        self.persist_locked(&updated).await?;
        Ok(FavoriteOutcome::Added)
    }

    async fn remove_locked(&self, mediaid: &str) -> AccountResult<()> {
        let updated: Vec<Favorite> = self
            .snapshot()
            .into_iter()
            .filter(|fav| fav.mediaid != mediaid)
            .collect();

        self.favorites
            .update(|state| state.favorites = updated.clone());
        self.persist_locked(&updated).await
    }

    async fn persist_locked(&self, favorites: &[Favorite]) -> AccountResult<()> {
        let serialized = Self::serialize(favorites);

        let _write = self.account_writes.acquire().await;
        let user = self.account.with_state(|state| state.user.clone());
        if let (Some(user), Some(service)) = (user, &self.account_service) {
            service.update_favorites(&user, serialized.clone()).await?;
            self.account.update(|state| {
                if let Some(current) = state.user.as_mut()
                    && current.id == user.id
                {
                    current
                        .external_data
                        .get_or_insert_with(Default::default)
                        .favorites = Some(serialized);
                }
            });
            return Ok(());
        }

        let encoded = serde_json::to_string(&serialized).map_err(|source| {
            StorageError::Encode {
                key: PERSIST_KEY_FAVORITES.to_string(),
                source,
            }
        })?;
        self.storage
            .set_item(PERSIST_KEY_FAVORITES, &encoded, true)
            .await?;
        Ok(())
    }
}

//! Personal shelf reconcilers.
//!
//! Exactly one store is authoritative for a shelf at any moment: the
//! provider-side customer record while a customer is signed in, the local
//! preference store otherwise.

mod favorites;
mod watch_history;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use vodkit_contracts::catalog::CatalogService;
use vodkit_contracts::error::ProviderResult;
use vodkit_model::PlaylistItem;

pub use favorites::{FavoriteOutcome, FavoritesController};
pub use watch_history::{SaveProgressOutcome, WatchHistoryController};

/// Provider-independent ceiling for personal shelves.
pub const MAX_WATCHLIST_ITEMS_COUNT: usize = 48;

pub(crate) const PERSIST_KEY_FAVORITES: &str = "favorites";
pub(crate) const PERSIST_KEY_WATCH_HISTORY: &str = "history";

/// Serializes shelf writes into the signed-in customer record.
///
/// Both shelves live in one provider-side document that is written whole,
/// so each write must start from the record the previous one left behind.
#[derive(Debug, Clone, Default)]
pub struct AccountWriteLock(Arc<Mutex<()>>);

impl AccountWriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// Resolve stored media ids against the catalog, keeping the stored order.
///
/// Duplicate ids keep their first occurrence; ids the catalog no longer
/// knows are dropped.
pub(crate) async fn resolve_media(
    catalog: &dyn CatalogService,
    playlist_id: &str,
    media_ids: &[String],
) -> ProviderResult<Vec<PlaylistItem>> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = media_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect();

    if unique.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_id: HashMap<String, PlaylistItem> = catalog
        .get_media_by_watchlist(playlist_id, &unique)
        .await?
        .into_iter()
        .map(|item| (item.mediaid.clone(), item))
        .collect();

    Ok(unique.iter().filter_map(|id| by_id.remove(id)).collect())
}

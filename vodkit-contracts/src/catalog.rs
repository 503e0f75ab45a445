use async_trait::async_trait;
use vodkit_model::PlaylistItem;

use crate::error::ProviderResult;

/// Content catalog used to resolve personal shelf references.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch the current items of `playlist_id` restricted to `media_ids`.
    ///
    /// Ids that no longer resolve are absent from the result. The returned
    /// order is unspecified.
    async fn get_media_by_watchlist(
        &self,
        playlist_id: &str,
        media_ids: &[String],
    ) -> ProviderResult<Vec<PlaylistItem>>;
}

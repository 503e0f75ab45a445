use serde::{Deserialize, Serialize};

use crate::playlist::PlaylistItem;

/// Last viewed position of one media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryItem {
    pub mediaid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    /// Fractional position in `0.0..=1.0`
    pub progress: f64,
    pub playlist_item: PlaylistItem,
}

impl WatchHistoryItem {
    pub fn new(item: PlaylistItem, series_id: Option<String>, progress: f64) -> Self {
        Self {
            mediaid: item.mediaid.clone(),
            series_id,
            progress: progress.clamp(0.0, 1.0),
            playlist_item: item,
        }
    }

    pub fn serialize(&self) -> SerializedWatchHistoryItem {
        SerializedWatchHistoryItem {
            mediaid: self.mediaid.clone(),
            progress: self.progress,
            series_id: self.series_id.clone(),
        }
    }
}

/// Storage and wire projection of a [`WatchHistoryItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedWatchHistoryItem {
    pub mediaid: String,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
}

use serde::{Deserialize, Serialize};

use crate::playlist::PlaylistItem;

/// Denormalized favorite entry. `mediaid` is the identity, everything else
/// is a point-in-time copy of catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub mediaid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default)]
    pub duration: f64,
    pub playlist_item: PlaylistItem,
}

impl Favorite {
    pub fn serialize(&self) -> SerializedFavorite {
        SerializedFavorite {
            mediaid: self.mediaid.clone(),
        }
    }
}

impl From<PlaylistItem> for Favorite {
    fn from(item: PlaylistItem) -> Self {
        Self {
            mediaid: item.mediaid.clone(),
            title: item.title.clone(),
            tags: item.tags.clone(),
            duration: item.duration,
            playlist_item: item,
        }
    }
}

/// Storage and wire projection of a [`Favorite`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializedFavorite {
    pub mediaid: String,
}

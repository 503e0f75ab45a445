//! Application configuration consumed once at startup.

mod loader;

use serde::{Deserialize, Serialize};
use vodkit_model::IntegrationType;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, EnvConfig};

use crate::shelves::MAX_WATCHLIST_ITEMS_COUNT;
use crate::storage::DEFAULT_PREFIX;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Active provider; `None` runs without accounts.
    pub integration: Option<IntegrationType>,
    pub storage_prefix: String,
    pub features: FeaturesConfig,
    pub favorites: ShelfLimits,
    pub watch_history: ShelfLimits,
    pub integrations: IntegrationsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            integration: None,
            storage_prefix: DEFAULT_PREFIX.to_string(),
            features: FeaturesConfig::default(),
            favorites: ShelfLimits::default(),
            watch_history: ShelfLimits::default(),
            integrations: IntegrationsConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn favorites_shelf(&self) -> ShelfConfig {
        ShelfConfig {
            playlist_id: self.features.favorites_list.clone(),
            max_count: self.favorites.max_count,
        }
    }

    pub fn watch_history_shelf(&self) -> ShelfConfig {
        ShelfConfig {
            playlist_id: self.features.continue_watching_list.clone(),
            max_count: self.watch_history.max_count,
        }
    }

    /// Sandbox flag of the selected integration.
    pub fn use_sandbox(&self) -> bool {
        match self.integration {
            Some(IntegrationType::Cleeng) => self
                .integrations
                .cleeng
                .as_ref()
                .is_some_and(|cfg| cfg.use_sandbox),
            Some(IntegrationType::InPlayer) => self
                .integrations
                .inplayer
                .as_ref()
                .is_some_and(|cfg| cfg.use_sandbox),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Playlist backing the favorites shelf
    pub favorites_list: Option<String>,
    /// Playlist backing the continue watching shelf
    pub continue_watching_list: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfLimits {
    pub max_count: usize,
}

impl Default for ShelfLimits {
    fn default() -> Self {
        Self {
            max_count: MAX_WATCHLIST_ITEMS_COUNT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub cleeng: Option<CleengConfig>,
    #[serde(alias = "jwp")]
    pub inplayer: Option<InPlayerConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleengConfig {
    pub publisher_id: String,
    pub monthly_offer: Option<String>,
    pub yearly_offer: Option<String>,
    pub use_sandbox: bool,
}

impl CleengConfig {
    pub fn svod_offer_ids(&self) -> Vec<String> {
        [&self.monthly_offer, &self.yearly_offer]
            .into_iter()
            .flatten()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InPlayerConfig {
    pub client_id: String,
    pub asset_id: Option<i64>,
    pub use_sandbox: bool,
}

/// Shelf settings handed to a reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfConfig {
    pub playlist_id: Option<String>,
    pub max_count: usize,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            playlist_id: None,
            max_count: MAX_WATCHLIST_ITEMS_COUNT,
        }
    }
}

//! Wires the stores, reconcilers and the bound provider into one
//! application instance.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};
use vodkit_contracts::catalog::CatalogService;
use vodkit_contracts::features::{AccountServiceFeatures, DEFAULT_FEATURES};
use vodkit_contracts::storage::PreferenceStore;

use crate::config::AppConfig;
use crate::error::{AccountError, AccountResult};
use crate::fanout::settle_all;
use crate::registry::{IntegrationError, IntegrationServices, Integrations};
use crate::session::{AccountController, EntitlementsHook, ProfileController};
use crate::shelves::{
    AccountWriteLock, FavoritesController, WatchHistoryController,
};
use crate::state::{AccountState, AppStores};

/// One application instance. Everything is constructed here; nothing is
/// global.
#[derive(Clone)]
pub struct VodkitApp {
    config: AppConfig,
    stores: AppStores,
    storage: Arc<dyn PreferenceStore>,
    favorites: FavoritesController,
    watch_history: WatchHistoryController,
    profiles: ProfileController,
    account: Option<AccountController>,
}

impl std::fmt::Debug for VodkitApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VodkitApp")
            .field("integration", &self.config.integration)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl VodkitApp {
    pub fn new(
        config: AppConfig,
        integrations: &Integrations,
        catalog: Arc<dyn CatalogService>,
    ) -> Result<Self, IntegrationError> {
        let services = integrations.build(&config)?;
        Ok(Self::with_services(
            config,
            services,
            integrations.storage(),
            catalog,
        ))
    }

    /// Wire an instance around already bound services.
    pub fn with_services(
        config: AppConfig,
        services: Option<IntegrationServices>,
        storage: Arc<dyn PreferenceStore>,
        catalog: Arc<dyn CatalogService>,
    ) -> Self {
        let stores = AppStores::new();
        let account_service = services.as_ref().map(|s| Arc::clone(&s.account));
        let account_writes = AccountWriteLock::new();

        let favorites = FavoritesController::new(
            stores.account.clone(),
            stores.favorites.clone(),
            account_service.clone(),
            Arc::clone(&catalog),
            Arc::clone(&storage),
            config.favorites_shelf(),
            account_writes.clone(),
        );
        let watch_history = WatchHistoryController::new(
            stores.account.clone(),
            stores.watch_history.clone(),
            account_service,
            catalog,
            Arc::clone(&storage),
            config.watch_history_shelf(),
            account_writes,
        );
        let profiles =
            ProfileController::new(stores.profile.clone(), Arc::clone(&storage));

        let account = services.map(|services| {
            AccountController::new(
                services,
                stores.clone(),
                favorites.clone(),
                watch_history.clone(),
                profiles.clone(),
            )
        });

        Self {
            config,
            stores,
            storage,
            favorites,
            watch_history,
            profiles,
            account,
        }
    }

    /// Startup sequence: namespace the preference store, bring up the
    /// provider and its stored session, then show the anonymous shelves if
    /// nobody is signed in.
    pub async fn initialize(
        &self,
        restore_url: Option<&str>,
        entitlements_hook: Option<EntitlementsHook>,
    ) -> AccountResult<()> {
        self.storage.initialize(&self.config.storage_prefix).await?;

        if let Some(account) = &self.account {
            account.initialize(restore_url, entitlements_hook).await?;
        } else if let Err(err) = self.profiles.load_persisted_profile().await {
            warn!(error = %err, "failed to load persisted profile");
        }

        if !self.stores.account.with_state(AccountState::is_logged_in) {
            settle_all(
                "initial shelves",
                vec![
                    ("favorites", self.favorites.restore().boxed()),
                    ("watch history", self.watch_history.restore().boxed()),
                ],
            )
            .await;
        }

        info!(
            integration = ?self.config.integration,
            prefix = %self.config.storage_prefix,
            "application initialized"
        );
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stores(&self) -> &AppStores {
        &self.stores
    }

    /// `None` when no integration is configured.
    pub fn account(&self) -> Option<&AccountController> {
        self.account.as_ref()
    }

    pub fn require_account(&self) -> AccountResult<&AccountController> {
        self.account.as_ref().ok_or(AccountError::IntegrationMissing)
    }

    pub fn favorites(&self) -> &FavoritesController {
        &self.favorites
    }

    pub fn watch_history(&self) -> &WatchHistoryController {
        &self.watch_history
    }

    pub fn profiles(&self) -> &ProfileController {
        &self.profiles
    }

    pub fn features(&self) -> AccountServiceFeatures {
        self.account
            .as_ref()
            .map_or(DEFAULT_FEATURES, AccountController::features)
    }
}

//! Binds the configured provider to the three capability contracts once at
//! startup.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use vodkit_contracts::account::AccountService;
use vodkit_contracts::checkout::CheckoutService;
use vodkit_contracts::error::ProviderError;
use vodkit_contracts::storage::PreferenceStore;
use vodkit_contracts::subscription::SubscriptionService;
use vodkit_model::IntegrationType;

use crate::config::{AppConfig, CleengConfig, InPlayerConfig};
use crate::providers::cleeng::{
    CleengAccountService, CleengCheckoutService, CleengClient,
    CleengSubscriptionService, CleengTransport, HttpCleengTransport,
};
use crate::providers::inplayer::{
    InPlayerAccountService, InPlayerCheckoutService, InPlayerSdk,
    InPlayerSubscriptionService,
};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{0} integration selected without its configuration block")]
    MissingConfig(IntegrationType),

    #[error("InPlayer integration requires an SDK binding")]
    MissingSdk,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// The provider services bound for this process.
#[derive(Clone)]
pub struct IntegrationServices {
    pub integration: IntegrationType,
    pub account: Arc<dyn AccountService>,
    pub checkout: Arc<dyn CheckoutService>,
    pub subscription: Arc<dyn SubscriptionService>,
}

impl std::fmt::Debug for IntegrationServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationServices")
            .field("integration", &self.integration)
            .field("account", &"<AccountService>")
            .field("checkout", &"<CheckoutService>")
            .field("subscription", &"<SubscriptionService>")
            .finish()
    }
}

/// Collaborators the provider adapters are built from.
///
/// The Cleeng adapter falls back to [`HttpCleengTransport`]; the InPlayer
/// adapter needs an SDK binding from the host.
#[derive(Clone)]
pub struct Integrations {
    storage: Arc<dyn PreferenceStore>,
    cleeng_transport: Option<Arc<dyn CleengTransport>>,
    inplayer_sdk: Option<Arc<dyn InPlayerSdk>>,
}

impl std::fmt::Debug for Integrations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrations")
            .field("has_cleeng_transport", &self.cleeng_transport.is_some())
            .field("has_inplayer_sdk", &self.inplayer_sdk.is_some())
            .finish_non_exhaustive()
    }
}

impl Integrations {
    pub fn new(storage: Arc<dyn PreferenceStore>) -> Self {
        Self {
            storage,
            cleeng_transport: None,
            inplayer_sdk: None,
        }
    }

    pub fn with_cleeng_transport(
        mut self,
        transport: Arc<dyn CleengTransport>,
    ) -> Self {
        self.cleeng_transport = Some(transport);
        self
    }

    pub fn with_inplayer_sdk(mut self, sdk: Arc<dyn InPlayerSdk>) -> Self {
        self.inplayer_sdk = Some(sdk);
        self
    }

    pub fn storage(&self) -> Arc<dyn PreferenceStore> {
        Arc::clone(&self.storage)
    }

    /// Services for the configured integration; `None` when accounts are
    /// disabled.
    pub fn build(
        &self,
        config: &AppConfig,
    ) -> Result<Option<IntegrationServices>, IntegrationError> {
        let Some(integration) = config.integration else {
            info!("no integration configured; running without accounts");
            return Ok(None);
        };

        let services = match integration {
            IntegrationType::Cleeng => {
                let cleeng = config
                    .integrations
                    .cleeng
                    .as_ref()
                    .ok_or(IntegrationError::MissingConfig(integration))?;
                self.cleeng(cleeng)?
            }
            IntegrationType::InPlayer => {
                let inplayer = config
                    .integrations
                    .inplayer
                    .as_ref()
                    .ok_or(IntegrationError::MissingConfig(integration))?;
                self.inplayer(inplayer)?
            }
        };

        info!(%integration, "integration bound");
        Ok(Some(services))
    }

    fn cleeng(
        &self,
        config: &CleengConfig,
    ) -> Result<IntegrationServices, IntegrationError> {
        let transport: Arc<dyn CleengTransport> = match &self.cleeng_transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(HttpCleengTransport::new()?),
        };
        let client = Arc::new(CleengClient::new(
            transport,
            Arc::clone(&self.storage),
            config.use_sandbox,
        ));

        Ok(IntegrationServices {
            integration: IntegrationType::Cleeng,
            account: Arc::new(CleengAccountService::new(
                Arc::clone(&client),
                config.clone(),
            )),
            checkout: Arc::new(CleengCheckoutService::new(Arc::clone(&client))),
            subscription: Arc::new(CleengSubscriptionService::new(client)),
        })
    }

    fn inplayer(
        &self,
        config: &InPlayerConfig,
    ) -> Result<IntegrationServices, IntegrationError> {
        let sdk = self
            .inplayer_sdk
            .clone()
            .ok_or(IntegrationError::MissingSdk)?;

        Ok(IntegrationServices {
            integration: IntegrationType::InPlayer,
            account: Arc::new(InPlayerAccountService::new(
                Arc::clone(&sdk),
                config.clone(),
            )),
            checkout: Arc::new(InPlayerCheckoutService::new(
                Arc::clone(&sdk),
                config.clone(),
            )),
            subscription: Arc::new(InPlayerSubscriptionService::new(
                sdk,
                config.clone(),
            )),
        })
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;
use vodkit_contracts::checkout::{
    CheckoutService, CreateOrderArgs, SwitchSubscriptionArgs,
};
use vodkit_contracts::error::{ProviderError, ProviderResult};
use vodkit_model::{
    Entitlement, Offer, Order, PaymentMethod, ServiceResponse,
    SubscriptionSwitch,
};

use super::sdk::{AccessFeeRecord, InPlayerSdk};
use crate::config::InPlayerConfig;

/// Prefix of offer ids built from subscription access fees.
pub(crate) const SUBSCRIPTION_PREFIX: char = 'S';
/// Prefix of offer ids built from one-off (pay per view) access fees.
pub(crate) const PURCHASE_PREFIX: char = 'C';

pub(crate) fn offer_id(fee: &AccessFeeRecord) -> String {
    let prefix = if fee.is_subscription() {
        SUBSCRIPTION_PREFIX
    } else {
        PURCHASE_PREFIX
    };
    format!("{prefix}{}", fee.id)
}

/// Access fee id behind an offer id (`S123` or plain `123`).
pub(crate) fn access_fee_id(offer_id: &str) -> ProviderResult<i64> {
    offer_id
        .trim_start_matches([SUBSCRIPTION_PREFIX, PURCHASE_PREFIX])
        .parse()
        .map_err(|_| ProviderError::Unexpected(format!("Invalid offer id {offer_id}")))
}

fn format_offer(fee: AccessFeeRecord) -> Offer {
    Offer {
        offer_id: offer_id(&fee),
        offer_title: fee.description.clone(),
        offer_price: fee.amount,
        offer_currency: fee.currency,
        period: fee.period,
        free_days: fee.trial_days,
        description: Some(fee.description),
    }
}

/// Offers are the access fees of the configured asset.
pub struct InPlayerCheckoutService {
    sdk: Arc<dyn InPlayerSdk>,
    config: InPlayerConfig,
}

impl std::fmt::Debug for InPlayerCheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InPlayerCheckoutService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InPlayerCheckoutService {
    pub fn new(sdk: Arc<dyn InPlayerSdk>, config: InPlayerConfig) -> Self {
        Self { sdk, config }
    }

    /// Asset guarding `offer_id`: the id itself when numeric, the configured
    /// asset for access fee ids.
    fn asset_for(&self, offer_id: &str) -> ProviderResult<i64> {
        if let Ok(asset_id) = offer_id.parse() {
            return Ok(asset_id);
        }
        self.config.asset_id.ok_or_else(|| {
            ProviderError::Configuration(format!(
                "No asset configured for offer {offer_id}"
            ))
        })
    }
}

#[async_trait]
impl CheckoutService for InPlayerCheckoutService {
    async fn get_offers(&self, offer_ids: &[String]) -> ProviderResult<Vec<Offer>> {
        let fees = try_join_all(offer_ids.iter().map(|id| async move {
            let asset_id = self.asset_for(id)?;
            Ok::<_, ProviderError>(self.sdk.get_asset_access_fees(asset_id).await?)
        }))
        .await?;

        Ok(fees.into_iter().flatten().map(format_offer).collect())
    }

    async fn get_entitlements(
        &self,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Entitlement>> {
        let asset_id = self.asset_for(offer_id)?;

        match self.sdk.check_access_for_asset(asset_id).await {
            Ok(access) => Ok(ServiceResponse::ok(Entitlement {
                access_granted: true,
                expires_at: access.expires_at,
            })),
            Err(err) if err.is_rejection() => {
                debug!(asset_id, status = err.status, "no access to asset");
                Ok(ServiceResponse::ok(Entitlement::default()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_subscription_switches(
        &self,
        _customer_id: &str,
        _offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<SubscriptionSwitch>>> {
        Ok(ServiceResponse::ok(Vec::new()))
    }

    async fn switch_subscription(
        &self,
        _args: SwitchSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<String>> {
        Err(ProviderError::OperationUnavailable("switchSubscription"))
    }

    /// Orders are settled by the SDK's payment flow, so the order is only
    /// assembled locally.
    async fn create_order(
        &self,
        args: CreateOrderArgs,
    ) -> ProviderResult<ServiceResponse<Option<Order>>> {
        let id = access_fee_id(&args.offer.offer_id)?;

        Ok(ServiceResponse::ok(Some(Order {
            id,
            customer_id: args.customer_id,
            offer_id: args.offer.offer_id,
            total_price: args.offer.offer_price,
            currency: args.offer.offer_currency,
            requires_payment_details: true,
        })))
    }

    async fn get_payment_methods(
        &self,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentMethod>>> {
        let methods = self.sdk.get_payment_methods().await?;

        Ok(ServiceResponse::ok(
            methods
                .into_iter()
                .map(|method| PaymentMethod {
                    id: method.id,
                    payment_gateway: method.method_name.to_lowercase(),
                    method_name: method.method_name,
                })
                .collect(),
        ))
    }

    async fn delete_payment_method(
        &self,
        _payment_details_id: i64,
    ) -> ProviderResult<ServiceResponse<()>> {
        Err(ProviderError::OperationUnavailable("deletePaymentMethod"))
    }
}

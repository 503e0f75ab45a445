//! Checkout contract.

use async_trait::async_trait;
use vodkit_model::{
    Entitlement, Offer, Order, PaymentMethod, ServiceResponse,
    SubscriptionSwitch,
};

use crate::error::{ProviderError, ProviderResult};
use crate::features::CheckoutOperation;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderArgs {
    pub offer: Offer,
    pub customer_id: String,
    pub country: String,
    pub customer_ip: Option<String>,
    pub payment_method_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchSubscriptionArgs {
    pub customer_id: String,
    pub offer_id: String,
    pub to_offer_id: String,
    pub switch_direction: String,
}

#[async_trait]
pub trait CheckoutService: Send + Sync {
    fn supports(&self, _operation: CheckoutOperation) -> bool {
        false
    }

    /// Fails as a whole when any single offer cannot be resolved.
    async fn get_offers(&self, offer_ids: &[String]) -> ProviderResult<Vec<Offer>>;

    async fn get_entitlements(
        &self,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Entitlement>>;

    async fn get_subscription_switches(
        &self,
        customer_id: &str,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<SubscriptionSwitch>>>;

    async fn switch_subscription(
        &self,
        args: SwitchSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<String>>;

    async fn create_order(
        &self,
        args: CreateOrderArgs,
    ) -> ProviderResult<ServiceResponse<Option<Order>>>;

    async fn get_payment_methods(
        &self,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentMethod>>>;

    async fn delete_payment_method(
        &self,
        payment_details_id: i64,
    ) -> ProviderResult<ServiceResponse<()>>;

    async fn get_offer(
        &self,
        _offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Option<Offer>>> {
        Err(ProviderError::OperationUnavailable(
            CheckoutOperation::GetOffer.name(),
        ))
    }

    async fn get_subscription_switch(
        &self,
        _switch_id: &str,
    ) -> ProviderResult<ServiceResponse<Option<SubscriptionSwitch>>> {
        Err(ProviderError::OperationUnavailable(
            CheckoutOperation::GetSubscriptionSwitch.name(),
        ))
    }
}

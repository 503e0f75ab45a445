//! Subscription contract.

use async_trait::async_trait;
use vodkit_model::{
    PaymentDetail, ServiceResponse, Subscription, SubscriptionStatus,
    Transaction,
};

use crate::error::{ProviderError, ProviderResult};
use crate::features::SubscriptionOperation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSubscriptionArgs {
    pub customer_id: String,
    pub offer_id: String,
    pub status: SubscriptionStatus,
    pub unsubscribe_url: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct UpdateCardDetailsArgs {
    pub card_name: String,
    pub card_number: String,
    pub cvc: u16,
    pub exp_month: u8,
    pub exp_year: u16,
    pub currency: String,
}

impl std::fmt::Debug for UpdateCardDetailsArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCardDetailsArgs")
            .field("card_name", &self.card_name)
            .field("card_number", &"<redacted>")
            .field("currency", &self.currency)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSubscriptionArgs {
    pub access_fee_id: String,
    pub subscription_id: String,
}

#[async_trait]
pub trait SubscriptionService: Send + Sync {
    fn supports(&self, _operation: SubscriptionOperation) -> bool {
        false
    }

    /// First subscription that still grants access, if any.
    async fn get_active_subscription(
        &self,
        customer_id: &str,
    ) -> ProviderResult<Option<Subscription>>;

    async fn get_all_transactions(
        &self,
        customer_id: &str,
    ) -> ProviderResult<Option<Vec<Transaction>>>;

    async fn get_active_payment(
        &self,
        customer_id: &str,
    ) -> ProviderResult<Option<PaymentDetail>>;

    async fn get_subscriptions(
        &self,
        customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<Subscription>>>;

    async fn update_subscription(
        &self,
        args: UpdateSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<Option<Subscription>>>;

    async fn get_payment_details(
        &self,
        customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentDetail>>>;

    async fn get_transactions(
        &self,
        customer_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ProviderResult<ServiceResponse<Vec<Transaction>>>;

    /// Receipt document (HTML) for one transaction.
    async fn fetch_receipt(
        &self,
        _transaction_id: &str,
    ) -> ProviderResult<ServiceResponse<String>> {
        Err(ProviderError::OperationUnavailable(
            SubscriptionOperation::FetchReceipt.name(),
        ))
    }

    async fn update_card_details(
        &self,
        _args: UpdateCardDetailsArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        Err(ProviderError::OperationUnavailable(
            SubscriptionOperation::UpdateCardDetails.name(),
        ))
    }

    async fn change_subscription(
        &self,
        _args: ChangeSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<String>> {
        Err(ProviderError::OperationUnavailable(
            SubscriptionOperation::ChangeSubscription.name(),
        ))
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{Value, json};
use vodkit_contracts::checkout::{
    CheckoutService, CreateOrderArgs, SwitchSubscriptionArgs,
};
use vodkit_contracts::error::{ProviderError, ProviderResult};
use vodkit_contracts::features::CheckoutOperation;
use vodkit_model::lenient;
use vodkit_model::{
    Entitlement, Offer, Order, PaymentMethod, ServiceResponse,
    SubscriptionSwitch,
};

use super::client::{CleengClient, require_ok};

#[derive(Debug, Default, Deserialize)]
struct SwitchAvailability {
    #[serde(default)]
    available: Value,
}

#[derive(Debug, Default, Deserialize)]
struct OrderEnvelope {
    #[serde(default)]
    order: Option<Order>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentMethods {
    #[serde(default)]
    payment_methods: Value,
}

#[derive(Debug, Default, Deserialize)]
struct Locales {
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug)]
pub struct CleengCheckoutService {
    client: Arc<CleengClient>,
}

impl CleengCheckoutService {
    pub fn new(client: Arc<CleengClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckoutService for CleengCheckoutService {
    fn supports(&self, operation: CheckoutOperation) -> bool {
        matches!(
            operation,
            CheckoutOperation::GetOffer | CheckoutOperation::GetSubscriptionSwitch
        )
    }

    async fn get_offers(&self, offer_ids: &[String]) -> ProviderResult<Vec<Offer>> {
        try_join_all(offer_ids.iter().map(|offer_id| async move {
            let response = self.get_offer(offer_id).await?;
            require_ok(response)?.ok_or_else(|| {
                ProviderError::Unexpected(format!("Offer {offer_id} not found"))
            })
        }))
        .await
    }

    async fn get_offer(
        &self,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Option<Offer>>> {
        self.client.get(format!("/offers/{offer_id}"), false).await
    }

    async fn get_entitlements(
        &self,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Entitlement>> {
        self.client
            .get(format!("/entitlements/{offer_id}"), true)
            .await
    }

    async fn get_subscription_switches(
        &self,
        customer_id: &str,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<SubscriptionSwitch>>> {
        let response = self
            .client
            .get::<SwitchAvailability>(
                format!(
                    "/customers/{customer_id}/subscription_switches/{offer_id}/availability"
                ),
                true,
            )
            .await?;

        Ok(response.map(|availability| {
            lenient::parse_list::<SubscriptionSwitch>(availability.available)
                .into_iter()
                .map(|switch| SubscriptionSwitch {
                    from_offer_id: offer_id.to_string(),
                    ..switch
                })
                .collect()
        }))
    }

    async fn get_subscription_switch(
        &self,
        switch_id: &str,
    ) -> ProviderResult<ServiceResponse<Option<SubscriptionSwitch>>> {
        self.client
            .get(format!("/subscription_switches/{switch_id}"), true)
            .await
    }

    async fn switch_subscription(
        &self,
        args: SwitchSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<String>> {
        let body = json!({
            "toOfferId": args.to_offer_id,
            "switchDirection": args.switch_direction,
        });
        let response = self
            .client
            .post::<Value>(
                format!(
                    "/customers/{}/subscription_switches/{}",
                    args.customer_id, args.offer_id
                ),
                body,
                true,
            )
            .await?;

        Ok(response.map(|data| {
            data.get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        }))
    }

    async fn create_order(
        &self,
        args: CreateOrderArgs,
    ) -> ProviderResult<ServiceResponse<Option<Order>>> {
        let locales = require_ok(self.client.get::<Locales>("/locales", false).await?)?;

        let body = json!({
            "offerId": args.offer.offer_id,
            "customerId": args.customer_id,
            "country": args.country,
            "currency": locales.currency.unwrap_or_else(|| "EUR".to_string()),
            "customerIP": args.customer_ip,
            "paymentMethodId": args.payment_method_id,
        });
        let response = self
            .client
            .post::<OrderEnvelope>("/orders", body, true)
            .await?;
        Ok(response.map(|envelope| envelope.order))
    }

    async fn get_payment_methods(
        &self,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentMethod>>> {
        let response = self
            .client
            .get::<PaymentMethods>("/payment-methods", true)
            .await?;
        Ok(response.map(|methods| lenient::parse_list(methods.payment_methods)))
    }

    async fn delete_payment_method(
        &self,
        payment_details_id: i64,
    ) -> ProviderResult<ServiceResponse<()>> {
        let response = self
            .client
            .remove::<Value>(format!("/payment_details/{payment_details_id}"), true)
            .await?;
        Ok(response.map(|_| ()))
    }
}

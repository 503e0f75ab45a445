use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::form_urlencoded;
use vodkit_contracts::error::ProviderResult;
use vodkit_contracts::features::SubscriptionOperation;
use vodkit_contracts::subscription::{
    SubscriptionService, UpdateSubscriptionArgs,
};
use vodkit_model::lenient;
use vodkit_model::{
    PaymentDetail, ServiceResponse, Subscription, SubscriptionStatus,
    Transaction,
};

use super::client::CleengClient;

#[derive(Debug, Default, Deserialize)]
struct Items {
    #[serde(default)]
    items: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentDetails {
    #[serde(default)]
    payment_details: Value,
}

fn status_name(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::Cancelled => "cancelled",
        SubscriptionStatus::Expired => "expired",
        SubscriptionStatus::Terminated => "terminated",
    }
}

#[derive(Debug)]
pub struct CleengSubscriptionService {
    client: Arc<CleengClient>,
}

impl CleengSubscriptionService {
    pub fn new(client: Arc<CleengClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionService for CleengSubscriptionService {
    fn supports(&self, operation: SubscriptionOperation) -> bool {
        matches!(operation, SubscriptionOperation::FetchReceipt)
    }

    async fn get_active_subscription(
        &self,
        customer_id: &str,
    ) -> ProviderResult<Option<Subscription>> {
        let response = self.get_subscriptions(customer_id).await?;
        if !response.is_ok() {
            debug!(errors = ?response.errors, "subscriptions unavailable");
            return Ok(None);
        }

        Ok(response
            .response_data
            .into_iter()
            .find(Subscription::is_current))
    }

    async fn get_all_transactions(
        &self,
        customer_id: &str,
    ) -> ProviderResult<Option<Vec<Transaction>>> {
        let response = self.get_transactions(customer_id, None, None).await?;
        Ok(response.is_ok().then_some(response.response_data))
    }

    async fn get_active_payment(
        &self,
        customer_id: &str,
    ) -> ProviderResult<Option<PaymentDetail>> {
        let response = self.get_payment_details(customer_id).await?;
        if !response.is_ok() {
            return Ok(None);
        }

        Ok(response
            .response_data
            .into_iter()
            .find(|detail| detail.active))
    }

    async fn get_subscriptions(
        &self,
        customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<Subscription>>> {
        let response = self
            .client
            .get::<Items>(format!("/customers/{customer_id}/subscriptions"), true)
            .await?;
        Ok(response.map(|page| lenient::parse_list(page.items)))
    }

    async fn update_subscription(
        &self,
        args: UpdateSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<Option<Subscription>>> {
        let body = json!({
            "customerId": args.customer_id,
            "offerId": args.offer_id,
            "status": status_name(args.status),
        });
        let response = self
            .client
            .patch::<Value>(
                format!("/customers/{}/subscriptions", args.customer_id),
                body,
                true,
            )
            .await?;
        Ok(response.map(|data| serde_json::from_value(data).ok()))
    }

    async fn get_payment_details(
        &self,
        customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentDetail>>> {
        let response = self
            .client
            .get::<PaymentDetails>(
                format!("/customers/{customer_id}/payment_details"),
                true,
            )
            .await?;
        Ok(response.map(|details| lenient::parse_list(details.payment_details)))
    }

    async fn get_transactions(
        &self,
        customer_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ProviderResult<ServiceResponse<Vec<Transaction>>> {
        let query = {
            let mut query = form_urlencoded::Serializer::new(String::new());
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = offset {
                query.append_pair("offset", &offset.to_string());
            }
            query.finish()
        };

        let mut path = format!("/customers/{customer_id}/transactions");
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }

        let response = self.client.get::<Items>(path, true).await?;
        Ok(response.map(|page| lenient::parse_list(page.items)))
    }

    async fn fetch_receipt(
        &self,
        transaction_id: &str,
    ) -> ProviderResult<ServiceResponse<String>> {
        self.client
            .get(format!("/receipt/{transaction_id}"), true)
            .await
    }
}

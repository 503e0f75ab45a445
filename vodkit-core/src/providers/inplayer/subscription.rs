use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use vodkit_contracts::error::{ProviderError, ProviderResult};
use vodkit_contracts::features::SubscriptionOperation;
use vodkit_contracts::subscription::{
    ChangeSubscriptionArgs, SubscriptionService, UpdateCardDetailsArgs,
    UpdateSubscriptionArgs,
};
use vodkit_model::{
    PaymentDetail, ServiceResponse, Subscription, SubscriptionStatus,
    Transaction,
};

use super::checkout::{PURCHASE_PREFIX, SUBSCRIPTION_PREFIX, access_fee_id};
use super::sdk::{
    CardDetails, CardRecord, InPlayerSdk, PaymentHistoryRecord, SdkError,
    SubscriptionRecord,
};
use crate::config::InPlayerConfig;

fn subscription_status(action_type: &str) -> SubscriptionStatus {
    match action_type {
        "recurrent" | "active" => SubscriptionStatus::Active,
        "canceled" | "cancelled" => SubscriptionStatus::Cancelled,
        "free" | "ended" | "expired" => SubscriptionStatus::Expired,
        _ => SubscriptionStatus::Terminated,
    }
}

fn format_subscription(record: SubscriptionRecord) -> Subscription {
    let offer_id = match record.access_fee_id {
        Some(fee_id) => format!("{SUBSCRIPTION_PREFIX}{fee_id}"),
        None => record.item_id.to_string(),
    };

    Subscription {
        subscription_id: record.id,
        offer_id,
        status: subscription_status(&record.action_type),
        expires_at: record.next_billing_date,
        offer_title: record.item_title,
        total_price: record.charged_amount,
        next_payment_price: record.next_rebill_amount,
        next_payment_currency: record.currency,
        payment_gateway: "inplayer".to_string(),
        payment_method: record.payment_method_name,
        period: record.period,
        unsubscribe_url: record.unsubscribe_url,
        pending_switch_id: None,
    }
}

fn format_transaction(record: PaymentHistoryRecord) -> Transaction {
    Transaction {
        transaction_id: record.transaction_token,
        transaction_date: record.created_at,
        offer_id: format!("{PURCHASE_PREFIX}{}", record.item_id),
        offer_type: record.item_type,
        offer_title: record.item_title,
        payment_method: record.payment_method_name,
        transaction_price_incl_tax: record.charged_amount,
        transaction_currency: record.currency_iso,
        external_payment_id: None,
    }
}

fn format_card(card: CardRecord) -> PaymentDetail {
    let params = BTreeMap::from([
        ("holderName".to_string(), json!(card.card_name)),
        (
            "cardExpirationDate".to_string(),
            json!(format!("{}/{}", card.exp_month, card.exp_year)),
        ),
        ("lastCardFourDigits".to_string(), json!(card.number)),
        ("variant".to_string(), json!(card.card_type)),
    ]);

    PaymentDetail {
        id: card.id,
        payment_gateway: "card".to_string(),
        payment_method: "card".to_string(),
        payment_method_specific_params: params,
        active: true,
    }
}

fn reject_or_fail<T>(err: SdkError, fallback: T) -> ProviderResult<ServiceResponse<T>> {
    if err.is_rejection() {
        Ok(ServiceResponse::failed(fallback, vec![err.message]))
    } else {
        Err(err.into())
    }
}

/// Subscriptions, payment history and the default card of the signed-in
/// InPlayer account. Customer ids are implied by the SDK session.
pub struct InPlayerSubscriptionService {
    sdk: Arc<dyn InPlayerSdk>,
    config: InPlayerConfig,
}

impl std::fmt::Debug for InPlayerSubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InPlayerSubscriptionService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InPlayerSubscriptionService {
    pub fn new(sdk: Arc<dyn InPlayerSdk>, config: InPlayerConfig) -> Self {
        Self { sdk, config }
    }
}

#[async_trait]
impl SubscriptionService for InPlayerSubscriptionService {
    fn supports(&self, _operation: SubscriptionOperation) -> bool {
        true
    }

    async fn get_active_subscription(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<Subscription>> {
        let records = match self.sdk.get_subscriptions().await {
            Ok(records) => records,
            Err(err) if err.is_rejection() => {
                debug!(status = err.status, "no subscriptions for account");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        Ok(records
            .into_iter()
            .filter(|record| {
                self.config
                    .asset_id
                    .is_none_or(|asset_id| record.item_id == asset_id)
            })
            .map(format_subscription)
            .find(Subscription::is_current))
    }

    async fn get_all_transactions(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<Vec<Transaction>>> {
        match self.sdk.get_payment_history().await {
            Ok(records) => Ok(Some(records.into_iter().map(format_transaction).collect())),
            Err(err) if err.is_rejection() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_active_payment(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<PaymentDetail>> {
        match self.sdk.get_default_card().await {
            Ok(card) => Ok(card.map(format_card)),
            Err(err) if err.is_rejection() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_subscriptions(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<Subscription>>> {
        match self.sdk.get_subscriptions().await {
            Ok(records) => Ok(ServiceResponse::ok(
                records.into_iter().map(format_subscription).collect(),
            )),
            Err(err) => reject_or_fail(err, Vec::new()),
        }
    }

    /// Only cancellation is available; it goes through the subscription's
    /// unsubscribe URL.
    async fn update_subscription(
        &self,
        args: UpdateSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<Option<Subscription>>> {
        match args.status {
            SubscriptionStatus::Cancelled => {
                let url = args.unsubscribe_url.ok_or_else(|| {
                    ProviderError::Unexpected(
                        "Missing unsubscribe url".to_string(),
                    )
                })?;
                match self.sdk.cancel_subscription(&url).await {
                    Ok(()) => Ok(ServiceResponse::ok(None)),
                    Err(err) => reject_or_fail(err, None),
                }
            }
            SubscriptionStatus::Active => {
                Err(ProviderError::OperationUnavailable("renewSubscription"))
            }
            other => Ok(ServiceResponse::rejected(vec![format!(
                "Subscriptions can not be moved to {other:?}"
            )])),
        }
    }

    async fn get_payment_details(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentDetail>>> {
        match self.sdk.get_default_card().await {
            Ok(card) => Ok(ServiceResponse::ok(
                card.map(format_card).into_iter().collect(),
            )),
            Err(err) => reject_or_fail(err, Vec::new()),
        }
    }

    async fn get_transactions(
        &self,
        _customer_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ProviderResult<ServiceResponse<Vec<Transaction>>> {
        let records = match self.sdk.get_payment_history().await {
            Ok(records) => records,
            Err(err) => return reject_or_fail(err, Vec::new()),
        };

        let offset = offset.unwrap_or(0) as usize;
        let limit = limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(ServiceResponse::ok(
            records
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(format_transaction)
                .collect(),
        ))
    }

    async fn fetch_receipt(
        &self,
        transaction_id: &str,
    ) -> ProviderResult<ServiceResponse<String>> {
        match self.sdk.get_billing_receipt(transaction_id).await {
            Ok(receipt) => Ok(ServiceResponse::ok(receipt)),
            Err(err) => reject_or_fail(err, String::new()),
        }
    }

    async fn update_card_details(
        &self,
        args: UpdateCardDetailsArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        let card = CardDetails {
            card_name: args.card_name,
            card_number: args.card_number,
            cvc: args.cvc,
            exp_month: args.exp_month,
            exp_year: args.exp_year,
            currency: args.currency,
        };
        match self.sdk.set_default_card(card).await {
            Ok(()) => Ok(ServiceResponse::ok(())),
            Err(err) => reject_or_fail(err, ()),
        }
    }

    async fn change_subscription(
        &self,
        args: ChangeSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<String>> {
        let fee_id = access_fee_id(&args.access_fee_id)?;
        match self
            .sdk
            .change_subscription(fee_id, &args.subscription_id)
            .await
        {
            Ok(message) => Ok(ServiceResponse::ok(message)),
            Err(err) => reject_or_fail(err, String::new()),
        }
    }
}

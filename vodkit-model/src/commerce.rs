//! Commerce records: offers, subscriptions, transactions and payment state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub offer_id: String,
    #[serde(default)]
    pub offer_title: String,
    #[serde(default)]
    pub offer_price: f64,
    #[serde(default)]
    pub offer_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: i64,
    pub offer_id: String,
    pub status: SubscriptionStatus,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub offer_title: String,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub next_payment_price: f64,
    #[serde(default)]
    pub next_payment_currency: String,
    #[serde(default)]
    pub payment_gateway: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribe_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_switch_id: Option<String>,
}

impl Subscription {
    /// Active or cancelled-but-running subscriptions both still grant access.
    pub fn is_current(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub transaction_date: i64,
    #[serde(default)]
    pub offer_id: String,
    #[serde(default)]
    pub offer_type: String,
    #[serde(default)]
    pub offer_title: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub transaction_price_incl_tax: f64,
    #[serde(default)]
    pub transaction_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_payment_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    pub id: i64,
    #[serde(default)]
    pub payment_gateway: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_method_specific_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: i64,
    #[serde(default)]
    pub method_name: String,
    #[serde(default)]
    pub payment_gateway: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSwitch {
    #[serde(default)]
    pub from_offer_id: String,
    pub to_offer_id: String,
    #[serde(default)]
    pub switch_direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Resolved access decision for one offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub access_granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub offer_id: String,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub requires_payment_details: bool,
}

//! The InPlayer SDK surface the adapter depends on.
//!
//! Hosts bind this to their SDK build; records mirror the SDK's snake_case
//! payloads.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use vodkit_contracts::account::NotificationHandler;
use vodkit_contracts::error::{INVALID_TOKEN_MESSAGE, ProviderError};
use vodkit_model::{CommonAccountResponse, SocialUrl};

/// Failure reported by the SDK, with the HTTP status of the call behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("InPlayer request failed ({status}): {message}")]
pub struct SdkError {
    pub status: u16,
    pub message: String,
}

impl SdkError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Client errors other than auth failures are domain rejections.
    pub fn is_rejection(&self) -> bool {
        (400..500).contains(&self.status) && self.status != 401
    }
}

impl From<SdkError> for ProviderError {
    fn from(err: SdkError) -> Self {
        if err.status == 401 || err.message.contains(INVALID_TOKEN_MESSAGE) {
            ProviderError::InvalidToken
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkEnvironment {
    Development,
    Production,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkCredentials {
    pub token: String,
    pub refresh_token: String,
    pub expires: i64,
}

impl std::fmt::Debug for SdkCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkCredentials")
            .field("expires", &self.expires)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Unix seconds
    pub created_at: i64,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub account: AccountRecord,
}

impl std::fmt::Debug for SignInRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRecord")
            .field("account", &self.account.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInArgs {
    pub email: String,
    pub password: String,
    pub referrer: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpArgs {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub full_name: String,
    pub referrer: String,
    pub client_id: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountData {
    pub full_name: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterFieldRecord {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub media_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHistoryRecord {
    pub media_id: String,
    pub progress: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessFeeRecord {
    pub id: i64,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    /// `subscription`, `ppv`, ...
    #[serde(default)]
    pub access_type: String,
    /// Billing period for subscriptions, e.g. `month`
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub trial_days: Option<u32>,
}

impl AccessFeeRecord {
    pub fn is_subscription(&self) -> bool {
        self.access_type == "subscription"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetAccessRecord {
    pub item_id: i64,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: i64,
    pub item_id: i64,
    #[serde(default)]
    pub item_title: String,
    /// `active`, `cancelled`, ...
    pub action_type: String,
    #[serde(default)]
    pub access_fee_id: Option<i64>,
    #[serde(default)]
    pub next_billing_date: i64,
    #[serde(default)]
    pub charged_amount: f64,
    #[serde(default)]
    pub next_rebill_amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub payment_method_name: String,
    #[serde(default)]
    pub unsubscribe_url: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryRecord {
    pub transaction_token: String,
    pub item_id: i64,
    #[serde(default)]
    pub item_title: String,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub charged_amount: f64,
    #[serde(default)]
    pub currency_iso: String,
    #[serde(default)]
    pub payment_method_name: String,
    /// Unix seconds
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: i64,
    #[serde(default)]
    pub card_name: String,
    /// Masked card number
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub exp_month: String,
    #[serde(default)]
    pub exp_year: String,
    #[serde(default)]
    pub card_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodRecord {
    pub id: i64,
    pub method_name: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub card_name: String,
    pub card_number: String,
    pub cvc: u16,
    pub exp_month: u8,
    pub exp_year: u16,
    pub currency: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_name", &self.card_name)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

/// Identity and commerce calls of the InPlayer SDK.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InPlayerSdk: Send + Sync {
    fn set_environment(&self, environment: SdkEnvironment);

    fn set_token(&self, token: &str, refresh_token: &str, expires: i64);

    fn is_authenticated(&self) -> bool;

    fn credentials(&self) -> Option<SdkCredentials>;

    async fn sign_in(&self, args: SignInArgs) -> SdkResult<SignInRecord>;

    async fn sign_up(&self, args: SignUpArgs) -> SdkResult<SignInRecord>;

    async fn sign_out(&self) -> SdkResult<()>;

    async fn get_account_info(&self) -> SdkResult<AccountRecord>;

    async fn update_account(
        &self,
        data: UpdateAccountData,
    ) -> SdkResult<AccountRecord>;

    async fn get_register_fields(
        &self,
        client_id: &str,
    ) -> SdkResult<Vec<RegisterFieldRecord>>;

    async fn change_password(
        &self,
        old_password: &str,
        password: &str,
        password_confirmation: &str,
    ) -> SdkResult<()>;

    async fn request_new_password(
        &self,
        email: &str,
        merchant_uuid: &str,
    ) -> SdkResult<()>;

    async fn set_new_password(
        &self,
        password: &str,
        password_confirmation: &str,
        token: &str,
    ) -> SdkResult<()>;

    async fn get_favorites(&self) -> SdkResult<Vec<FavoriteRecord>>;

    async fn add_to_favorites(&self, media_id: &str) -> SdkResult<()>;

    async fn delete_from_favorites(&self, media_id: &str) -> SdkResult<()>;

    async fn get_watch_history(&self) -> SdkResult<Vec<WatchHistoryRecord>>;

    async fn update_watch_history(
        &self,
        media_id: &str,
        progress: f64,
    ) -> SdkResult<()>;

    async fn delete_from_watch_history(&self, media_id: &str) -> SdkResult<()>;

    async fn export_data(&self) -> SdkResult<CommonAccountResponse>;

    async fn delete_account(
        &self,
        password: &str,
    ) -> SdkResult<CommonAccountResponse>;

    async fn get_social_login_urls(
        &self,
        state: &str,
    ) -> SdkResult<Vec<SocialUrl>>;

    fn is_subscribed_to_notifications(&self) -> bool;

    async fn subscribe_to_notifications(
        &self,
        account_uuid: &str,
        handler: NotificationHandler,
    ) -> SdkResult<()>;

    fn unsubscribe_from_notifications(&self);

    async fn get_asset_access_fees(
        &self,
        asset_id: i64,
    ) -> SdkResult<Vec<AccessFeeRecord>>;

    async fn check_access_for_asset(
        &self,
        asset_id: i64,
    ) -> SdkResult<AssetAccessRecord>;

    async fn get_payment_methods(&self) -> SdkResult<Vec<PaymentMethodRecord>>;

    async fn get_subscriptions(&self) -> SdkResult<Vec<SubscriptionRecord>>;

    async fn cancel_subscription(&self, unsubscribe_url: &str) -> SdkResult<()>;

    async fn change_subscription(
        &self,
        access_fee_id: i64,
        subscription_id: &str,
    ) -> SdkResult<String>;

    async fn get_payment_history(&self) -> SdkResult<Vec<PaymentHistoryRecord>>;

    async fn get_default_card(&self) -> SdkResult<Option<CardRecord>>;

    async fn set_default_card(&self, card: CardDetails) -> SdkResult<()>;

    async fn get_billing_receipt(
        &self,
        transaction_token: &str,
    ) -> SdkResult<String>;
}

//! Identity contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vodkit_model::{
    AccessModel, AuthData, AuthResponse, CommonAccountResponse, ConsentsValue,
    CustomFormField, Customer, RegistrationFields, SerializedFavorite,
    SerializedWatchHistoryItem, ServiceResponse, SocialUrl,
    UpdateCustomerArgs, UserPayload,
};

use crate::error::{ProviderError, ProviderResult};
use crate::features::{AccountOperation, AccountServiceFeatures};

/// Result of login and register. `None` data with errors is a rejection.
pub type AuthOutcome = ServiceResponse<Option<AuthResponse>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginArgs {
    pub email: String,
    pub password: String,
    pub referrer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterArgs {
    pub email: String,
    pub password: String,
    pub referrer: String,
    pub consents: Vec<ConsentsValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordWithTokenArgs {
    pub customer_email: String,
    pub new_password: String,
    pub new_password_confirmation: String,
    pub reset_password_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordWithOldPasswordArgs {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

/// Realtime account event pushed by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: String,
    pub payload: Value,
}

pub type NotificationHandler = Arc<dyn Fn(Notification) + Send + Sync>;

/// Identity operations of a provider.
///
/// Optional operations default to [`ProviderError::OperationUnavailable`];
/// a provider that implements one must also report it from [`supports`].
///
/// [`supports`]: AccountService::supports
#[async_trait]
pub trait AccountService: Send + Sync {
    fn features(&self) -> AccountServiceFeatures;

    /// Resolved after [`initialize`](AccountService::initialize).
    fn access_model(&self) -> AccessModel;

    fn sandbox(&self) -> bool;

    fn svod_offer_ids(&self) -> Vec<String>;

    /// Whether an optional operation is implemented.
    fn supports(&self, _operation: AccountOperation) -> bool {
        false
    }

    /// Prepare the provider. `restore_url` may carry a session handed over
    /// by an external login page.
    async fn initialize(&self, restore_url: Option<&str>) -> ProviderResult<()>;

    /// Current credentials, refreshed when close to expiry.
    async fn get_auth_data(&self) -> ProviderResult<Option<AuthData>>;

    async fn login(&self, args: LoginArgs) -> ProviderResult<AuthOutcome>;

    async fn register(&self, args: RegisterArgs) -> ProviderResult<AuthOutcome>;

    async fn logout(&self) -> ProviderResult<()>;

    async fn get_user(&self) -> ProviderResult<UserPayload>;

    async fn get_publisher_consents(&self) -> ProviderResult<Vec<CustomFormField>>;

    async fn get_customer_consents(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<ConsentsValue>>;

    /// Replace the full consent set of `customer`.
    async fn update_customer_consents(
        &self,
        customer: &Customer,
        consents: Vec<ConsentsValue>,
    ) -> ProviderResult<ServiceResponse<Vec<ConsentsValue>>>;

    async fn get_registration_fields(
        &self,
        customer: &Customer,
    ) -> ProviderResult<RegistrationFields>;

    async fn update_registration_fields_values(
        &self,
        customer: &Customer,
        values: BTreeMap<String, String>,
    ) -> ProviderResult<ServiceResponse<Customer>>;

    async fn update_customer(
        &self,
        args: UpdateCustomerArgs,
    ) -> ProviderResult<ServiceResponse<Customer>>;

    async fn reset_password(
        &self,
        customer_email: &str,
        reset_url: Option<&str>,
    ) -> ProviderResult<ServiceResponse<()>>;

    async fn change_password_with_reset_token(
        &self,
        args: ChangePasswordWithTokenArgs,
    ) -> ProviderResult<ServiceResponse<()>>;

    async fn change_password_with_old_password(
        &self,
        args: ChangePasswordWithOldPasswordArgs,
    ) -> ProviderResult<ServiceResponse<()>>;

    async fn get_favorites(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<SerializedFavorite>>;

    async fn get_watch_history(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<SerializedWatchHistoryItem>>;

    async fn update_favorites(
        &self,
        customer: &Customer,
        favorites: Vec<SerializedFavorite>,
    ) -> ProviderResult<()>;

    async fn update_watch_history(
        &self,
        customer: &Customer,
        history: Vec<SerializedWatchHistoryItem>,
    ) -> ProviderResult<()>;

    async fn export_account_data(
        &self,
    ) -> ProviderResult<ServiceResponse<CommonAccountResponse>> {
        Err(ProviderError::OperationUnavailable(
            AccountOperation::ExportAccountData.name(),
        ))
    }

    async fn delete_account(
        &self,
        _password: &str,
    ) -> ProviderResult<ServiceResponse<CommonAccountResponse>> {
        Err(ProviderError::OperationUnavailable(
            AccountOperation::DeleteAccount.name(),
        ))
    }

    async fn get_social_urls(
        &self,
        _redirect_url: &str,
    ) -> ProviderResult<Vec<SocialUrl>> {
        Err(ProviderError::OperationUnavailable(
            AccountOperation::GetSocialUrls.name(),
        ))
    }

    /// Returns whether a subscription is active after the call.
    async fn subscribe_to_notifications(
        &self,
        _customer_id: &str,
        _handler: NotificationHandler,
    ) -> ProviderResult<bool> {
        Err(ProviderError::OperationUnavailable(
            AccountOperation::SubscribeToNotifications.name(),
        ))
    }
}

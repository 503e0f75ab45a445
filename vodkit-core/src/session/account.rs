use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use vodkit_contracts::account::{
    AuthOutcome, ChangePasswordWithOldPasswordArgs,
    ChangePasswordWithTokenArgs, LoginArgs, RegisterArgs,
};
use vodkit_contracts::error::ProviderResult;
use vodkit_contracts::features::{AccountOperation, AccountServiceFeatures};
use vodkit_model::{
    AccessModel, AuthData, AuthResponse, CommonAccountResponse, ConsentsValue,
    CustomFormField, Customer, Favorite, IntegrationType, RegistrationFields,
    ServiceResponse, SocialUrl, UpdateCustomerArgs, WatchHistoryItem,
};

use super::{EntitlementsHook, MAX_NAME_LENGTH, ProfileController, SessionEpoch};
use crate::error::{AccountError, AccountResult, ensure_feature, ensure_operation};
use crate::fanout::{settle_all, settle_each};
use crate::registry::IntegrationServices;
use crate::shelves::{FavoritesController, WatchHistoryController};
use crate::state::{AccountState, AppStores, LoadingGuard, SessionStatus};

enum AuthStep {
    Accepted(AuthResponse),
    Rejected(Vec<String>),
    /// Neither data nor errors.
    Empty,
}

/// Anonymous shelves captured before a session replaces them.
#[derive(Debug, Default)]
struct AnonymousShelves {
    favorites: Vec<Favorite>,
    history: Vec<WatchHistoryItem>,
}

/// Owns the authenticated session lifecycle and delegates every side effect
/// to the active provider.
#[derive(Clone)]
pub struct AccountController {
    pub(super) services: IntegrationServices,
    pub(super) stores: AppStores,
    favorites: FavoritesController,
    watch_history: WatchHistoryController,
    profiles: ProfileController,
    pub(super) epoch: SessionEpoch,
    entitlements_hook: Arc<RwLock<Option<EntitlementsHook>>>,
}

impl std::fmt::Debug for AccountController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountController")
            .field("integration", &self.services.integration)
            .field("epoch", &self.epoch.current())
            .finish_non_exhaustive()
    }
}

impl AccountController {
    pub fn new(
        services: IntegrationServices,
        stores: AppStores,
        favorites: FavoritesController,
        watch_history: WatchHistoryController,
        profiles: ProfileController,
    ) -> Self {
        Self {
            services,
            stores,
            favorites,
            watch_history,
            profiles,
            epoch: SessionEpoch::new(),
            entitlements_hook: Arc::new(RwLock::new(None)),
        }
    }

    pub fn integration(&self) -> IntegrationType {
        self.services.integration
    }

    pub fn features(&self) -> AccountServiceFeatures {
        self.services.account.features()
    }

    pub fn sandbox(&self) -> bool {
        self.services.account.sandbox()
    }

    pub fn access_model(&self) -> AccessModel {
        self.services.account.access_model()
    }

    pub fn epoch(&self) -> &SessionEpoch {
        &self.epoch
    }

    pub fn stores(&self) -> &AppStores {
        &self.stores
    }

    pub fn set_entitlements_hook(&self, hook: EntitlementsHook) {
        *self.entitlements_hook.write() = Some(hook);
    }

    /// Prepare the provider and restore a previous session if one exists.
    ///
    /// Meant to run once at process start.
    pub async fn initialize(
        &self,
        restore_url: Option<&str>,
        entitlements_hook: Option<EntitlementsHook>,
    ) -> AccountResult<()> {
        if let Some(hook) = entitlements_hook {
            self.set_entitlements_hook(hook);
        }

        let _loading =
            LoadingGuard::engage(&self.stores.account, |s| &mut s.loading);

        if let Err(err) = self.profiles.load_persisted_profile().await {
            warn!(error = %err, "failed to load persisted profile");
        }

        self.services.account.initialize(restore_url).await?;
        info!(
            integration = %self.services.integration,
            access_model = ?self.access_model(),
            sandbox = self.sandbox(),
            "account service initialized"
        );

        self.load_user_data().await;
        Ok(())
    }

    /// Restore the session held by the provider.
    ///
    /// A rejected token signs the user out. Any other failure is logged and
    /// leaves the current state untouched.
    pub async fn load_user_data(&self) {
        match self.restore_session().await {
            Ok(true) => debug!("session restored"),
            Ok(false) => debug!("no stored session"),
            Err(err) if err.is_invalid_token() => {
                warn!("stored session rejected by provider; signing out");
                self.logout().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to restore session; keeping current state");
            }
        }
    }

    async fn restore_session(&self) -> AccountResult<bool> {
        let Some(auth) = self.services.account.get_auth_data().await? else {
            return Ok(false);
        };

        self.stores.account.update(|state| state.auth = Some(auth));
        self.get_account().await?;
        Ok(true)
    }

    /// Fetch the customer behind the current credentials and hydrate the
    /// session from it.
    pub async fn get_account(&self) -> AccountResult<()> {
        let previous = self.stores.account.with_state(|state| state.status);
        let was_anonymous = self.stores.account.with_state(|s| s.user.is_none());
        self.set_status(if was_anonymous {
            SessionStatus::Authenticating
        } else {
            SessionStatus::Refreshing
        });

        let payload = match self.services.account.get_user().await {
            Ok(payload) => payload,
            Err(err) => {
                self.set_status(previous);
                return Err(err.into());
            }
        };

        if was_anonymous {
            self.epoch.bump();
        }
        self.after_login(payload.user, payload.customer_consents, true)
            .await;
        self.restore_shelves().await;
        Ok(())
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        referrer: &str,
    ) -> AccountResult<ServiceResponse<Option<Customer>>> {
        let _loading =
            LoadingGuard::engage(&self.stores.account, |s| &mut s.loading);
        let previous = self.set_status(SessionStatus::Authenticating);

        let outcome = self
            .services
            .account
            .login(LoginArgs {
                email: email.to_string(),
                password: password.to_string(),
                referrer: referrer.to_string(),
            })
            .await;

        let anonymous = self.anonymous_shelves();
        let response = match self.accept_auth(outcome, previous)? {
            AuthStep::Accepted(response) => response,
            AuthStep::Rejected(errors) => {
                return Ok(ServiceResponse::failed(None, errors));
            }
            AuthStep::Empty => return Ok(rejection("Failed to authenticate user.")),
        };

        self.epoch.bump();
        let user = response.user.clone();
        self.stores
            .account
            .update(|state| state.auth = Some(response.auth));
        self.after_login(response.user, response.customer_consents, true)
            .await;
        self.merge_anonymous_shelves(anonymous).await;

        info!(customer_id = %user.id, "customer logged in");
        Ok(ServiceResponse::ok(Some(user)))
    }

    /// Create an account. Anonymous shelves are written into the new account.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        referrer: &str,
        consents: Vec<ConsentsValue>,
    ) -> AccountResult<ServiceResponse<Option<Customer>>> {
        let _loading =
            LoadingGuard::engage(&self.stores.account, |s| &mut s.loading);
        let previous = self.set_status(SessionStatus::Authenticating);

        let outcome = self
            .services
            .account
            .register(RegisterArgs {
                email: email.to_string(),
                password: password.to_string(),
                referrer: referrer.to_string(),
                consents,
            })
            .await;

        let anonymous = self.anonymous_shelves();
        let response = match self.accept_auth(outcome, previous)? {
            AuthStep::Accepted(response) => response,
            AuthStep::Rejected(errors) => {
                return Ok(ServiceResponse::failed(None, errors));
            }
            AuthStep::Empty => return Ok(rejection("Failed to create account.")),
        };

        self.epoch.bump();
        let user = response.user.clone();
        self.stores
            .account
            .update(|state| state.auth = Some(response.auth));
        self.after_login(response.user, response.customer_consents, true)
            .await;

        let AnonymousShelves { favorites, history } = anonymous;
        settle_each(
            "register",
            vec![
                ("favorites", self.favorites.adopt(favorites).boxed()),
                ("watch history", self.watch_history.adopt(history).boxed()),
            ],
        )
        .await;

        info!(customer_id = %user.id, "customer registered");
        Ok(ServiceResponse::ok(Some(user)))
    }

    /// Sign out. Local state is cleared even when the provider call fails.
    pub async fn logout(&self) {
        if let Err(err) = self.services.account.logout().await {
            warn!(error = %err, "provider sign out failed; clearing local session anyway");
        }

        self.clear_login_state().await;
        self.refresh_entitlements().await;
        info!("customer logged out");
    }

    pub async fn update_user(
        &self,
        values: UpdateCustomerArgs,
    ) -> AccountResult<ServiceResponse<Customer>> {
        let features = self.features();

        if values.email.is_some() && !features.can_update_email {
            return Err(AccountError::EmailUpdateUnsupported);
        }

        let user = self.current_user()?;

        let errors = validate_name_lengths(&values);
        if !errors.is_empty() {
            return Ok(ServiceResponse::rejected(errors));
        }

        let _loading =
            LoadingGuard::engage(&self.stores.account, |s| &mut s.loading);

        let mut payload = values;
        if !features.can_support_empty_full_name {
            payload.email = Some(user.email.clone());
        }
        payload.id = Some(user.id.clone());

        let response = self.services.account.update_customer(payload).await?;
        if !response.is_ok() {
            return Ok(response);
        }

        let mut updated = response.response_data;
        if updated.external_data.is_none() {
            updated.external_data = user.external_data;
        }
        self.stores
            .account
            .update(|state| state.user = Some(updated.clone()));

        Ok(ServiceResponse::ok(updated))
    }

    /// Replace the customer's consent answers.
    pub async fn update_consents(
        &self,
        consents: Vec<ConsentsValue>,
    ) -> AccountResult<ServiceResponse<Vec<ConsentsValue>>> {
        let user = self.current_user()?;
        let _loading =
            LoadingGuard::engage(&self.stores.account, |s| &mut s.loading);

        let response = self
            .services
            .account
            .update_customer_consents(&user, consents)
            .await?;

        if response.is_ok() {
            let updated = response.response_data.clone();
            self.stores
                .account
                .update(|state| state.customer_consents = Some(updated));
        }
        Ok(response)
    }

    pub async fn get_customer_consents(
        &self,
    ) -> AccountResult<Vec<ConsentsValue>> {
        let user = self.current_user()?;
        let consents =
            self.services.account.get_customer_consents(&user).await?;

        let stored = consents.clone();
        self.stores
            .account
            .update(|state| state.customer_consents = Some(stored));
        Ok(consents)
    }

    pub async fn get_publisher_consents(
        &self,
    ) -> AccountResult<Vec<CustomFormField>> {
        let consents = self.services.account.get_publisher_consents().await?;

        let stored = consents.clone();
        self.stores
            .account
            .update(|state| state.publisher_consents = Some(stored));
        Ok(consents)
    }

    pub async fn get_registration_fields(
        &self,
    ) -> AccountResult<RegistrationFields> {
        let user = self.current_user()?;
        Ok(self.services.account.get_registration_fields(&user).await?)
    }

    pub async fn update_registration_fields_values(
        &self,
        values: BTreeMap<String, String>,
    ) -> AccountResult<ServiceResponse<Customer>> {
        let user = self.current_user()?;
        let response = self
            .services
            .account
            .update_registration_fields_values(&user, values)
            .await?;

        if response.is_ok() {
            let consents = self
                .stores
                .account
                .with_state(|state| state.customer_consents.clone())
                .unwrap_or_default();
            self.after_login(response.response_data.clone(), consents, false)
                .await;
        }
        Ok(response)
    }

    pub async fn reset_password(
        &self,
        email: &str,
        reset_url: Option<&str>,
    ) -> AccountResult<ServiceResponse<()>> {
        Ok(self.services.account.reset_password(email, reset_url).await?)
    }

    pub async fn change_password_with_old_password(
        &self,
        old_password: &str,
        new_password: &str,
        new_password_confirmation: &str,
    ) -> AccountResult<ServiceResponse<()>> {
        Ok(self
            .services
            .account
            .change_password_with_old_password(
                ChangePasswordWithOldPasswordArgs {
                    old_password: old_password.to_string(),
                    new_password: new_password.to_string(),
                    new_password_confirmation: new_password_confirmation
                        .to_string(),
                },
            )
            .await?)
    }

    pub async fn change_password_with_token(
        &self,
        customer_email: &str,
        new_password: &str,
        reset_password_token: &str,
        new_password_confirmation: &str,
    ) -> AccountResult<ServiceResponse<()>> {
        Ok(self
            .services
            .account
            .change_password_with_reset_token(ChangePasswordWithTokenArgs {
                customer_email: customer_email.to_string(),
                new_password: new_password.to_string(),
                new_password_confirmation: new_password_confirmation
                    .to_string(),
                reset_password_token: reset_password_token.to_string(),
            })
            .await?)
    }

    pub async fn export_account_data(
        &self,
    ) -> AccountResult<ServiceResponse<CommonAccountResponse>> {
        let account = &self.services.account;
        ensure_operation(
            account.supports(AccountOperation::ExportAccountData),
            AccountOperation::ExportAccountData.name(),
            "account",
        )?;
        ensure_feature(self.features().can_export_account_data, "Export account")?;

        Ok(account.export_account_data().await?)
    }

    pub async fn delete_account_data(
        &self,
        password: &str,
    ) -> AccountResult<ServiceResponse<CommonAccountResponse>> {
        let account = &self.services.account;
        ensure_operation(
            account.supports(AccountOperation::DeleteAccount),
            AccountOperation::DeleteAccount.name(),
            "account",
        )?;
        ensure_feature(self.features().can_delete_account, "Delete account")?;

        Ok(account.delete_account(password).await?)
    }

    pub async fn get_social_login_urls(
        &self,
        redirect_url: &str,
    ) -> AccountResult<Vec<SocialUrl>> {
        let account = &self.services.account;
        ensure_operation(
            account.supports(AccountOperation::GetSocialUrls),
            AccountOperation::GetSocialUrls.name(),
            "account",
        )?;
        ensure_feature(self.features().has_social_urls, "Social logins")?;

        Ok(account.get_social_urls(redirect_url).await?)
    }

    pub async fn get_auth_data(&self) -> AccountResult<Option<AuthData>> {
        Ok(self.services.account.get_auth_data().await?)
    }

    /// Listen for realtime account events; purchases trigger a deferred
    /// subscription reload.
    pub async fn subscribe_to_notifications(&self) -> AccountResult<bool> {
        let account = &self.services.account;
        ensure_operation(
            account.supports(AccountOperation::SubscribeToNotifications),
            AccountOperation::SubscribeToNotifications.name(),
            "account",
        )?;
        ensure_feature(self.features().has_notifications, "Notifications")?;

        let user = self.current_user()?;
        Ok(account
            .subscribe_to_notifications(&user.id, self.notification_handler())
            .await?)
    }

    pub(super) async fn refresh_entitlements(&self) {
        let hook = self.entitlements_hook.read().clone();
        if let Some(hook) = hook {
            hook().await;
        }
    }

    pub(super) fn current_user(&self) -> AccountResult<Customer> {
        self.stores
            .account
            .with_state(|state| state.user.clone())
            .ok_or(AccountError::NotLoggedIn)
    }

    /// Publish the signed-in customer, then fetch the supplementary data.
    ///
    /// Subscription and publisher consent failures are logged and ignored.
    async fn after_login(
        &self,
        user: Customer,
        customer_consents: Vec<ConsentsValue>,
        should_reload_subscription: bool,
    ) {
        self.stores.account.update(|state| {
            state.user = Some(user);
            state.customer_consents = Some(customer_consents);
            state.status = SessionStatus::Authenticated;
        });

        let mut branches: Vec<(&'static str, BoxFuture<'_, AccountResult<()>>)> =
            Vec::with_capacity(2);
        if should_reload_subscription {
            branches.push((
                "subscriptions",
                self.reload_subscriptions(Duration::ZERO).boxed(),
            ));
        }
        branches.push((
            "publisher consents",
            async { self.get_publisher_consents().await.map(|_| ()) }.boxed(),
        ));

        settle_all("after login", branches).await;
    }

    async fn clear_login_state(&self) {
        self.epoch.bump();
        self.stores.account.set(AccountState::signed_out());

        if let Err(err) = self.profiles.unpersist_profile().await {
            warn!(error = %err, "failed to clear persisted profile");
        }

        self.restore_shelves().await;
    }

    async fn restore_shelves(&self) {
        settle_all(
            "restore shelves",
            vec![
                ("favorites", self.favorites.restore().boxed()),
                ("watch history", self.watch_history.restore().boxed()),
            ],
        )
        .await;
    }

    /// Both shelves are written into the same customer record, so the
    /// merges run in order.
    async fn merge_anonymous_shelves(&self, anonymous: AnonymousShelves) {
        let AnonymousShelves { favorites, history } = anonymous;
        settle_each(
            "merge shelves",
            vec![
                (
                    "favorites",
                    self.favorites.merge_after_login(favorites).boxed(),
                ),
                (
                    "watch history",
                    self.watch_history.merge_after_login(history).boxed(),
                ),
            ],
        )
        .await;
    }

    /// Shelves visible right now, if they are the anonymous ones.
    fn anonymous_shelves(&self) -> AnonymousShelves {
        if self.stores.account.with_state(AccountState::is_logged_in) {
            return AnonymousShelves::default();
        }
        AnonymousShelves {
            favorites: self.favorites.snapshot(),
            history: self.watch_history.snapshot(),
        }
    }

    /// Classify a provider auth result, restoring the previous status on
    /// anything but success.
    fn accept_auth(
        &self,
        outcome: ProviderResult<AuthOutcome>,
        previous: SessionStatus,
    ) -> AccountResult<AuthStep> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.set_status(previous);
                return Err(err.into());
            }
        };

        match (outcome.errors.is_empty(), outcome.response_data) {
            (true, Some(response)) => Ok(AuthStep::Accepted(response)),
            (true, None) => {
                self.set_status(previous);
                Ok(AuthStep::Empty)
            }
            (false, _) => {
                self.set_status(previous);
                Ok(AuthStep::Rejected(outcome.errors))
            }
        }
    }

    fn set_status(&self, status: SessionStatus) -> SessionStatus {
        let mut previous = status;
        self.stores.account.update(|state| {
            previous = std::mem::replace(&mut state.status, status);
        });
        previous
    }
}

fn rejection(message: &str) -> ServiceResponse<Option<Customer>> {
    ServiceResponse::failed(None, vec![message.to_string()])
}

fn validate_name_lengths(values: &UpdateCustomerArgs) -> Vec<String> {
    let too_long = |value: &Option<String>| {
        value
            .as_deref()
            .is_some_and(|name| name.chars().count() > MAX_NAME_LENGTH)
    };

    let mut errors = Vec::new();
    if too_long(&values.first_name) {
        errors.push(format!(
            "First name can not be longer than {MAX_NAME_LENGTH} characters."
        ));
    }
    if too_long(&values.last_name) {
        errors.push(format!(
            "Last name can not be longer than {MAX_NAME_LENGTH} characters."
        ));
    }
    errors
}

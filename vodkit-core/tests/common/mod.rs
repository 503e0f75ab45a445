//! In-memory providers, catalog and a wired application for integration
//! tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use vodkit_contracts::account::{
    AccountService, AuthOutcome, ChangePasswordWithOldPasswordArgs,
    ChangePasswordWithTokenArgs, LoginArgs, RegisterArgs,
};
use vodkit_contracts::catalog::CatalogService;
use vodkit_contracts::checkout::{
    CheckoutService, CreateOrderArgs, SwitchSubscriptionArgs,
};
use vodkit_contracts::error::{ProviderError, ProviderResult};
use vodkit_contracts::features::{
    AccountOperation, AccountServiceFeatures, CheckoutOperation,
};
use vodkit_contracts::storage::PreferenceStore;
use vodkit_contracts::subscription::{
    SubscriptionService, UpdateSubscriptionArgs,
};
use vodkit_core::config::{
    AppConfig, CleengConfig, FeaturesConfig, IntegrationsConfig, ShelfLimits,
};
use vodkit_core::providers::cleeng::{CleengRequest, CleengTransport, HttpMethod};
use vodkit_core::storage::MemoryPreferenceStore;
use vodkit_core::{
    AccountController, EntitlementsHook, IntegrationServices, Integrations,
    VodkitApp,
};
use vodkit_model::{
    AccessModel, AuthData, AuthResponse, CommonAccountResponse, ConsentsValue,
    CustomFormField, Customer, Entitlement, ExternalData, IntegrationType,
    Offer, Order, PaymentDetail, PaymentMethod, PlaylistItem,
    RegistrationFields, SerializedFavorite, SerializedWatchHistoryItem,
    ServiceResponse, SocialUrl, Subscription, SubscriptionStatus, SubscriptionSwitch,
    Transaction, UpdateCustomerArgs, UserPayload,
};

pub const STORAGE_PREFIX: &str = "vodkit-test";
pub const FAVORITES_LIST: &str = "favorites-list";
pub const HISTORY_LIST: &str = "continue-watching";
pub const EMAIL: &str = "viewer@example.com";
pub const PASSWORD: &str = "correct horse";
pub const WRONG_PASSWORD: &str = "wrong";
pub const CUSTOMER_ID: &str = "42";

/// Route controller logs to the test writer; `RUST_LOG` filters them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn item(mediaid: &str) -> PlaylistItem {
    PlaylistItem {
        mediaid: mediaid.to_string(),
        title: format!("Title {mediaid}"),
        duration: 60.0,
        ..Default::default()
    }
}

pub fn favorites(ids: &[&str]) -> Vec<SerializedFavorite> {
    ids.iter()
        .map(|id| SerializedFavorite {
            mediaid: id.to_string(),
        })
        .collect()
}

pub fn history(entries: &[(&str, f64)]) -> Vec<SerializedWatchHistoryItem> {
    entries
        .iter()
        .map(|(id, progress)| SerializedWatchHistoryItem {
            mediaid: id.to_string(),
            progress: *progress,
            series_id: None,
        })
        .collect()
}

/// Catalog knowing a fixed set of ids. Results come back reversed so callers
/// cannot rely on catalog order.
pub struct FakeCatalog {
    items: HashMap<String, PlaylistItem>,
    pub offline: AtomicBool,
    on_lookup: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl FakeCatalog {
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            items: ids.iter().map(|id| (id.to_string(), item(id))).collect(),
            offline: AtomicBool::new(false),
            on_lookup: Mutex::new(None),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Run `observer` at the start of every lookup.
    pub fn on_lookup(&self, observer: impl Fn() + Send + Sync + 'static) {
        *self.on_lookup.lock() = Some(Arc::new(observer));
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn get_media_by_watchlist(
        &self,
        _playlist_id: &str,
        media_ids: &[String],
    ) -> ProviderResult<Vec<PlaylistItem>> {
        let observer = self.on_lookup.lock().clone();
        if let Some(observer) = observer {
            observer();
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("catalog offline".to_string()));
        }
        Ok(media_ids
            .iter()
            .rev()
            .filter_map(|id| self.items.get(id).cloned())
            .collect())
    }
}

/// Server-side state of the fake provider.
#[derive(Debug, Default)]
pub struct RemoteAccount {
    pub favorites: Vec<SerializedFavorite>,
    pub history: Vec<SerializedWatchHistoryItem>,
    /// The provider holds credentials from an earlier run.
    pub session: bool,
    pub reject_token: bool,
    pub offline: bool,
    pub fail_logout: bool,
    pub unsupported: Vec<AccountOperation>,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub login: AtomicUsize,
    pub logout: AtomicUsize,
    pub update_customer: AtomicUsize,
    pub delete_account: AtomicUsize,
    pub export_account_data: AtomicUsize,
    pub social_urls: AtomicUsize,
    pub update_favorites: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeAccountService {
    pub remote: Mutex<RemoteAccount>,
    pub calls: Calls,
    features: AccountServiceFeatures,
    access_model: AccessModel,
}

impl FakeAccountService {
    pub fn new(features: AccountServiceFeatures, access_model: AccessModel) -> Self {
        Self {
            remote: Mutex::new(RemoteAccount::default()),
            calls: Calls::default(),
            features,
            access_model,
        }
    }

    pub fn customer(&self) -> Customer {
        let remote = self.remote.lock();
        Customer {
            id: CUSTOMER_ID.to_string(),
            email: EMAIL.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            full_name: Some("Ada Lovelace".to_string()),
            country: None,
            reg_date: None,
            metadata: BTreeMap::new(),
            external_data: Some(ExternalData {
                favorites: Some(remote.favorites.clone()),
                history: Some(remote.history.clone()),
            }),
        }
    }

    fn auth() -> AuthData {
        AuthData {
            jwt: "jwt".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }
}

#[async_trait]
impl AccountService for FakeAccountService {
    fn features(&self) -> AccountServiceFeatures {
        self.features
    }

    fn access_model(&self) -> AccessModel {
        self.access_model
    }

    fn sandbox(&self) -> bool {
        true
    }

    fn svod_offer_ids(&self) -> Vec<String> {
        vec!["S1".to_string()]
    }

    fn supports(&self, operation: AccountOperation) -> bool {
        !self.remote.lock().unsupported.contains(&operation)
    }

    async fn initialize(&self, _restore_url: Option<&str>) -> ProviderResult<()> {
        Ok(())
    }

    async fn get_auth_data(&self) -> ProviderResult<Option<AuthData>> {
        Ok(self.remote.lock().session.then(Self::auth))
    }

    async fn login(&self, args: LoginArgs) -> ProviderResult<AuthOutcome> {
        self.calls.login.fetch_add(1, Ordering::SeqCst);
        if args.password == WRONG_PASSWORD {
            return Ok(ServiceResponse::failed(
                None,
                vec!["Invalid credentials".to_string()],
            ));
        }

        self.remote.lock().session = true;
        Ok(ServiceResponse::ok(Some(AuthResponse {
            auth: Self::auth(),
            user: self.customer(),
            customer_consents: Vec::new(),
        })))
    }

    async fn register(&self, _args: RegisterArgs) -> ProviderResult<AuthOutcome> {
        {
            let mut remote = self.remote.lock();
            remote.session = true;
            remote.favorites.clear();
            remote.history.clear();
        }
        Ok(ServiceResponse::ok(Some(AuthResponse {
            auth: Self::auth(),
            user: self.customer(),
            customer_consents: Vec::new(),
        })))
    }

    async fn logout(&self) -> ProviderResult<()> {
        self.calls.logout.fetch_add(1, Ordering::SeqCst);
        let mut remote = self.remote.lock();
        remote.session = false;
        if remote.fail_logout {
            return Err(ProviderError::Transport("sign out failed".to_string()));
        }
        Ok(())
    }

    async fn get_user(&self) -> ProviderResult<UserPayload> {
        {
            let remote = self.remote.lock();
            if remote.reject_token {
                return Err(ProviderError::InvalidToken);
            }
            if remote.offline {
                return Err(ProviderError::Transport("offline".to_string()));
            }
        }
        Ok(UserPayload {
            user: self.customer(),
            customer_consents: Vec::new(),
        })
    }

    async fn get_publisher_consents(&self) -> ProviderResult<Vec<CustomFormField>> {
        Ok(Vec::new())
    }

    async fn get_customer_consents(
        &self,
        _customer: &Customer,
    ) -> ProviderResult<Vec<ConsentsValue>> {
        Ok(Vec::new())
    }

    async fn update_customer_consents(
        &self,
        _customer: &Customer,
        consents: Vec<ConsentsValue>,
    ) -> ProviderResult<ServiceResponse<Vec<ConsentsValue>>> {
        Ok(ServiceResponse::ok(consents))
    }

    async fn get_registration_fields(
        &self,
        _customer: &Customer,
    ) -> ProviderResult<RegistrationFields> {
        Ok(RegistrationFields::default())
    }

    async fn update_registration_fields_values(
        &self,
        customer: &Customer,
        _values: BTreeMap<String, String>,
    ) -> ProviderResult<ServiceResponse<Customer>> {
        Ok(ServiceResponse::ok(customer.clone()))
    }

    async fn update_customer(
        &self,
        args: UpdateCustomerArgs,
    ) -> ProviderResult<ServiceResponse<Customer>> {
        self.calls.update_customer.fetch_add(1, Ordering::SeqCst);
        let mut customer = self.customer();
        customer.first_name = args.first_name.or(customer.first_name);
        customer.last_name = args.last_name.or(customer.last_name);
        customer.external_data = None;
        Ok(ServiceResponse::ok(customer))
    }

    async fn reset_password(
        &self,
        _customer_email: &str,
        _reset_url: Option<&str>,
    ) -> ProviderResult<ServiceResponse<()>> {
        Ok(ServiceResponse::ok(()))
    }

    async fn change_password_with_reset_token(
        &self,
        _args: ChangePasswordWithTokenArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        Ok(ServiceResponse::ok(()))
    }

    async fn change_password_with_old_password(
        &self,
        _args: ChangePasswordWithOldPasswordArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        Ok(ServiceResponse::ok(()))
    }

    async fn get_favorites(
        &self,
        _customer: &Customer,
    ) -> ProviderResult<Vec<SerializedFavorite>> {
        Ok(self.remote.lock().favorites.clone())
    }

    async fn get_watch_history(
        &self,
        _customer: &Customer,
    ) -> ProviderResult<Vec<SerializedWatchHistoryItem>> {
        Ok(self.remote.lock().history.clone())
    }

    async fn update_favorites(
        &self,
        _customer: &Customer,
        favorites: Vec<SerializedFavorite>,
    ) -> ProviderResult<()> {
        self.calls.update_favorites.fetch_add(1, Ordering::SeqCst);
        self.remote.lock().favorites = favorites;
        Ok(())
    }

    async fn update_watch_history(
        &self,
        _customer: &Customer,
        history: Vec<SerializedWatchHistoryItem>,
    ) -> ProviderResult<()> {
        self.remote.lock().history = history;
        Ok(())
    }

    async fn export_account_data(
        &self,
    ) -> ProviderResult<ServiceResponse<CommonAccountResponse>> {
        self.calls.export_account_data.fetch_add(1, Ordering::SeqCst);
        Ok(ServiceResponse::ok(CommonAccountResponse::default()))
    }

    async fn delete_account(
        &self,
        _password: &str,
    ) -> ProviderResult<ServiceResponse<CommonAccountResponse>> {
        self.calls.delete_account.fetch_add(1, Ordering::SeqCst);
        Ok(ServiceResponse::ok(CommonAccountResponse::default()))
    }

    async fn get_social_urls(&self, redirect_url: &str) -> ProviderResult<Vec<SocialUrl>> {
        self.calls.social_urls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SocialUrl {
            provider: "google".to_string(),
            url: format!("https://accounts.example.com/google?redirect={redirect_url}"),
        }])
    }
}

/// Checkout backend resolving plan switches to the offer they move to.
#[derive(Default)]
pub struct FakeCheckout {
    pub switch: Mutex<Option<SubscriptionSwitch>>,
    pub switch_lookup_fails: AtomicBool,
    switch_calls: AtomicUsize,
}

impl FakeCheckout {
    pub fn switch_calls(&self) -> usize {
        self.switch_calls.load(Ordering::SeqCst)
    }
}

pub fn offer(offer_id: &str) -> Offer {
    Offer {
        offer_id: offer_id.to_string(),
        offer_title: format!("Offer {offer_id}"),
        offer_price: 99.0,
        offer_currency: "EUR".to_string(),
        period: Some("year".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl CheckoutService for FakeCheckout {
    fn supports(&self, operation: CheckoutOperation) -> bool {
        matches!(
            operation,
            CheckoutOperation::GetOffer | CheckoutOperation::GetSubscriptionSwitch
        )
    }

    async fn get_offers(&self, _offer_ids: &[String]) -> ProviderResult<Vec<Offer>> {
        Ok(Vec::new())
    }

    async fn get_entitlements(
        &self,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Entitlement>> {
        Ok(ServiceResponse::ok(Entitlement {
            access_granted: offer_id == "S1",
            expires_at: None,
        }))
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
        Ok(ServiceResponse::ok(String::new()))
    }

    async fn create_order(
        &self,
        _args: CreateOrderArgs,
    ) -> ProviderResult<ServiceResponse<Option<Order>>> {
        Ok(ServiceResponse::ok(None))
    }

    async fn get_payment_methods(
        &self,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentMethod>>> {
        Ok(ServiceResponse::ok(Vec::new()))
    }

    async fn delete_payment_method(
        &self,
        _payment_details_id: i64,
    ) -> ProviderResult<ServiceResponse<()>> {
        Ok(ServiceResponse::ok(()))
    }

    async fn get_offer(
        &self,
        offer_id: &str,
    ) -> ProviderResult<ServiceResponse<Option<Offer>>> {
        Ok(ServiceResponse::ok(Some(offer(offer_id))))
    }

    async fn get_subscription_switch(
        &self,
        _switch_id: &str,
    ) -> ProviderResult<ServiceResponse<Option<SubscriptionSwitch>>> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if self.switch_lookup_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("switch lookup failed".to_string()));
        }
        Ok(ServiceResponse::ok(self.switch.lock().clone()))
    }
}

/// Subscription backend with a single active subscription slot.
#[derive(Default)]
pub struct FakeSubscription {
    pub active: Mutex<Option<Subscription>>,
    active_calls: AtomicUsize,
}

impl FakeSubscription {
    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::SeqCst)
    }
}

pub fn subscription(status: SubscriptionStatus) -> Subscription {
    Subscription {
        subscription_id: 7,
        offer_id: "S1".to_string(),
        status,
        expires_at: 1_900_000_000,
        offer_title: "Monthly".to_string(),
        total_price: 9.99,
        next_payment_price: 9.99,
        next_payment_currency: "EUR".to_string(),
        payment_gateway: "card".to_string(),
        payment_method: "card".to_string(),
        period: Some("month".to_string()),
        unsubscribe_url: None,
        pending_switch_id: None,
    }
}

#[async_trait]
impl SubscriptionService for FakeSubscription {
    async fn get_active_subscription(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<Subscription>> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.active.lock().clone())
    }

    async fn get_all_transactions(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<Vec<Transaction>>> {
        Ok(Some(Vec::new()))
    }

    async fn get_active_payment(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<PaymentDetail>> {
        Ok(None)
    }

    async fn get_subscriptions(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<Subscription>>> {
        Ok(ServiceResponse::ok(self.active.lock().clone().into_iter().collect()))
    }

    async fn update_subscription(
        &self,
        args: UpdateSubscriptionArgs,
    ) -> ProviderResult<ServiceResponse<Option<Subscription>>> {
        let mut active = self.active.lock();
        if let Some(current) = active.as_mut() {
            current.status = args.status;
        }
        Ok(ServiceResponse::ok(active.clone()))
    }

    async fn get_payment_details(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<ServiceResponse<Vec<PaymentDetail>>> {
        Ok(ServiceResponse::ok(Vec::new()))
    }

    async fn get_transactions(
        &self,
        _customer_id: &str,
        _limit: Option<u32>,
        _offset: Option<u32>,
    ) -> ProviderResult<ServiceResponse<Vec<Transaction>>> {
        Ok(ServiceResponse::ok(Vec::new()))
    }
}

pub fn all_features() -> AccountServiceFeatures {
    AccountServiceFeatures {
        can_update_email: true,
        can_support_empty_full_name: true,
        can_change_password_with_old_password: true,
        can_renew_subscription: true,
        can_export_account_data: true,
        can_delete_account: true,
        can_update_payment_method: true,
        can_show_receipts: true,
        has_social_urls: true,
        has_notifications: true,
    }
}

pub fn config(max_favorites: usize) -> AppConfig {
    AppConfig {
        integration: Some(IntegrationType::Cleeng),
        storage_prefix: STORAGE_PREFIX.to_string(),
        features: FeaturesConfig {
            favorites_list: Some(FAVORITES_LIST.to_string()),
            continue_watching_list: Some(HISTORY_LIST.to_string()),
        },
        favorites: ShelfLimits {
            max_count: max_favorites,
        },
        ..AppConfig::default()
    }
}

/// A wired application on top of the fakes.
pub struct Harness {
    pub app: VodkitApp,
    pub account: Arc<FakeAccountService>,
    pub checkout: Arc<FakeCheckout>,
    pub subscription: Arc<FakeSubscription>,
    pub storage: Arc<MemoryPreferenceStore>,
    pub catalog: Arc<FakeCatalog>,
    pub hook_calls: Arc<AtomicUsize>,
}

pub struct HarnessOptions {
    pub features: AccountServiceFeatures,
    pub access_model: AccessModel,
    pub max_favorites: usize,
    pub max_history: usize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            features: all_features(),
            access_model: AccessModel::Svod,
            max_favorites: 48,
            max_history: 48,
        }
    }
}

impl Harness {
    pub fn new(options: HarnessOptions) -> Self {
        init_tracing();
        let storage = Arc::new(MemoryPreferenceStore::new());
        let catalog = Arc::new(FakeCatalog::with_ids(&["a", "b", "c", "d", "e", "f"]));
        let account = Arc::new(FakeAccountService::new(
            options.features,
            options.access_model,
        ));
        let mut config = config(options.max_favorites);
        config.watch_history.max_count = options.max_history;
        Self::assemble(
            config,
            account,
            Arc::new(FakeCheckout::default()),
            Arc::new(FakeSubscription::default()),
            storage,
            catalog,
        )
    }

    /// A second application instance sharing storage and backends, as after
    /// a restart.
    pub fn restarted(&self) -> Self {
        Self::assemble(
            self.app.config().clone(),
            Arc::clone(&self.account),
            Arc::clone(&self.checkout),
            Arc::clone(&self.subscription),
            Arc::clone(&self.storage),
            Arc::clone(&self.catalog),
        )
    }

    fn assemble(
        config: AppConfig,
        account: Arc<FakeAccountService>,
        checkout: Arc<FakeCheckout>,
        subscription: Arc<FakeSubscription>,
        storage: Arc<MemoryPreferenceStore>,
        catalog: Arc<FakeCatalog>,
    ) -> Self {
        let services = IntegrationServices {
            integration: IntegrationType::Cleeng,
            account: Arc::clone(&account) as Arc<dyn AccountService>,
            checkout: Arc::clone(&checkout) as Arc<dyn CheckoutService>,
            subscription: Arc::clone(&subscription) as Arc<dyn SubscriptionService>,
        };
        let app = VodkitApp::with_services(
            config,
            Some(services),
            Arc::clone(&storage) as Arc<dyn PreferenceStore>,
            Arc::clone(&catalog) as Arc<dyn CatalogService>,
        );

        Self {
            app,
            account,
            checkout,
            subscription,
            storage,
            catalog,
            hook_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let calls = Arc::clone(&self.hook_calls);
        let hook: EntitlementsHook = Arc::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
        self.app.initialize(None, Some(hook)).await?;
        Ok(())
    }

    pub fn controller(&self) -> &AccountController {
        self.app.account().expect("integration bound")
    }

    pub async fn login(&self) -> anyhow::Result<()> {
        let response = self.controller().login(EMAIL, PASSWORD, "").await?;
        anyhow::ensure!(response.is_ok(), "login rejected: {:?}", response.errors);
        Ok(())
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        self.app
            .stores()
            .favorites
            .with_state(|state| state.favorites.iter().map(|f| f.mediaid.clone()).collect())
    }

    pub fn history_ids(&self) -> Vec<String> {
        self.app
            .stores()
            .watch_history
            .with_state(|state| state.items.iter().map(|i| i.mediaid.clone()).collect())
    }

    pub fn remote_favorite_ids(&self) -> Vec<String> {
        self.account
            .remote
            .lock()
            .favorites
            .iter()
            .map(|f| f.mediaid.clone())
            .collect()
    }

    /// Favorites in the local preference store, bypassing the reconciler.
    pub fn local_favorite_ids(&self) -> Vec<String> {
        let key = format!("{STORAGE_PREFIX}.favorites");
        self.storage
            .entry(&key)
            .and_then(|raw| serde_json::from_str::<Vec<SerializedFavorite>>(&raw).ok())
            .unwrap_or_default()
            .into_iter()
            .map(|f| f.mediaid)
            .collect()
    }

    pub fn hook_calls(&self) -> usize {
        self.hook_calls.load(Ordering::SeqCst)
    }

    /// Write a raw value under a key of the local preference store.
    pub async fn put_local(&self, key: &str, raw: &str) -> anyhow::Result<()> {
        self.storage
            .set_item(&format!("{STORAGE_PREFIX}.{key}"), raw, false)
            .await?;
        Ok(())
    }
}

/// Unsigned MediaStore token for `customer_id`, valid for a day.
pub fn cleeng_jwt(customer_id: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 86_400;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD
        .encode(json!({ "customerId": customer_id, "exp": exp }).to_string());
    format!("{header}.{payload}.sig")
}

/// MediaStore stand-in holding a single customer record.
///
/// `PATCH /customers/{id}` replaces `externalData` whole, like the real API.
/// Every call yields first so concurrent callers interleave.
pub struct FakeCleengTransport {
    pub external_data: Mutex<Value>,
    pub patches: AtomicUsize,
}

impl Default for FakeCleengTransport {
    fn default() -> Self {
        Self {
            external_data: Mutex::new(json!({})),
            patches: AtomicUsize::new(0),
        }
    }
}

impl FakeCleengTransport {
    fn customer_path() -> String {
        format!("/customers/{CUSTOMER_ID}")
    }

    fn customer(&self) -> Value {
        json!({
            "id": CUSTOMER_ID,
            "email": EMAIL,
            "firstName": "Ada",
            "lastName": "Lovelace",
            "externalData": self.external_data.lock().clone(),
        })
    }

    pub fn remote_favorite_ids(&self) -> Vec<String> {
        ids_of(&self.external_data.lock()["favorites"])
    }

    pub fn remote_history_ids(&self) -> Vec<String> {
        ids_of(&self.external_data.lock()["history"])
    }
}

fn ids_of(list: &Value) -> Vec<String> {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry["mediaid"].as_str().map(str::to_string))
        .collect()
}

fn envelope(data: Value) -> Value {
    json!({ "responseData": data, "errors": [] })
}

#[async_trait]
impl CleengTransport for FakeCleengTransport {
    async fn send(&self, _sandbox: bool, request: CleengRequest) -> ProviderResult<Value> {
        tokio::task::yield_now().await;

        let customer_path = Self::customer_path();
        let body = match (request.method, request.path.as_str()) {
            (HttpMethod::Post, "/auths") => envelope(json!({
                "jwt": cleeng_jwt(CUSTOMER_ID),
                "refreshToken": "refresh",
            })),
            (HttpMethod::Get, path) if path == customer_path => {
                envelope(self.customer())
            }
            (HttpMethod::Patch, path) if path == customer_path => {
                let update = request
                    .body
                    .as_ref()
                    .map(|body| body["externalData"].clone())
                    .unwrap_or(Value::Null);
                tokio::task::yield_now().await;
                *self.external_data.lock() = update;
                self.patches.fetch_add(1, Ordering::SeqCst);
                envelope(self.customer())
            }
            _ => envelope(Value::Null),
        };
        Ok(body)
    }
}

/// An application bound to Cleeng through `transport`, with no svod offers
/// configured.
pub fn cleeng_app(
    transport: Arc<FakeCleengTransport>,
    storage: Arc<MemoryPreferenceStore>,
    catalog: Arc<FakeCatalog>,
) -> anyhow::Result<VodkitApp> {
    init_tracing();
    let app_config = AppConfig {
        integrations: IntegrationsConfig {
            cleeng: Some(CleengConfig {
                publisher_id: "pub-1".to_string(),
                monthly_offer: None,
                yearly_offer: None,
                use_sandbox: true,
            }),
            ..IntegrationsConfig::default()
        },
        ..config(48)
    };
    let integrations = Integrations::new(storage as Arc<dyn PreferenceStore>)
        .with_cleeng_transport(transport as Arc<dyn CleengTransport>);
    Ok(VodkitApp::new(
        app_config,
        &integrations,
        catalog as Arc<dyn CatalogService>,
    )?)
}

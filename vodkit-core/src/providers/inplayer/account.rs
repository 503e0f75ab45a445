use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::DateTime;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::{Url, form_urlencoded};
use vodkit_contracts::account::{
    AccountService, AuthOutcome, ChangePasswordWithOldPasswordArgs,
    ChangePasswordWithTokenArgs, LoginArgs, NotificationHandler, RegisterArgs,
};
use vodkit_contracts::error::{ProviderError, ProviderResult};
use vodkit_contracts::features::{AccountOperation, AccountServiceFeatures};
use vodkit_model::lenient;
use vodkit_model::{
    AccessModel, AuthData, AuthResponse, CommonAccountResponse, ConsentsValue,
    CustomFormField, Customer, ExternalData, FormFieldVariant,
    RegistrationFields, SerializedFavorite, SerializedWatchHistoryItem,
    ServiceResponse, SocialUrl, UpdateCustomerArgs, UserPayload,
};

use super::sdk::{
    AccountRecord, InPlayerSdk, RegisterFieldRecord, SdkCredentials,
    SdkEnvironment, SdkError, SignInArgs, SignInRecord, SignUpArgs,
    UpdateAccountData,
};
use crate::config::InPlayerConfig;

const FEATURES: AccountServiceFeatures = AccountServiceFeatures {
    can_update_email: false,
    can_support_empty_full_name: false,
    can_change_password_with_old_password: true,
    can_renew_subscription: false,
    can_export_account_data: true,
    can_delete_account: true,
    can_update_payment_method: false,
    can_show_receipts: true,
    has_social_urls: true,
    has_notifications: true,
};

const TERMS_URL: &str = "https://inplayer.com/legal/terms";

/// Register fields already covered by the built-in form.
const BUILT_IN_FIELDS: [&str; 4] = ["email_confirmation", "first_name", "surname", "terms"];

const METADATA_FIRST_NAME: &str = "first_name";
const METADATA_LAST_NAME: &str = "surname";
const METADATA_CONSENTS: &str = "consents";

/// Session handed over in the fragment of a redirect URL:
/// `#token=..&refresh_token=..&expires=..`.
pub(crate) fn credentials_from_url(restore_url: &str) -> Option<SdkCredentials> {
    let fragment = match Url::parse(restore_url) {
        Ok(url) => url.fragment().map(str::to_owned),
        Err(_) => restore_url
            .split_once('#')
            .map(|(_, fragment)| fragment.to_owned()),
    }?;

    let params: HashMap<String, String> = form_urlencoded::parse(fragment.as_bytes())
        .into_owned()
        .collect();

    let token = params.get("token").filter(|v| !v.is_empty())?;
    let refresh_token = params.get("refresh_token").filter(|v| !v.is_empty())?;
    let expires = params.get("expires")?.parse().ok()?;

    Some(SdkCredentials {
        token: token.clone(),
        refresh_token: refresh_token.clone(),
        expires,
    })
}

fn consents_from_metadata(metadata: &BTreeMap<String, Value>) -> Vec<ConsentsValue> {
    metadata
        .get(METADATA_CONSENTS)
        .and_then(Value::as_str)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .map(lenient::parse_list)
        .unwrap_or_default()
}

/// Consents are mirrored as `name -> "true" | "false"` register fields next to
/// the JSON copy.
fn consents_to_metadata(consents: &[ConsentsValue]) -> BTreeMap<String, String> {
    let mut metadata: BTreeMap<String, String> = consents
        .iter()
        .map(|consent| (consent.name.clone(), consent.is_accepted().to_string()))
        .collect();
    metadata.insert(
        METADATA_CONSENTS.to_string(),
        serde_json::to_string(consents).unwrap_or_else(|_| "[]".to_string()),
    );
    metadata
}

fn metadata_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn format_account(account: AccountRecord) -> Customer {
    let first_name = account
        .metadata
        .get(METADATA_FIRST_NAME)
        .and_then(Value::as_str)
        .map(str::to_owned);
    let last_name = account
        .metadata
        .get(METADATA_LAST_NAME)
        .and_then(Value::as_str)
        .map(str::to_owned);
    let reg_date = DateTime::from_timestamp(account.created_at, 0)
        .map(|date| date.to_rfc3339());

    Customer {
        id: account.id.to_string(),
        email: account.email,
        first_name,
        last_name,
        full_name: Some(account.full_name),
        country: None,
        reg_date,
        metadata: account.metadata,
        external_data: None,
    }
}

/// Full name is `first last`, or the email when both are blank.
fn format_update_account(
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: &str,
    metadata: &BTreeMap<String, Value>,
) -> UpdateAccountData {
    let first_name = first_name.unwrap_or_default().trim().to_string();
    let last_name = last_name.unwrap_or_default().trim().to_string();

    let full_name = format!("{first_name} {last_name}").trim().to_string();
    let full_name = if full_name.is_empty() {
        email.to_string()
    } else {
        full_name
    };

    let mut metadata: BTreeMap<String, String> = metadata
        .iter()
        .map(|(key, value)| (key.clone(), metadata_string(value)))
        .collect();
    metadata.insert(METADATA_FIRST_NAME.to_string(), first_name);
    metadata.insert(METADATA_LAST_NAME.to_string(), last_name);

    UpdateAccountData {
        full_name,
        metadata,
    }
}

fn terms_consent(terms: &RegisterFieldRecord) -> CustomFormField {
    let url = if terms.label.is_empty() {
        TERMS_URL
    } else {
        terms.label.as_str()
    };

    CustomFormField {
        variant: FormFieldVariant::Checkbox,
        name: "terms".to_string(),
        label: format!(
            "I accept the <a href=\"{url}\" target=\"_blank\">terms and conditions</a>"
        ),
        placeholder: String::new(),
        required: true,
        is_custom_register_field: true,
        enabled_by_default: Some(false),
        default_value: None,
        options: BTreeMap::new(),
        version: Some("1".to_string()),
    }
}

fn register_field(field: RegisterFieldRecord) -> Option<CustomFormField> {
    let variant = match field.field_type.as_str() {
        "input" => FormFieldVariant::Input,
        "select" => FormFieldVariant::Select,
        "country" => FormFieldVariant::Country,
        "us_state" => FormFieldVariant::UsState,
        "radio" => FormFieldVariant::Radio,
        "checkbox" => FormFieldVariant::Checkbox,
        "datepicker" => FormFieldVariant::Datepicker,
        other => {
            debug!(field = %field.name, kind = other, "skipping unsupported register field");
            return None;
        }
    };

    let (enabled_by_default, default_value) = if variant == FormFieldVariant::Checkbox {
        (Some(field.default_value == "true"), None)
    } else {
        (None, Some(field.default_value))
    };

    Some(CustomFormField {
        variant,
        name: field.name,
        label: field.label,
        placeholder: field.placeholder,
        required: field.required,
        is_custom_register_field: true,
        enabled_by_default,
        default_value,
        options: field.options,
        version: Some("1".to_string()),
    })
}

/// Map an SDK failure to the envelope when it is a rejection, to an error
/// otherwise.
fn reject_or_fail<T>(err: SdkError, fallback: T) -> ProviderResult<ServiceResponse<T>> {
    if err.is_rejection() {
        Ok(ServiceResponse::failed(fallback, vec![err.message]))
    } else {
        Err(err.into())
    }
}

/// Identity-first provider on top of the InPlayer SDK.
///
/// Consents are stored as JSON in account metadata; personal shelves live in
/// the SDK's favorites and watch history collections.
pub struct InPlayerAccountService {
    sdk: Arc<dyn InPlayerSdk>,
    config: InPlayerConfig,
    account_uuid: RwLock<Option<String>>,
}

impl std::fmt::Debug for InPlayerAccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InPlayerAccountService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InPlayerAccountService {
    pub fn new(sdk: Arc<dyn InPlayerSdk>, config: InPlayerConfig) -> Self {
        Self {
            sdk,
            config,
            account_uuid: RwLock::new(None),
        }
    }

    async fn external_data(&self) -> ProviderResult<ExternalData> {
        let (favorites, history) = futures::try_join!(
            self.sdk.get_favorites(),
            self.sdk.get_watch_history(),
        )?;

        Ok(ExternalData {
            favorites: Some(
                favorites
                    .into_iter()
                    .map(|record| SerializedFavorite {
                        mediaid: record.media_id,
                    })
                    .collect(),
            ),
            history: Some(
                history
                    .into_iter()
                    .map(|record| SerializedWatchHistoryItem {
                        mediaid: record.media_id,
                        progress: record.progress,
                        series_id: None,
                    })
                    .collect(),
            ),
        })
    }

    async fn hydrate(&self, account: AccountRecord) -> ProviderResult<UserPayload> {
        *self.account_uuid.write() = Some(account.uuid.clone());

        let mut user = format_account(account);
        user.external_data = Some(self.external_data().await?);
        let customer_consents = consents_from_metadata(&user.metadata);

        Ok(UserPayload {
            user,
            customer_consents,
        })
    }

    async fn auth_outcome(
        &self,
        result: Result<SignInRecord, SdkError>,
    ) -> ProviderResult<AuthOutcome> {
        let record = match result {
            Ok(record) => record,
            Err(err) => return reject_or_fail(err, None),
        };

        let auth = AuthData {
            jwt: record.access_token,
            refresh_token: record.refresh_token,
        };
        let UserPayload {
            user,
            customer_consents,
        } = self.hydrate(record.account).await?;

        Ok(ServiceResponse::ok(Some(AuthResponse {
            auth,
            user,
            customer_consents,
        })))
    }
}

#[async_trait]
impl AccountService for InPlayerAccountService {
    fn features(&self) -> AccountServiceFeatures {
        FEATURES
    }

    fn access_model(&self) -> AccessModel {
        if self.config.asset_id.is_some() {
            AccessModel::Svod
        } else {
            AccessModel::Authvod
        }
    }

    fn sandbox(&self) -> bool {
        self.config.use_sandbox
    }

    fn svod_offer_ids(&self) -> Vec<String> {
        self.config
            .asset_id
            .map(|id| vec![id.to_string()])
            .unwrap_or_default()
    }

    fn supports(&self, _operation: AccountOperation) -> bool {
        true
    }

    async fn initialize(&self, restore_url: Option<&str>) -> ProviderResult<()> {
        if self.config.client_id.is_empty() {
            return Err(ProviderError::Configuration(
                "InPlayer integration requires a client id".to_string(),
            ));
        }

        self.sdk.set_environment(if self.config.use_sandbox {
            SdkEnvironment::Development
        } else {
            SdkEnvironment::Production
        });

        if let Some(credentials) = restore_url.and_then(credentials_from_url) {
            debug!("restoring session from redirect");
            self.sdk.set_token(
                &credentials.token,
                &credentials.refresh_token,
                credentials.expires,
            );
        }
        Ok(())
    }

    async fn get_auth_data(&self) -> ProviderResult<Option<AuthData>> {
        if !self.sdk.is_authenticated() {
            return Ok(None);
        }
        Ok(self.sdk.credentials().map(|credentials| AuthData {
            jwt: credentials.token,
            refresh_token: credentials.refresh_token,
        }))
    }

    async fn login(&self, args: LoginArgs) -> ProviderResult<AuthOutcome> {
        let result = self
            .sdk
            .sign_in(SignInArgs {
                email: args.email,
                password: args.password,
                referrer: args.referrer,
                client_id: self.config.client_id.clone(),
            })
            .await;
        self.auth_outcome(result).await
    }

    async fn register(&self, args: RegisterArgs) -> ProviderResult<AuthOutcome> {
        let mut metadata = consents_to_metadata(&args.consents);
        metadata.insert(METADATA_FIRST_NAME.to_string(), " ".to_string());
        metadata.insert(METADATA_LAST_NAME.to_string(), " ".to_string());

        let result = self
            .sdk
            .sign_up(SignUpArgs {
                full_name: args.email.clone(),
                email: args.email,
                password_confirmation: args.password.clone(),
                password: args.password,
                referrer: args.referrer,
                client_id: self.config.client_id.clone(),
                metadata,
            })
            .await;
        self.auth_outcome(result).await
    }

    async fn logout(&self) -> ProviderResult<()> {
        self.sdk.unsubscribe_from_notifications();
        *self.account_uuid.write() = None;
        Ok(self.sdk.sign_out().await?)
    }

    async fn get_user(&self) -> ProviderResult<UserPayload> {
        let account = self.sdk.get_account_info().await?;
        self.hydrate(account).await
    }

    async fn get_publisher_consents(&self) -> ProviderResult<Vec<CustomFormField>> {
        let fields = self.sdk.get_register_fields(&self.config.client_id).await?;

        let terms = fields
            .iter()
            .find(|field| field.name == "terms")
            .map(terms_consent);
        let custom = fields
            .into_iter()
            .filter(|field| !BUILT_IN_FIELDS.contains(&field.name.as_str()))
            .filter_map(register_field);

        Ok(terms.into_iter().chain(custom).collect())
    }

    async fn get_customer_consents(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<ConsentsValue>> {
        Ok(consents_from_metadata(&customer.metadata))
    }

    async fn update_customer_consents(
        &self,
        customer: &Customer,
        consents: Vec<ConsentsValue>,
    ) -> ProviderResult<ServiceResponse<Vec<ConsentsValue>>> {
        let mut data = format_update_account(
            customer.first_name.as_deref(),
            customer.last_name.as_deref(),
            &customer.email,
            &customer.metadata,
        );
        data.metadata.extend(consents_to_metadata(&consents));

        match self.sdk.update_account(data).await {
            Ok(account) => Ok(ServiceResponse::ok(consents_from_metadata(
                &account.metadata,
            ))),
            Err(err) => reject_or_fail(err, Vec::new()),
        }
    }

    async fn get_registration_fields(
        &self,
        customer: &Customer,
    ) -> ProviderResult<RegistrationFields> {
        let field = |name: &str, label: &str, value: &Option<String>| CustomFormField {
            variant: FormFieldVariant::Input,
            name: name.to_string(),
            label: label.to_string(),
            placeholder: String::new(),
            required: true,
            is_custom_register_field: false,
            enabled_by_default: None,
            default_value: value.clone(),
            options: BTreeMap::new(),
            version: None,
        };

        Ok(RegistrationFields {
            before_sign_up: true,
            enabled: true,
            fields: vec![
                field("firstName", "First name", &customer.first_name),
                field("lastName", "Last name", &customer.last_name),
            ],
        })
    }

    async fn update_registration_fields_values(
        &self,
        customer: &Customer,
        values: BTreeMap<String, String>,
    ) -> ProviderResult<ServiceResponse<Customer>> {
        let first_name = values
            .get("firstName")
            .cloned()
            .or_else(|| customer.first_name.clone());
        let last_name = values
            .get("lastName")
            .cloned()
            .or_else(|| customer.last_name.clone());

        self.update_customer(UpdateCustomerArgs {
            id: Some(customer.id.clone()),
            email: Some(customer.email.clone()),
            first_name,
            last_name,
            metadata: customer.metadata.clone(),
            ..Default::default()
        })
        .await
    }

    async fn update_customer(
        &self,
        args: UpdateCustomerArgs,
    ) -> ProviderResult<ServiceResponse<Customer>> {
        let data = format_update_account(
            args.first_name.as_deref(),
            args.last_name.as_deref(),
            args.email.as_deref().unwrap_or_default(),
            &args.metadata,
        );

        match self.sdk.update_account(data).await {
            Ok(account) => Ok(ServiceResponse::ok(format_account(account))),
            Err(err) => reject_or_fail(err, Customer::default()),
        }
    }

    async fn reset_password(
        &self,
        customer_email: &str,
        _reset_url: Option<&str>,
    ) -> ProviderResult<ServiceResponse<()>> {
        match self
            .sdk
            .request_new_password(customer_email, &self.config.client_id)
            .await
        {
            Ok(()) => Ok(ServiceResponse::ok(())),
            Err(err) => reject_or_fail(err, ()),
        }
    }

    async fn change_password_with_reset_token(
        &self,
        args: ChangePasswordWithTokenArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        match self
            .sdk
            .set_new_password(
                &args.new_password,
                &args.new_password_confirmation,
                &args.reset_password_token,
            )
            .await
        {
            Ok(()) => Ok(ServiceResponse::ok(())),
            Err(err) => reject_or_fail(err, ()),
        }
    }

    async fn change_password_with_old_password(
        &self,
        args: ChangePasswordWithOldPasswordArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        match self
            .sdk
            .change_password(
                &args.old_password,
                &args.new_password,
                &args.new_password_confirmation,
            )
            .await
        {
            Ok(()) => Ok(ServiceResponse::ok(())),
            Err(err) => reject_or_fail(err, ()),
        }
    }

    async fn get_favorites(
        &self,
        _customer: &Customer,
    ) -> ProviderResult<Vec<SerializedFavorite>> {
        Ok(self
            .sdk
            .get_favorites()
            .await?
            .into_iter()
            .map(|record| SerializedFavorite {
                mediaid: record.media_id,
            })
            .collect())
    }

    async fn get_watch_history(
        &self,
        _customer: &Customer,
    ) -> ProviderResult<Vec<SerializedWatchHistoryItem>> {
        Ok(self
            .sdk
            .get_watch_history()
            .await?
            .into_iter()
            .map(|record| SerializedWatchHistoryItem {
                mediaid: record.media_id,
                progress: record.progress,
                series_id: None,
            })
            .collect())
    }

    /// The SDK only offers add and delete, so the desired list is applied as
    /// a diff against the remote one.
    async fn update_favorites(
        &self,
        _customer: &Customer,
        favorites: Vec<SerializedFavorite>,
    ) -> ProviderResult<()> {
        let current: HashSet<String> = self
            .sdk
            .get_favorites()
            .await?
            .into_iter()
            .map(|record| record.media_id)
            .collect();
        let desired: HashSet<String> =
            favorites.into_iter().map(|fav| fav.mediaid).collect();

        for media_id in desired.difference(&current) {
            self.sdk.add_to_favorites(media_id).await?;
        }
        for media_id in current.difference(&desired) {
            self.sdk.delete_from_favorites(media_id).await?;
        }
        Ok(())
    }

    /// Applied as a diff like favorites: changed progress is written and
    /// entries missing from `history` are deleted.
    ///
    /// InPlayer records carry media id and progress only, so a series id
    /// does not survive a round trip through the account.
    async fn update_watch_history(
        &self,
        _customer: &Customer,
        history: Vec<SerializedWatchHistoryItem>,
    ) -> ProviderResult<()> {
        let mut current: HashMap<String, f64> = self
            .sdk
            .get_watch_history()
            .await?
            .into_iter()
            .map(|record| (record.media_id, record.progress))
            .collect();

        for item in history {
            let unchanged = current
                .remove(&item.mediaid)
                .is_some_and(|progress| progress == item.progress);
            if !unchanged {
                self.sdk
                    .update_watch_history(&item.mediaid, item.progress)
                    .await?;
            }
        }
        for media_id in current.keys() {
            self.sdk.delete_from_watch_history(media_id).await?;
        }
        Ok(())
    }

    async fn export_account_data(
        &self,
    ) -> ProviderResult<ServiceResponse<CommonAccountResponse>> {
        match self.sdk.export_data().await {
            Ok(response) => Ok(ServiceResponse::ok(response)),
            Err(err) => reject_or_fail(err, CommonAccountResponse::default()),
        }
    }

    async fn delete_account(
        &self,
        password: &str,
    ) -> ProviderResult<ServiceResponse<CommonAccountResponse>> {
        match self.sdk.delete_account(password).await {
            Ok(response) => Ok(ServiceResponse::ok(response)),
            Err(err) => reject_or_fail(err, CommonAccountResponse::default()),
        }
    }

    async fn get_social_urls(&self, redirect_url: &str) -> ProviderResult<Vec<SocialUrl>> {
        let state = STANDARD.encode(
            json!({
                "client_id": self.config.client_id,
                "redirect": redirect_url,
            })
            .to_string(),
        );
        Ok(self.sdk.get_social_login_urls(&state).await?)
    }

    async fn subscribe_to_notifications(
        &self,
        customer_id: &str,
        handler: NotificationHandler,
    ) -> ProviderResult<bool> {
        if self.sdk.is_subscribed_to_notifications() {
            return Ok(true);
        }

        let uuid = self
            .account_uuid
            .read()
            .clone()
            .unwrap_or_else(|| customer_id.to_string());
        match self.sdk.subscribe_to_notifications(&uuid, handler).await {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(error = %err, "failed to subscribe to account notifications");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::providers::inplayer::sdk::{
        FavoriteRecord, MockInPlayerSdk, WatchHistoryRecord,
    };

    fn config() -> InPlayerConfig {
        InPlayerConfig {
            client_id: "client-1".into(),
            asset_id: Some(99),
            use_sandbox: true,
        }
    }

    fn account() -> AccountRecord {
        AccountRecord {
            id: 7,
            uuid: "uuid-7".into(),
            email: "viewer@example.com".into(),
            full_name: "Ada Lovelace".into(),
            metadata: BTreeMap::from([
                ("first_name".to_string(), json!("Ada")),
                ("surname".to_string(), json!("Lovelace")),
                (
                    "consents".to_string(),
                    json!(r#"[{"name":"marketing","version":"1","state":"declined"}]"#),
                ),
            ]),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn redirect_fragment_restores_credentials() {
        let credentials = credentials_from_url(
            "https://app.example.com/#token=abc&refresh_token=def&expires=1700000000",
        )
        .unwrap();
        assert_eq!(credentials.token, "abc");
        assert_eq!(credentials.refresh_token, "def");
        assert_eq!(credentials.expires, 1_700_000_000);

        assert!(credentials_from_url("https://app.example.com/#token=abc").is_none());
        assert!(credentials_from_url("/account#token=a&refresh_token=b&expires=1").is_some());
    }

    #[test]
    fn account_maps_names_and_consents() {
        let customer = format_account(account());
        assert_eq!(customer.id, "7");
        assert_eq!(customer.first_name.as_deref(), Some("Ada"));
        assert_eq!(customer.last_name.as_deref(), Some("Lovelace"));

        let consents = consents_from_metadata(&customer.metadata);
        assert_eq!(consents.len(), 1);
        assert!(!consents[0].is_accepted());
    }

    #[test]
    fn blank_names_fall_back_to_email() {
        let data = format_update_account(Some("  "), None, "viewer@example.com", &BTreeMap::new());
        assert_eq!(data.full_name, "viewer@example.com");
        assert_eq!(data.metadata["first_name"], "");
    }

    #[tokio::test]
    async fn wrong_password_is_a_rejection() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_sign_in()
            .times(1)
            .returning(|_| Err(SdkError::new(422, "Invalid credentials")));

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        let outcome = service
            .login(LoginArgs {
                email: "viewer@example.com".into(),
                password: "nope".into(),
                referrer: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.first_error(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn login_hydrates_shelves_from_sdk() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_sign_in().times(1).returning(|_| {
            Ok(SignInRecord {
                access_token: "jwt".into(),
                refresh_token: "refresh".into(),
                account: account(),
            })
        });
        sdk.expect_get_favorites().returning(|| {
            Ok(vec![FavoriteRecord { media_id: "m1".into() }])
        });
        sdk.expect_get_watch_history().returning(|| {
            Ok(vec![WatchHistoryRecord { media_id: "h1".into(), progress: 0.4 }])
        });

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        let auth = service
            .login(LoginArgs {
                email: "viewer@example.com".into(),
                password: "secret".into(),
                referrer: String::new(),
            })
            .await
            .unwrap()
            .response_data
            .unwrap();

        let external = auth.user.external_data.unwrap();
        assert_eq!(external.favorites.unwrap()[0].mediaid, "m1");
        assert_eq!(external.history.unwrap()[0].progress, 0.4);
        assert_eq!(auth.customer_consents.len(), 1);
    }

    #[tokio::test]
    async fn favorites_are_written_as_a_diff() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_get_favorites().returning(|| {
            Ok(vec![
                FavoriteRecord { media_id: "keep".into() },
                FavoriteRecord { media_id: "drop".into() },
            ])
        });
        sdk.expect_add_to_favorites()
            .with(eq("new"))
            .times(1)
            .returning(|_| Ok(()));
        sdk.expect_delete_from_favorites()
            .with(eq("drop"))
            .times(1)
            .returning(|_| Ok(()));

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        service
            .update_favorites(
                &Customer::default(),
                vec![
                    SerializedFavorite { mediaid: "new".into() },
                    SerializedFavorite { mediaid: "keep".into() },
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_changed_progress_is_written() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_get_watch_history().returning(|| {
            Ok(vec![
                WatchHistoryRecord { media_id: "same".into(), progress: 0.5 },
                WatchHistoryRecord { media_id: "moved".into(), progress: 0.1 },
            ])
        });
        sdk.expect_update_watch_history()
            .withf(|media_id, progress| media_id == "moved" && *progress == 0.9)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        service
            .update_watch_history(
                &Customer::default(),
                vec![
                    SerializedWatchHistoryItem { mediaid: "same".into(), progress: 0.5, series_id: None },
                    SerializedWatchHistoryItem { mediaid: "moved".into(), progress: 0.9, series_id: None },
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn removed_history_entries_are_deleted() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_get_watch_history().returning(|| {
            Ok(vec![
                WatchHistoryRecord { media_id: "kept".into(), progress: 0.5 },
                WatchHistoryRecord { media_id: "removed".into(), progress: 0.3 },
            ])
        });
        sdk.expect_update_watch_history().never();
        sdk.expect_delete_from_watch_history()
            .with(eq("removed"))
            .times(1)
            .returning(|_| Ok(()));

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        service
            .update_watch_history(
                &Customer::default(),
                vec![SerializedWatchHistoryItem { mediaid: "kept".into(), progress: 0.5, series_id: None }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_session_is_invalid_token() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_get_account_info()
            .returning(|| Err(SdkError::new(401, "Invalid JWT token")));

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        assert!(service.get_user().await.unwrap_err().is_invalid_token());
    }

    #[tokio::test]
    async fn publisher_consents_put_terms_first() {
        let mut sdk = MockInPlayerSdk::new();
        sdk.expect_get_register_fields()
            .with(eq("client-1"))
            .returning(|_| {
                Ok(vec![
                    RegisterFieldRecord {
                        name: "first_name".into(),
                        field_type: "input".into(),
                        ..Default::default()
                    },
                    RegisterFieldRecord {
                        name: "newsletter".into(),
                        label: "Send me news".into(),
                        field_type: "checkbox".into(),
                        default_value: "true".into(),
                        ..Default::default()
                    },
                    RegisterFieldRecord {
                        name: "terms".into(),
                        field_type: "checkbox".into(),
                        ..Default::default()
                    },
                ])
            });

        let service = InPlayerAccountService::new(Arc::new(sdk), config());
        let consents = service.get_publisher_consents().await.unwrap();
        let names: Vec<_> = consents.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["terms", "newsletter"]);
        assert!(consents[0].label.contains(TERMS_URL));
        assert_eq!(consents[1].enabled_by_default, Some(true));
    }

    #[test]
    fn svod_is_keyed_on_the_asset() {
        let service = InPlayerAccountService::new(Arc::new(MockInPlayerSdk::new()), config());
        assert_eq!(service.access_model(), AccessModel::Svod);
        assert_eq!(service.svod_offer_ids(), ["99"]);
        assert!(service.features().can_delete_account);
        assert!(!service.features().can_update_email);
    }
}

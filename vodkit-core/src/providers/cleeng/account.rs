use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use vodkit_contracts::account::{
    AccountService, AuthOutcome, ChangePasswordWithOldPasswordArgs,
    ChangePasswordWithTokenArgs, LoginArgs, RegisterArgs,
};
use vodkit_contracts::error::{ProviderError, ProviderResult};
use vodkit_contracts::features::AccountServiceFeatures;
use vodkit_model::lenient;
use vodkit_model::{
    AccessModel, AuthData, AuthResponse, ConsentsValue, CustomFormField,
    Customer, ExternalData, FormFieldVariant, RegistrationFields,
    SerializedFavorite, SerializedWatchHistoryItem, ServiceResponse,
    UpdateCustomerArgs, UserPayload,
};

use super::client::{CleengAuth, CleengClient, id_string, require_ok};
use crate::config::CleengConfig;

const FEATURES: AccountServiceFeatures = AccountServiceFeatures {
    can_update_email: true,
    can_support_empty_full_name: true,
    can_change_password_with_old_password: false,
    can_renew_subscription: true,
    can_export_account_data: false,
    can_delete_account: false,
    can_update_payment_method: true,
    can_show_receipts: false,
    has_social_urls: false,
    has_notifications: false,
};

/// Capture fields MediaStore stores as first-class answers; anything else is
/// a custom question.
const CAPTURE_FIELDS: [&str; 11] = [
    "firstName",
    "lastName",
    "address",
    "address2",
    "city",
    "state",
    "country",
    "postCode",
    "birthDate",
    "companyName",
    "phoneNumber",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CleengCustomer {
    #[serde(deserialize_with = "id_string")]
    id: String,
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    reg_date: Option<String>,
    #[serde(default)]
    external_data: Option<ExternalData>,
}

impl From<CleengCustomer> for Customer {
    fn from(customer: CleengCustomer) -> Self {
        let full_name = match (&customer.first_name, &customer.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}").trim().to_string()),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        };

        Customer {
            id: customer.id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            full_name,
            country: customer.country,
            reg_date: customer.reg_date,
            metadata: BTreeMap::new(),
            external_data: customer.external_data,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConsentsEnvelope {
    #[serde(default)]
    consents: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublisherConsent {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    version: Option<String>,
}

impl From<PublisherConsent> for CustomFormField {
    fn from(consent: PublisherConsent) -> Self {
        CustomFormField {
            variant: FormFieldVariant::Checkbox,
            name: consent.name,
            label: consent.label,
            placeholder: String::new(),
            required: consent.required,
            is_custom_register_field: false,
            enabled_by_default: Some(false),
            default_value: None,
            options: BTreeMap::new(),
            version: consent.version,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptureStatus {
    #[serde(default)]
    is_capture_enabled: bool,
    #[serde(default)]
    should_capture_be_displayed: bool,
    #[serde(default)]
    settings: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptureSetting {
    key: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

fn form_field(
    variant: FormFieldVariant,
    name: &str,
    label: &str,
    required: bool,
    options: BTreeMap<String, String>,
) -> CustomFormField {
    CustomFormField {
        variant,
        name: name.to_string(),
        label: label.to_string(),
        placeholder: String::new(),
        required,
        is_custom_register_field: false,
        enabled_by_default: None,
        default_value: Some(String::new()),
        options,
        version: None,
    }
}

/// Expand one capture setting into the form fields it stands for.
fn capture_fields(setting: &CaptureSetting) -> Vec<CustomFormField> {
    use FormFieldVariant::{Checkbox, Datepicker, Input, Radio, Select};
    let input = |name: &str, label: &str, required: bool| {
        form_field(Input, name, label, required, BTreeMap::new())
    };
    let required = setting.required;

    match setting.key.as_str() {
        "firstNameLastName" => vec![
            input("firstName", "First name", required),
            input("lastName", "Last name", required),
        ],
        "address" => vec![
            input("address", "Address", required),
            input("address2", "Address line 2", false),
            input("city", "City", required),
            input("postCode", "Postal code", required),
            input("state", "State", required),
        ],
        "birthDate" => vec![form_field(
            Datepicker,
            "birthdate",
            "Birthdate",
            false,
            BTreeMap::new(),
        )],
        key => match &setting.question {
            Some(question) => {
                let raw = setting.value.as_deref().unwrap_or_default();
                let options: BTreeMap<String, String> = raw
                    .split(';')
                    .filter(|entry| !entry.is_empty())
                    .map(|entry| match entry.split_once(':') {
                        Some((value, label)) => (value.to_string(), label.to_string()),
                        None => (entry.to_string(), entry.to_string()),
                    })
                    .collect();
                let variant = match (raw.is_empty(), options.len()) {
                    (true, _) => Input,
                    (false, 1) => Checkbox,
                    (false, 2) => Radio,
                    _ => Select,
                };
                vec![form_field(variant, key, question, required, options)]
            }
            None => vec![input(key, key, false)],
        },
    }
}

/// Build the capture update body: known fields as top-level answers, the
/// rest as custom answers.
fn capture_answers(
    fields: &[CustomFormField],
    values: &BTreeMap<String, String>,
) -> Map<String, Value> {
    let mut payload = Map::new();
    let mut custom = Vec::new();

    for field in fields {
        let value = values.get(&field.name).cloned().unwrap_or_default();
        if CAPTURE_FIELDS.contains(&field.name.as_str()) {
            payload.insert(field.name.clone(), Value::String(value));
        } else {
            custom.push(json!({
                "questionId": field.name,
                "question": field.label,
                "value": value,
            }));
        }
    }

    if !custom.is_empty() {
        payload.insert("customAnswers".to_string(), Value::Array(custom));
    }
    payload
}

/// Commerce-first identity provider backed by the MediaStore API.
///
/// Personal shelves live in the customer's `externalData`.
#[derive(Debug)]
pub struct CleengAccountService {
    client: Arc<CleengClient>,
    config: CleengConfig,
}

impl CleengAccountService {
    pub fn new(client: Arc<CleengClient>, config: CleengConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_customer(&self, customer_id: &str) -> ProviderResult<Customer> {
        let response = self
            .client
            .get::<CleengCustomer>(format!("/customers/{customer_id}"), true)
            .await?;
        Ok(require_ok(response)?.into())
    }

    /// Country, currency and locale MediaStore resolves for this client.
    async fn locales(&self) -> Value {
        match self.client.get::<Value>("/locales", false).await {
            Ok(response) if response.is_ok() => response.response_data,
            Ok(response) => {
                warn!(errors = ?response.errors, "locale lookup rejected; using defaults");
                Value::Null
            }
            Err(err) => {
                warn!(error = %err, "locale lookup failed; using defaults");
                Value::Null
            }
        }
    }

    async fn authenticate(&self, auth: CleengAuth) -> ProviderResult<AuthResponse> {
        let auth = AuthData::from(auth);
        self.client.set_tokens(Some(auth.clone())).await?;

        let UserPayload {
            user,
            customer_consents,
        } = self.get_user().await?;
        Ok(AuthResponse {
            auth,
            user,
            customer_consents,
        })
    }

    async fn auth_outcome(
        &self,
        response: ServiceResponse<CleengAuth>,
    ) -> ProviderResult<AuthOutcome> {
        if !response.is_ok() {
            return Ok(ServiceResponse::failed(None, response.errors));
        }
        if response.response_data.jwt.is_empty() {
            return Ok(ServiceResponse::ok(None));
        }

        let auth = self.authenticate(response.response_data).await?;
        Ok(ServiceResponse::ok(Some(auth)))
    }

    /// Read-modify-write of the external data blob. The blob is replaced
    /// whole, so the other shelf is taken from the record as the server
    /// holds it now rather than from the caller's copy.
    async fn modify_external_data(
        &self,
        customer: &Customer,
        modify: impl FnOnce(&mut ExternalData) + Send,
    ) -> ProviderResult<()> {
        let current = self.fetch_customer(&customer.id).await?;
        let mut external = current.external_data.unwrap_or_default();
        modify(&mut external);
        self.update_external_data(customer, external).await
    }

    async fn update_external_data(
        &self,
        customer: &Customer,
        external_data: ExternalData,
    ) -> ProviderResult<()> {
        let body = json!({ "externalData": external_data });
        let response = self
            .client
            .patch::<Value>(format!("/customers/{}", customer.id), body, true)
            .await?;
        require_ok(response).map(|_| ())
    }
}

#[async_trait]
impl AccountService for CleengAccountService {
    fn features(&self) -> AccountServiceFeatures {
        FEATURES
    }

    fn access_model(&self) -> AccessModel {
        if self.config.svod_offer_ids().is_empty() {
            AccessModel::Authvod
        } else {
            AccessModel::Svod
        }
    }

    fn sandbox(&self) -> bool {
        self.client.sandbox()
    }

    fn svod_offer_ids(&self) -> Vec<String> {
        self.config.svod_offer_ids()
    }

    async fn initialize(&self, _restore_url: Option<&str>) -> ProviderResult<()> {
        if self.config.publisher_id.is_empty() {
            return Err(ProviderError::Configuration(
                "Cleeng integration requires a publisher id".to_string(),
            ));
        }
        self.client.restore_tokens().await
    }

    async fn get_auth_data(&self) -> ProviderResult<Option<AuthData>> {
        self.client.valid_tokens().await
    }

    async fn login(&self, args: LoginArgs) -> ProviderResult<AuthOutcome> {
        let body = json!({
            "email": args.email,
            "password": args.password,
            "publisherId": self.config.publisher_id,
        });
        let response = self.client.post::<CleengAuth>("/auths", body, false).await?;
        self.auth_outcome(response).await
    }

    async fn register(&self, args: RegisterArgs) -> ProviderResult<AuthOutcome> {
        let locales = self.locales().await;
        let locale_field = |key: &str, fallback: &str| {
            locales
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };

        let body = json!({
            "email": args.email,
            "password": args.password,
            "publisherId": self.config.publisher_id,
            "locale": locale_field("locale", "en_US"),
            "country": locale_field("country", "US"),
            "currency": locale_field("currency", "EUR"),
        });
        let response = self
            .client
            .post::<CleengAuth>("/customers", body, false)
            .await?;
        let mut outcome = self.auth_outcome(response).await?;

        let Some(auth) = outcome.response_data.as_mut() else {
            return Ok(outcome);
        };
        if args.consents.is_empty() {
            return Ok(outcome);
        }

        let stored = self
            .update_customer_consents(&auth.user, args.consents)
            .await;
        match stored {
            Ok(updated) if updated.is_ok() => {
                auth.customer_consents = updated.response_data;
            }
            Ok(updated) => {
                warn!(errors = ?updated.errors, "registration consents rejected");
            }
            Err(err) => {
                warn!(error = %err, "failed to store registration consents");
            }
        }
        Ok(outcome)
    }

    async fn logout(&self) -> ProviderResult<()> {
        self.client.set_tokens(None).await
    }

    async fn get_user(&self) -> ProviderResult<UserPayload> {
        let customer_id = self.client.customer_id()?;
        let user = self.fetch_customer(&customer_id).await?;
        let customer_consents = self.get_customer_consents(&user).await?;

        Ok(UserPayload {
            user,
            customer_consents,
        })
    }

    async fn get_publisher_consents(&self) -> ProviderResult<Vec<CustomFormField>> {
        let response = self
            .client
            .get::<ConsentsEnvelope>(
                format!("/publishers/{}/consents", self.config.publisher_id),
                false,
            )
            .await?;
        let consents: Vec<PublisherConsent> =
            lenient::parse_list(require_ok(response)?.consents);
        Ok(consents.into_iter().map(CustomFormField::from).collect())
    }

    async fn get_customer_consents(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<ConsentsValue>> {
        let response = self
            .client
            .get::<ConsentsEnvelope>(format!("/customers/{}/consents", customer.id), true)
            .await?;
        Ok(lenient::parse_list(require_ok(response)?.consents))
    }

    async fn update_customer_consents(
        &self,
        customer: &Customer,
        consents: Vec<ConsentsValue>,
    ) -> ProviderResult<ServiceResponse<Vec<ConsentsValue>>> {
        let body = json!({ "id": customer.id, "consents": consents });
        let response = self
            .client
            .put::<Value>(format!("/customers/{}/consents", customer.id), body, true)
            .await?;
        if !response.is_ok() {
            return Ok(ServiceResponse::failed(Vec::new(), response.errors));
        }

        let stored = self.get_customer_consents(customer).await?;
        Ok(ServiceResponse::ok(stored))
    }

    async fn get_registration_fields(
        &self,
        customer: &Customer,
    ) -> ProviderResult<RegistrationFields> {
        let response = self
            .client
            .get::<CaptureStatus>(format!("/customers/{}/capture/status", customer.id), true)
            .await?;
        let status = require_ok(response)?;

        let settings: Vec<CaptureSetting> = lenient::parse_list(status.settings);
        let fields = settings
            .iter()
            .filter(|setting| setting.enabled)
            .flat_map(capture_fields)
            .collect();

        Ok(RegistrationFields {
            before_sign_up: status.should_capture_be_displayed,
            enabled: status.is_capture_enabled,
            fields,
        })
    }

    async fn update_registration_fields_values(
        &self,
        customer: &Customer,
        values: BTreeMap<String, String>,
    ) -> ProviderResult<ServiceResponse<Customer>> {
        let fields = self.get_registration_fields(customer).await?.fields;
        let body = Value::Object(capture_answers(&fields, &values));

        let response = self
            .client
            .put::<Value>(format!("/customers/{}/capture", customer.id), body, true)
            .await?;
        if !response.is_ok() {
            return Ok(ServiceResponse::failed(customer.clone(), response.errors));
        }

        let updated = self.fetch_customer(&customer.id).await?;
        Ok(ServiceResponse::ok(updated))
    }

    async fn update_customer(
        &self,
        args: UpdateCustomerArgs,
    ) -> ProviderResult<ServiceResponse<Customer>> {
        let customer_id = match args.id.clone() {
            Some(id) => id,
            None => self.client.customer_id()?,
        };

        let mut body = Map::new();
        let mut put = |key: &str, value: &Option<String>| {
            if let Some(value) = value {
                body.insert(key.to_string(), Value::String(value.clone()));
            }
        };
        put("email", &args.email);
        put("confirmationPassword", &args.confirmation_password);
        put("firstName", &args.first_name);
        put("lastName", &args.last_name);

        let response = self
            .client
            .patch::<Option<CleengCustomer>>(
                format!("/customers/{customer_id}"),
                Value::Object(body),
                true,
            )
            .await?;
        if !response.is_ok() {
            return Ok(ServiceResponse::rejected(response.errors));
        }

        let customer = match response.response_data {
            Some(customer) => customer.into(),
            None => self.fetch_customer(&customer_id).await?,
        };
        Ok(ServiceResponse::ok(customer))
    }

    async fn reset_password(
        &self,
        customer_email: &str,
        reset_url: Option<&str>,
    ) -> ProviderResult<ServiceResponse<()>> {
        let mut body = json!({
            "customerEmail": customer_email,
            "publisherId": self.config.publisher_id,
        });
        if let Some(url) = reset_url {
            body["resetUrl"] = Value::String(url.to_string());
        }

        let response = self
            .client
            .put::<Value>("/customers/passwords", body, false)
            .await?;
        Ok(response.map(|_| ()))
    }

    async fn change_password_with_reset_token(
        &self,
        args: ChangePasswordWithTokenArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        let body = json!({
            "customerEmail": args.customer_email,
            "publisherId": self.config.publisher_id,
            "resetPasswordToken": args.reset_password_token,
            "newPassword": args.new_password,
        });
        let response = self
            .client
            .patch::<Value>("/customers/passwords", body, false)
            .await?;
        Ok(response.map(|_| ()))
    }

    async fn change_password_with_old_password(
        &self,
        _args: ChangePasswordWithOldPasswordArgs,
    ) -> ProviderResult<ServiceResponse<()>> {
        Err(ProviderError::OperationUnavailable(
            "changePasswordWithOldPassword",
        ))
    }

    async fn get_favorites(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<SerializedFavorite>> {
        Ok(customer
            .external_data
            .as_ref()
            .and_then(|data| data.favorites.clone())
            .unwrap_or_default())
    }

    async fn get_watch_history(
        &self,
        customer: &Customer,
    ) -> ProviderResult<Vec<SerializedWatchHistoryItem>> {
        Ok(customer
            .external_data
            .as_ref()
            .and_then(|data| data.history.clone())
            .unwrap_or_default())
    }

    async fn update_favorites(
        &self,
        customer: &Customer,
        favorites: Vec<SerializedFavorite>,
    ) -> ProviderResult<()> {
        debug!(count = favorites.len(), "writing favorites to customer record");
        self.modify_external_data(customer, |external| {
            external.favorites = Some(favorites);
        })
        .await
    }

    async fn update_watch_history(
        &self,
        customer: &Customer,
        history: Vec<SerializedWatchHistoryItem>,
    ) -> ProviderResult<()> {
        debug!(count = history.len(), "writing watch history to customer record");
        self.modify_external_data(customer, |external| {
            external.history = Some(history);
        })
        .await
    }
}

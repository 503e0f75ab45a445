//! Shared MediaStore client: credentials, token refresh and envelope
//! decoding for the three Cleeng services.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vodkit_contracts::error::{
    INVALID_TOKEN_MESSAGE, ProviderError, ProviderResult,
};
use vodkit_contracts::storage::PreferenceStore;
use vodkit_model::lenient;
use vodkit_model::{AuthData, ServiceResponse};

use super::transport::{CleengRequest, CleengTransport, HttpMethod};

/// Preference key holding the persisted credentials.
pub const AUTH_PERSIST_KEY: &str = "auth";

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CleengAuth {
    pub jwt: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl From<CleengAuth> for AuthData {
    fn from(auth: CleengAuth) -> Self {
        AuthData {
            jwt: auth.jwt,
            refresh_token: auth.refresh_token,
        }
    }
}

/// Claims the client reads from a MediaStore JWT.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JwtClaims {
    #[serde(default, deserialize_with = "optional_id")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl JwtClaims {
    fn expires_within(&self, margin_secs: i64) -> bool {
        self.exp
            .is_some_and(|exp| exp - Utc::now().timestamp() <= margin_secs)
    }
}

/// Decode the payload segment of a JWT without verifying it.
pub(crate) fn decode_jwt_claims(jwt: &str) -> ProviderResult<JwtClaims> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| ProviderError::Decode("malformed JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| ProviderError::Decode(err.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// MediaStore ids are numeric on some endpoints and strings on others.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Split a `{responseData, errors}` body into a [`ServiceResponse`].
///
/// Any error mentioning an invalid JWT becomes
/// [`ProviderError::InvalidToken`]; other errors are rejections. A body
/// that is not an envelope is taken as the response data itself.
pub(crate) fn decode_envelope<T>(body: Value) -> ProviderResult<ServiceResponse<T>>
where
    T: DeserializeOwned + Default,
{
    let (data, errors) = match body {
        Value::Object(mut fields)
            if fields.contains_key("responseData")
                || fields.contains_key("errors") =>
        {
            let errors: Vec<String> = fields
                .remove("errors")
                .map(lenient::parse_list)
                .unwrap_or_default();
            (fields.remove("responseData").unwrap_or(Value::Null), errors)
        }
        other => (other, Vec::new()),
    };

    if errors.iter().any(|err| err.contains(INVALID_TOKEN_MESSAGE)) {
        return Err(ProviderError::InvalidToken);
    }
    if !errors.is_empty() {
        return Ok(ServiceResponse::rejected(errors));
    }
    if data.is_null() {
        return Ok(ServiceResponse::ok(T::default()));
    }
    Ok(ServiceResponse::ok(serde_json::from_value(data)?))
}

/// Turn a rejection into an error for calls whose contract has no room for
/// one.
pub(crate) fn require_ok<T>(response: ServiceResponse<T>) -> ProviderResult<T> {
    match response.errors.into_iter().next() {
        Some(message) => Err(ProviderError::from_message(message)),
        None => Ok(response.response_data),
    }
}

/// Credentials and request plumbing shared by the Cleeng services.
pub struct CleengClient {
    transport: Arc<dyn CleengTransport>,
    storage: Arc<dyn PreferenceStore>,
    sandbox: bool,
    tokens: RwLock<Option<AuthData>>,
    refresh: Mutex<()>,
}

impl std::fmt::Debug for CleengClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleengClient")
            .field("sandbox", &self.sandbox)
            .field("has_tokens", &self.tokens.read().is_some())
            .finish_non_exhaustive()
    }
}

impl CleengClient {
    pub fn new(
        transport: Arc<dyn CleengTransport>,
        storage: Arc<dyn PreferenceStore>,
        sandbox: bool,
    ) -> Self {
        Self {
            transport,
            storage,
            sandbox,
            tokens: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn tokens(&self) -> Option<AuthData> {
        self.tokens.read().clone()
    }

    /// Load persisted credentials. Unreadable entries are discarded.
    pub async fn restore_tokens(&self) -> ProviderResult<()> {
        let stored = self.storage.get_item(AUTH_PERSIST_KEY).await?;
        let auth = stored.and_then(|value| {
            serde_json::from_value::<CleengAuth>(value)
                .map_err(|err| warn!(error = %err, "discarding unreadable stored credentials"))
                .ok()
        });

        if auth.is_some() {
            debug!("restored persisted credentials");
        }
        *self.tokens.write() = auth.map(AuthData::from);
        Ok(())
    }

    /// Replace the credentials in memory and in the preference store.
    pub async fn set_tokens(&self, auth: Option<AuthData>) -> ProviderResult<()> {
        *self.tokens.write() = auth.clone();

        match auth {
            Some(auth) => {
                let value = json!({
                    "jwt": auth.jwt,
                    "refreshToken": auth.refresh_token,
                });
                self.storage.set_json(AUTH_PERSIST_KEY, &value).await?;
            }
            None => self.storage.remove_item(AUTH_PERSIST_KEY).await?,
        }
        Ok(())
    }

    /// Current credentials, refreshed first when close to expiry.
    ///
    /// A refresh the API rejects clears the credentials and reports
    /// [`ProviderError::InvalidToken`].
    pub async fn valid_tokens(&self) -> ProviderResult<Option<AuthData>> {
        let _refresh = self.refresh.lock().await;

        let Some(current) = self.tokens() else {
            return Ok(None);
        };

        let expiring = match decode_jwt_claims(&current.jwt) {
            Ok(claims) => claims.expires_within(REFRESH_MARGIN_SECS),
            Err(err) => {
                debug!(error = %err, "jwt payload unreadable; using token as is");
                false
            }
        };
        if !expiring || current.refresh_token.is_empty() {
            return Ok(Some(current));
        }

        info!("access token expiring; refreshing");
        let request = CleengRequest::new(HttpMethod::Post, "/auths/refresh_token")
            .with_body(json!({ "refreshToken": current.refresh_token }));
        let body = self.transport.send(self.sandbox, request).await?;

        match decode_envelope::<CleengAuth>(body) {
            Ok(response) if response.is_ok() && !response.response_data.jwt.is_empty() => {
                let refreshed = AuthData::from(response.response_data);
                self.set_tokens(Some(refreshed.clone())).await?;
                Ok(Some(refreshed))
            }
            Ok(response) => {
                warn!(errors = ?response.errors, "token refresh rejected");
                self.set_tokens(None).await?;
                Err(ProviderError::InvalidToken)
            }
            Err(err) => {
                if err.is_invalid_token() {
                    self.set_tokens(None).await?;
                }
                Err(err)
            }
        }
    }

    /// Customer id carried by the current access token.
    pub fn customer_id(&self) -> ProviderResult<String> {
        let tokens = self.tokens().ok_or(ProviderError::InvalidToken)?;
        decode_jwt_claims(&tokens.jwt)?
            .customer_id
            .ok_or_else(|| ProviderError::Decode("jwt has no customerId".to_string()))
    }

    pub async fn request<T>(
        &self,
        method: HttpMethod,
        path: impl Into<String>,
        body: Option<Value>,
        authenticate: bool,
    ) -> ProviderResult<ServiceResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        let bearer = if authenticate {
            self.valid_tokens().await?.map(|auth| auth.jwt)
        } else {
            None
        };

        let mut request = CleengRequest::new(method, path).with_bearer(bearer);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let body = self.transport.send(self.sandbox, request).await?;
        decode_envelope(body)
    }

    pub async fn get<T>(
        &self,
        path: impl Into<String>,
        authenticate: bool,
    ) -> ProviderResult<ServiceResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        self.request(HttpMethod::Get, path, None, authenticate).await
    }

    pub async fn post<T>(
        &self,
        path: impl Into<String>,
        body: Value,
        authenticate: bool,
    ) -> ProviderResult<ServiceResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        self.request(HttpMethod::Post, path, Some(body), authenticate)
            .await
    }

    pub async fn put<T>(
        &self,
        path: impl Into<String>,
        body: Value,
        authenticate: bool,
    ) -> ProviderResult<ServiceResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        self.request(HttpMethod::Put, path, Some(body), authenticate)
            .await
    }

    pub async fn patch<T>(
        &self,
        path: impl Into<String>,
        body: Value,
        authenticate: bool,
    ) -> ProviderResult<ServiceResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        self.request(HttpMethod::Patch, path, Some(body), authenticate)
            .await
    }

    pub async fn remove<T>(
        &self,
        path: impl Into<String>,
        authenticate: bool,
    ) -> ProviderResult<ServiceResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        self.request(HttpMethod::Delete, path, None, authenticate)
            .await
    }
}

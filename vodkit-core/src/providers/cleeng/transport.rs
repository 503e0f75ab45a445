use async_trait::async_trait;
use serde_json::Value;
use vodkit_contracts::error::ProviderResult;

pub const SANDBOX_BASE_URL: &str = "https://mediastore-sandbox.cleeng.com";
pub const PRODUCTION_BASE_URL: &str = "https://mediastore.cleeng.com";

pub fn base_url(sandbox: bool) -> &'static str {
    if sandbox {
        SANDBOX_BASE_URL
    } else {
        PRODUCTION_BASE_URL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// One MediaStore API call. `path` is relative to the environment base URL
/// and may carry a query string.
#[derive(Clone, PartialEq)]
pub struct CleengRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl CleengRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, jwt: Option<String>) -> Self {
        self.bearer = jwt;
        self
    }
}

impl std::fmt::Debug for CleengRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleengRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_body", &self.body.is_some())
            .field("authenticated", &self.bearer.is_some())
            .finish()
    }
}

/// Raw exchange with the MediaStore API.
///
/// Implementations return the decoded JSON body of any response that has
/// one, whatever the HTTP status; the envelope's `errors` carry rejections.
/// Only failures without a usable body are `Err`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CleengTransport: Send + Sync {
    async fn send(
        &self,
        sandbox: bool,
        request: CleengRequest,
    ) -> ProviderResult<Value>;
}

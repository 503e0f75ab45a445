use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use vodkit_contracts::error::{ProviderError, ProviderResult};

use super::transport::{CleengRequest, CleengTransport, HttpMethod, base_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`CleengTransport`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpCleengTransport {
    client: Client,
}

impl HttpCleengTransport {
    pub fn new() -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ProviderError::Configuration(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl CleengTransport for HttpCleengTransport {
    async fn send(
        &self,
        sandbox: bool,
        request: CleengRequest,
    ) -> ProviderResult<Value> {
        let url = format!("{}{}", base_url(sandbox), request.path);

        let mut builder = self.client.request(method(request.method), &url);
        if let Some(jwt) = &request.bearer {
            builder = builder.bearer_auth(jwt);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let status = response.status();
        debug!(method = ?request.method, path = %request.path, %status, "cleeng response");

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(body),
            // Receipts come back as bare HTML.
            Err(_) if status.is_success() => Ok(Value::String(text)),
            Err(_) => Err(ProviderError::Transport(format!(
                "Request failed with status {status}: {text}"
            ))),
        }
    }
}

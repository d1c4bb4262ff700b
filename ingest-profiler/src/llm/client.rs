use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{LlmBackend, LlmError, LlmRequest, LlmResponse, LlmResult};
use crate::security::SecureString;

/// Connection settings for [`HttpLlmClient`].
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    endpoint: String,
    api_key: Option<SecureString>,
    model: Option<String>,
    timeout: Duration,
    long_timeout: Duration,
}

impl LlmClientConfig {
    /// Create a config that POSTs requests to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
            timeout: Duration::from_secs(30),
            long_timeout: Duration::from_secs(600),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<SecureString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Model name filled into requests that do not set one.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the timeout for data analysis requests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout for DDL generation and file analysis requests.
    pub fn with_long_timeout(mut self, timeout: Duration) -> Self {
        self.long_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> Option<&SecureString> {
        self.api_key.as_ref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn long_timeout(&self) -> Duration {
        self.long_timeout
    }
}

/// HTTP client for the LLM service.
#[derive(Clone)]
pub struct HttpLlmClient {
    config: Arc<LlmClientConfig>,
    client: Client,
}

impl HttpLlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> LlmResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(LlmError::Configuration {
                message: "LLM endpoint is empty".to_string(),
            });
        }
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// Convert an error response to an LlmError.
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> LlmResult<T> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(LlmError::Authentication { message: body }),
            429 => Err(LlmError::RateLimited {
                retry_after_secs: retry_after,
            }),
            400 => Err(LlmError::InvalidRequest { message: body }),
            status => Err(LlmError::ServerError {
                status,
                message: body,
            }),
        }
    }
}

#[async_trait]
impl LlmBackend for HttpLlmClient {
    #[instrument(skip(self, request), fields(operation = %request.operation_type, endpoint = %self.config.endpoint))]
    async fn complete(&self, request: &LlmRequest) -> LlmResult<LlmResponse> {
        let timeout = if request.operation_type.is_long_running() {
            self.config.long_timeout
        } else {
            self.config.timeout
        };

        let mut body = request.clone();
        if body.model.is_none() {
            body.model = self.config.model.clone();
        }

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .timeout(timeout)
            .json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose());
        }

        let response = builder.send().await.map_err(|e| LlmError::Network {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return self.handle_error_response(response).await;
        }

        let parsed = response
            .json::<LlmResponse>()
            .await
            .map_err(|e| LlmError::Serialization {
                message: e.to_string(),
            })?;
        debug!(status = %parsed.status, length = parsed.content.len(), "LLM response received");
        Ok(parsed)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

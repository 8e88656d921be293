use async_trait::async_trait;
use dokploy_core::ExecutionError;
use serde_json::Value;

use crate::config::McpRuntimeConfig;
use crate::util::{client, parse_response_body};

/// Remote procedure surface of the Dokploy API. Endpoints are procedure
/// names such as `/compose.create`.
#[async_trait]
pub trait DokployBackend: Send + Sync {
    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, ExecutionError>;

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ExecutionError>;
}

pub struct HttpBackend {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &McpRuntimeConfig) -> Result<Self, ExecutionError> {
        let http = client(config.request_timeout).map_err(|e| {
            ExecutionError::other(format!("Failed to build HTTP client: {e}"))
        })?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> Result<reqwest::Url, ExecutionError> {
        let endpoint = endpoint.trim_start_matches('/');
        reqwest::Url::parse(&format!("{}/{endpoint}", self.api_url))
            .map_err(|e| ExecutionError::other(format!("Invalid API URL/endpoint: {e}")))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ExecutionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ExecutionError::MissingCredentials)?;
        let response = request
            .header("x-api-key", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ExecutionError::Transport {
                url: self.api_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExecutionError::Decode(e.to_string()))?;
        let body = parse_response_body(&bytes);

        if status.is_success() {
            return Ok(body);
        }
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            });
        Err(ExecutionError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DokployBackend for HttpBackend {
    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, ExecutionError> {
        let mut url = self.url(endpoint)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        tracing::debug!(%url, "dokploy GET");
        self.send(self.http.get(url)).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ExecutionError> {
        let url = self.url(endpoint)?;
        tracing::debug!(%url, "dokploy POST");
        self.send(self.http.post(url).json(&body)).await
    }
}

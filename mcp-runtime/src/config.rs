use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS_MIN: u64 = 1;
const REQUEST_TIMEOUT_SECS_MAX: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid Dokploy API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

#[derive(Clone, Debug)]
pub struct McpRuntimeConfig {
    /// Base URL procedure endpoints are appended to, e.g. `https://host/api`.
    pub api_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl McpRuntimeConfig {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl {
                url: api_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let timeout_secs = parse_u64_with_bounds(
            timeout_secs,
            REQUEST_TIMEOUT_SECS_MIN,
            REQUEST_TIMEOUT_SECS_MAX,
            REQUEST_TIMEOUT_SECS,
        );
        Ok(Self {
            api_url: api_url.to_string(),
            api_key,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_u64_with_bounds(raw: Option<u64>, min: u64, max: u64, default: u64) -> u64 {
    raw.map_or(default, |parsed| parsed.clamp(min, max))
}

//! FOFA search API client.
//!
//! ### Specification
//!
//! - **Endpoint**: `{api_url}{endpoint}`, default `https://fofa.info/api/v1/search/all`
//! - **Authentication**: API key sent as the `key` query parameter.
//! - **Query**: base64-encoded expression in `qbase64` (see [`query`]).
//! - **Timeouts**: bounded per request; a timeout is reported, never retried.

pub mod error;
pub mod query;
pub mod request;
pub mod response;

pub use error::FofaError;
pub use query::{EncodedQuery, QueryParams, QueryValue, encode_query, query_expression};
pub use request::SearchRequest;
pub use response::SearchResponse;

use std::sync::Arc;
use std::time::{Duration, Instant};

use assetq_core::AppConfig;
use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;

/// Default base URL for the FOFA API.
const DEFAULT_BASE_URL: &str = "https://fofa.info";

/// Default search endpoint.
const DEFAULT_ENDPOINT: &str = "/api/v1/search/all";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = concat!("assetq/", env!("CARGO_PKG_VERSION"));

/// Source of raw search payloads.
///
/// The orchestrator only depends on this trait, so tests can script
/// responses without a network.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Run one search and return the decoded JSON body.
    async fn search(&self, req: &SearchRequest, timeout: Duration) -> Result<Value, FofaError>;
}

/// FOFA API client configuration.
#[derive(Debug, Clone)]
pub struct FofaConfig {
    /// API key from ASSETQ_API_KEY. Only required once a search is sent.
    pub api_key: Option<String>,
    /// Base URL (default: https://fofa.info).
    pub base_url: String,
    /// Search endpoint path (default: /api/v1/search/all).
    pub endpoint: String,
    /// Client-wide request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: assetq/0.x).
    pub user_agent: String,
}

impl Default for FofaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FofaConfig {
    /// Derive client settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.require_api_key().ok().map(str::to_string),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            endpoint: config.endpoint.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Full search URL.
    pub fn search_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }
}

/// FOFA search API client.
#[derive(Debug, Clone)]
pub struct FofaClient {
    http: reqwest::Client,
    config: FofaConfig,
}

impl FofaClient {
    /// Create a new client with the given configuration.
    ///
    /// A missing API key is not an error here; it is reported by the first
    /// search, so cached results stay reachable without one.
    pub fn new(config: FofaConfig) -> Result<Self, FofaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FofaError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    /// Create a new client from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FofaError> {
        Self::new(FofaConfig::from_app_config(config))
    }

    pub fn config(&self) -> &FofaConfig {
        &self.config
    }
}

#[async_trait]
impl AssetSource for FofaClient {
    async fn search(&self, req: &SearchRequest, timeout: Duration) -> Result<Value, FofaError> {
        req.validate()?;
        let api_key = self.config.api_key.as_deref().filter(|k| !k.is_empty()).ok_or(FofaError::MissingApiKey)?;

        let start = Instant::now();
        let url = self.config.search_url();

        tracing::debug!(url = %url, size = req.size, page = req.page, fields = %req.fields, "searching FOFA API");

        let http_response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(req)
            .query(&[("key", api_key)])
            .timeout(timeout)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!("FOFA API response status: {}", status);

        if status == 401 || status == 403 {
            return Err(FofaError::AuthError);
        }

        if status == 429 {
            return Err(FofaError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(FofaError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let payload: Value = serde_json::from_slice(&bytes).map_err(|e| FofaError::Parse(e.to_string()))?;

        let result_count = payload.get("results").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
        tracing::debug!("search completed in {:?}, {} results", start.elapsed(), result_count);

        Ok(payload)
    }
}

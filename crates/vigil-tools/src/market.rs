//! Market-data HTTP client (Financial Modeling Prep style API).

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ToolContext, ToolError, ToolResult};

/// Default market-data API root.
pub(crate) const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Why a market-data request failed. Never shown to users as is.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FetchError {
    #[error("market data API key is not configured")]
    MissingApiKey,
    #[error("API request failed with status {0}")]
    Status(u16),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no price data found for {0}")]
    NoPrice(String),
    #[error("cancelled")]
    Cancelled,
}

/// Shared client for the market-data endpoints.
#[derive(Clone)]
pub struct MarketDataClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MarketDataClient {
    /// Client for `base_url` authenticated with `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Client for the public default endpoint.
    #[must_use]
    pub fn with_default_url(api_key: Option<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key)
    }

    /// GET `{base}/{path}?apikey=…` and return the JSON body.
    pub(crate) async fn fetch(&self, path: &str, ctx: &ToolContext) -> Result<Value, FetchError> {
        let key = self.api_key.as_deref().ok_or(FetchError::MissingApiKey)?;
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(path, "market data request");

        let request = async {
            let response = self
                .http
                .get(&url)
                .query(&[("apikey", key)])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(FetchError::Status(response.status().as_u16()));
            }
            Ok::<Value, FetchError>(response.json::<Value>().await?)
        };

        ctx.cancellable(request)
            .await
            .map_err(|_| FetchError::Cancelled)?
    }

    /// Fetch `path` and return the first element of the array body.
    ///
    /// An empty array becomes [`ToolError::NotFound`] with `not_found`; any
    /// other failure is logged and becomes [`ToolError::Failed`] with `failed`.
    pub(crate) async fn fetch_first(
        &self,
        path: &str,
        ctx: &ToolContext,
        not_found: String,
        failed: &str,
    ) -> ToolResult<Value> {
        let data = self.fetch_list(path, ctx, not_found, failed).await?;
        Ok(data.get(0).cloned().unwrap_or(Value::Null))
    }

    /// Fetch `path` and return the whole body, rejecting an empty array.
    pub(crate) async fn fetch_list(
        &self,
        path: &str,
        ctx: &ToolContext,
        not_found: String,
        failed: &str,
    ) -> ToolResult<Value> {
        match self.fetch(path, ctx).await {
            Ok(data) if data.as_array().is_some_and(Vec::is_empty) => {
                Err(ToolError::NotFound(not_found))
            },
            Ok(data) => Ok(data),
            Err(FetchError::Cancelled) => Err(ToolError::Cancelled),
            Err(e) => {
                warn!(path, error = %e, "market data request failed");
                Err(ToolError::Failed(failed.to_string()))
            },
        }
    }

    /// Latest traded price for `symbol`.
    pub(crate) async fn price(&self, symbol: &str, ctx: &ToolContext) -> Result<f64, FetchError> {
        let data = self.fetch(&format!("quote/{symbol}"), ctx).await?;
        data.get(0)
            .and_then(|q| q.get("price"))
            .and_then(Value::as_f64)
            .ok_or_else(|| FetchError::NoPrice(symbol.to_string()))
    }
}

impl std::fmt::Debug for MarketDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

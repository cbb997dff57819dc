//! Alpha Vantage API client

use crate::config::DEFAULT_ALPHA_VANTAGE_BASE_URL;
use crate::error::ApiError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};

const PROVIDER: &str = "Alpha Vantage";

type Result<T> = std::result::Result<T, ApiError>;
type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

/// One entry of a SYMBOL_SEARCH response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    pub symbol: String,
    #[serde(rename = "2. name")]
    pub name: String,
    #[serde(rename = "4. region", default)]
    pub region: Option<String>,
    #[serde(rename = "9. matchScore", default)]
    pub match_score: Option<String>,
}

impl SymbolMatch {
    /// Match score as reported by the provider, 0 when missing
    pub fn score(&self) -> f64 {
        parse_number(self.match_score.as_deref()).unwrap_or(0.0)
    }
}

/// Company overview and fundamental data
///
/// Alpha Vantage reports every figure as a string, use [`parse_number`] to
/// read them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    pub market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(rename = "EPS")]
    pub eps: Option<String>,
    #[serde(rename = "RevenueTTM")]
    pub revenue_ttm: Option<String>,
    #[serde(rename = "GrossProfitTTM")]
    pub gross_profit_ttm: Option<String>,
    pub profit_margin: Option<String>,
    #[serde(rename = "OperatingMarginTTM")]
    pub operating_margin_ttm: Option<String>,
    #[serde(rename = "ReturnOnEquityTTM")]
    pub return_on_equity_ttm: Option<String>,
    #[serde(rename = "ReturnOnAssetsTTM")]
    pub return_on_assets_ttm: Option<String>,
    #[serde(rename = "52WeekHigh")]
    pub week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    pub week_52_low: Option<String>,
}

/// Current price data from GLOBAL_QUOTE
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    pub symbol: Option<String>,
    #[serde(rename = "05. price")]
    pub price: Option<String>,
    #[serde(rename = "06. volume")]
    pub volume: Option<String>,
    #[serde(rename = "10. change percent")]
    pub change_percent: Option<String>,
}

/// One annual report from INCOME_STATEMENT
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncomeReport {
    pub fiscal_date_ending: Option<String>,
    pub total_revenue: Option<String>,
    pub gross_profit: Option<String>,
    pub operating_income: Option<String>,
    pub net_income: Option<String>,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Self {
        let per_minute =
            NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN.saturating_add(4));
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string(),
            rate_limiter,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Point the client at a different query endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search for symbols matching free-text keywords
    #[instrument(skip(self))]
    pub async fn search_symbol(&self, keywords: &str) -> Result<Vec<SymbolMatch>> {
        let data = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", keywords)])
            .await?;
        parse_search(data)
    }

    /// Get company overview and fundamental data
    #[instrument(skip(self))]
    pub async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        let data = self
            .query(&[("function", "OVERVIEW"), ("symbol", symbol)])
            .await?;
        parse_overview(symbol, data)
    }

    /// Get global quote (current price data), `None` when the symbol has no quote
    #[instrument(skip(self))]
    pub async fn global_quote(&self, symbol: &str) -> Result<Option<GlobalQuote>> {
        let data = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        parse_quote(data)
    }

    /// Get the most recent annual income statement
    #[instrument(skip(self))]
    pub async fn income_statement(&self, symbol: &str) -> Result<Option<IncomeReport>> {
        let data = self
            .query(&[("function", "INCOME_STATEMENT"), ("symbol", symbol)])
            .await?;
        parse_income(data)
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        debug!("Alpha Vantage responded with {} bytes", body.len());
        check_api_messages(serde_json::from_str(&body)?)
    }
}

/// Surface error and throttling notices that arrive with HTTP 200
fn check_api_messages(data: Value) -> Result<Value> {
    if let Some(error) = data.get("Error Message") {
        return Err(ApiError::Provider {
            provider: PROVIDER,
            message: value_text(error),
        });
    }

    for key in ["Note", "Information"] {
        if let Some(note) = data.get(key) {
            return Err(ApiError::RateLimited {
                provider: PROVIDER,
                message: value_text(note),
            });
        }
    }

    Ok(data)
}

fn value_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}

fn is_empty_object(data: &Value) -> bool {
    data.as_object().is_none_or(serde_json::Map::is_empty)
}

fn parse_search(data: Value) -> Result<Vec<SymbolMatch>> {
    match data.get("bestMatches") {
        Some(matches) => Ok(serde_json::from_value(matches.clone())?),
        None => Ok(vec![]),
    }
}

fn parse_overview(symbol: &str, data: Value) -> Result<CompanyOverview> {
    // Unknown symbols come back as an empty object
    if is_empty_object(&data) {
        return Err(ApiError::NotFound(format!("no overview for symbol {symbol}")));
    }

    let mut overview: CompanyOverview = serde_json::from_value(data)?;
    if overview.symbol.is_empty() {
        overview.symbol = symbol.to_string();
    }
    Ok(overview)
}

fn parse_quote(data: Value) -> Result<Option<GlobalQuote>> {
    match data.get("Global Quote") {
        Some(quote) if !is_empty_object(quote) => Ok(Some(serde_json::from_value(quote.clone())?)),
        _ => Ok(None),
    }
}

fn parse_income(data: Value) -> Result<Option<IncomeReport>> {
    let latest = data
        .get("annualReports")
        .and_then(Value::as_array)
        .and_then(|reports| reports.first());

    match latest {
        Some(report) => Ok(Some(serde_json::from_value(report.clone())?)),
        None => Ok(None),
    }
}

/// Parse an Alpha Vantage numeric string
///
/// `"None"`, `"-"` and empty strings mean absent; a trailing `%` is dropped.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    let raw = raw.strip_suffix('%').unwrap_or(raw).trim();
    if raw.is_empty() || raw == "-" || raw.eq_ignore_ascii_case("none") {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

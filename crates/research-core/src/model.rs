//! Normalized data model shared by adapters, aggregator and assembler
//!
//! Everything in here is internal: absent values are `None`, never a
//! placeholder string. Conversion to the display form happens in
//! [`crate::assembler`].

use crate::error::{ResearchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A validated company name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyQuery(String);

impl CompanyQuery {
    /// Maximum accepted length in characters
    pub const MAX_LEN: usize = 200;

    /// Trim and validate a raw company name
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ResearchError::InvalidInput(
                "company name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > Self::MAX_LEN {
            return Err(ResearchError::InvalidInput(format!(
                "company name must be at most {} characters",
                Self::MAX_LEN
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Timeout,
    UpstreamError,
    MalformedResponse,
    AllProvidersFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::UpstreamError => "upstream_error",
            Self::MalformedResponse => "malformed_response",
            Self::AllProvidersFailed => "all_providers_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single adapter call produced no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct ProviderFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ProviderFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, detail)
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamError, detail)
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, detail)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}s", after.as_secs_f64()),
        )
    }
}

/// Outcome of one adapter call for one request
pub type ProviderResult<T> = std::result::Result<T, ProviderFailure>;

/// Identity of the resolved company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
}

/// Financial state of the company; every figure is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub revenue_ttm: Option<f64>,
    pub gross_profit_ttm: Option<f64>,
    pub operating_margin: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub price: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub eps: Option<f64>,
    pub operating_margin_ttm: Option<f64>,
    pub return_on_equity_ttm: Option<f64>,
    pub return_on_assets_ttm: Option<f64>,

    // Latest annual income statement
    pub total_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
}

/// Output of the market-data adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub profile: CompanyProfile,
    pub snapshot: MarketSnapshot,
}

/// A news article mentioning the company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// LLM-generated narrative sections and risks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeAnalysis {
    pub financial_health: String,
    pub market_position: String,
    pub growth_potential: String,
    pub key_metrics_analysis: String,
    pub risks: Vec<String>,
}

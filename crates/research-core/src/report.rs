//! Output schema of a company research request

use crate::model::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Marker rendered for missing numeric values
pub const NOT_AVAILABLE: &str = "N/A";

/// A numeric field as shown to clients: a number or `"N/A"`
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Number(serde_json::Number),
    NotAvailable,
}

impl DisplayValue {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl From<Option<f64>> for DisplayValue {
    fn from(value: Option<f64>) -> Self {
        value
            .and_then(serde_json::Number::from_f64)
            .map_or(Self::NotAvailable, Self::Number)
    }
}

impl From<Option<u64>> for DisplayValue {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::NotAvailable, |v| Self::Number(v.into()))
    }
}

impl Serialize for DisplayValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => n.serialize(serializer),
            Self::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyInfo {
    pub name: String,
    pub ticker: String,
    pub description: String,
    pub sector: String,
    pub industry: String,
}

/// Market snapshot in display form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub revenue_ttm: DisplayValue,
    pub gross_profit_ttm: DisplayValue,
    pub operating_margin: DisplayValue,
    pub pe_ratio: DisplayValue,
    pub market_cap: DisplayValue,
    pub price: DisplayValue,
    pub change_percent: DisplayValue,
    pub volume: DisplayValue,
    pub week_52_high: DisplayValue,
    pub week_52_low: DisplayValue,
    pub eps: DisplayValue,
    pub operating_margin_ttm: DisplayValue,
    pub return_on_equity_ttm: DisplayValue,
    pub return_on_assets_ttm: DisplayValue,
    pub total_revenue: DisplayValue,
    pub gross_profit: DisplayValue,
    pub operating_income: DisplayValue,
    pub net_income: DisplayValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinancialAnalysis {
    pub financial_health: String,
    pub market_position: String,
    pub growth_potential: String,
    pub key_metrics_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsEntry {
    pub title: String,
    pub description: String,
    pub url: String,
    /// RFC 3339, empty when unknown
    pub published_at: String,
    pub source: String,
}

/// Report section fed by one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    MarketData,
    FinancialAnalysis,
    NewsData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Provider returned data
    Ok,
    /// Provider succeeded with nothing to show
    Empty,
    /// Provider failed; the section holds defaults
    Failed,
}

/// How one adapter fared for this request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub provider: String,
    pub section: Section,
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The assembled research report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyReport {
    pub company_info: CompanyInfo,
    pub market_data: MarketSummary,
    pub financial_analysis: FinancialAnalysis,
    pub potential_risks: Vec<String>,
    pub news_data: Vec<NewsEntry>,
    /// Contributing providers, then article URLs
    pub sources: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// True when any provider failed
    pub degraded: bool,
    pub generated_at: DateTime<Utc>,
}

impl CompanyReport {
    /// Diagnostic entry for a section
    pub fn diagnostic(&self, section: Section) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.section == section)
    }
}

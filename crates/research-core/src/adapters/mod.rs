//! Provider adapters
//!
//! Each adapter wraps one upstream API and turns its response, or its
//! failure, into a [`ProviderResult`]. Adapters never retry; retry policy
//! and timeouts belong to the [`Aggregator`](crate::Aggregator).

pub mod market;
pub mod narrative;
pub mod news;

pub use market::AlphaVantageMarketAdapter;
pub use narrative::LlmNarrativeAdapter;
pub use news::NewsApiAdapter;

use crate::model::{MarketData, NarrativeAnalysis, NewsItem, ProviderResult};
use async_trait::async_trait;

/// Resolves a company to a symbol and fetches its quote and fundamentals
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataAdapter: Send + Sync {
    /// Provider identifier used in diagnostics and sources
    fn name(&self) -> &'static str;

    async fn fetch(&self, company_name: &str) -> ProviderResult<MarketData>;
}

/// Fetches recent articles mentioning a company
///
/// Zero articles is a success, not a failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, company_name: &str) -> ProviderResult<Vec<NewsItem>>;
}

/// Produces the narrative sections and risk list
#[async_trait]
pub trait NarrativeAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `market` is context only; it is `None` when the market adapter failed.
    async fn fetch(
        &self,
        company_name: &str,
        market: Option<&MarketData>,
    ) -> ProviderResult<NarrativeAnalysis>;
}

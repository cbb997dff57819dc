//! Company research aggregation
//!
//! Given a company name, this crate queries three providers concurrently and
//! merges their answers into one [`CompanyReport`]:
//!
//! - Market data (Alpha Vantage): symbol lookup, overview, quote, income statement
//! - News (NewsAPI): recent articles mentioning the company
//! - Narrative (OpenAI-compatible LLM): four analysis sections and a risk list
//!
//! # Architecture
//!
//! Each provider sits behind an adapter trait ([`MarketDataAdapter`],
//! [`NewsAdapter`], [`NarrativeAdapter`]) that returns a [`ProviderResult`].
//! The [`Aggregator`] runs the adapters with per-adapter timeouts and an
//! optional [`RetryPolicy`], and hands the outcomes to the
//! [`assembler`], which fills every missing value with its display default.
//! A request fails only for invalid input or when all three providers fail.
//!
//! # Example
//!
//! ```rust,ignore
//! use research_core::{Aggregator, ResearchConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ResearchConfig::from_env()?;
//!     let aggregator = Aggregator::from_config(&config)?;
//!
//!     let report = aggregator.analyze("Tesla").await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod aggregator;
pub mod api;
pub mod assembler;
pub mod config;
pub mod error;
pub mod model;
pub mod prompts;
pub mod report;
pub mod retry;

// Re-export main types for convenience
pub use adapters::{MarketDataAdapter, NarrativeAdapter, NewsAdapter};
pub use aggregator::{AdapterTimeouts, Aggregator};
pub use config::ResearchConfig;
pub use error::{ApiError, ResearchError, Result};
pub use model::{
    CompanyQuery, ErrorKind, MarketData, NarrativeAnalysis, NewsItem, ProviderFailure,
    ProviderResult,
};
pub use report::CompanyReport;
pub use retry::RetryPolicy;

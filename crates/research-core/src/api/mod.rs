//! API clients for the market-data and news providers

pub mod alpha_vantage;
pub mod news_api;

pub use alpha_vantage::{
    AlphaVantageClient, CompanyOverview, GlobalQuote, IncomeReport, SymbolMatch, parse_number,
};
pub use news_api::{Article, ArticleSource, NewsApiClient};

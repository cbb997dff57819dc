//! Market-data adapter backed by Alpha Vantage

use super::MarketDataAdapter;
use crate::api::{
    AlphaVantageClient, CompanyOverview, GlobalQuote, IncomeReport, SymbolMatch, parse_number,
};
use crate::model::{CompanyProfile, MarketData, MarketSnapshot, ProviderFailure, ProviderResult};
use async_trait::async_trait;
use std::cmp::Ordering;
use tracing::{debug, info, instrument, warn};

/// Names resolved without a search round-trip
const WELL_KNOWN_SYMBOLS: &[(&str, &str)] = &[
    ("tesla", "TSLA"),
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("amazon", "AMZN"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("meta", "META"),
    ("facebook", "META"),
    ("netflix", "NFLX"),
    ("nvidia", "NVDA"),
];

/// Market-data adapter: symbol lookup, then overview, quote and income statement
#[derive(Debug, Clone)]
pub struct AlphaVantageMarketAdapter {
    client: AlphaVantageClient,
}

impl AlphaVantageMarketAdapter {
    pub fn new(client: AlphaVantageClient) -> Self {
        Self { client }
    }

    async fn resolve_symbol(&self, company_name: &str) -> ProviderResult<String> {
        if let Some(symbol) = well_known_symbol(company_name) {
            debug!("Using well-known symbol {} for {}", symbol, company_name);
            return Ok(symbol.to_string());
        }

        let matches = self.client.search_symbol(company_name).await?;
        best_match(company_name, &matches)
            .map(|m| m.symbol.to_uppercase())
            .ok_or_else(|| {
                ProviderFailure::not_found(format!("no ticker symbol matches {company_name:?}"))
            })
    }
}

#[async_trait]
impl MarketDataAdapter for AlphaVantageMarketAdapter {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, company_name: &str) -> ProviderResult<MarketData> {
        let symbol = self.resolve_symbol(company_name).await?;
        info!("Resolved {} to {}", company_name, symbol);

        // The overview carries identity, so without it there is nothing to report
        let overview = self.client.company_overview(&symbol).await?;

        let quote = self.client.global_quote(&symbol).await.unwrap_or_else(|e| {
            warn!("Quote for {} unavailable: {}", symbol, e);
            None
        });
        let income = self.client.income_statement(&symbol).await.unwrap_or_else(|e| {
            warn!("Income statement for {} unavailable: {}", symbol, e);
            None
        });

        Ok(build_market_data(&symbol, &overview, quote.as_ref(), income.as_ref()))
    }
}

/// Look up a name in the well-known table, ignoring case and surrounding space
fn well_known_symbol(company_name: &str) -> Option<&'static str> {
    let normalized = company_name.trim().to_lowercase();
    WELL_KNOWN_SYMBOLS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, symbol)| *symbol)
}

/// Pick the best search match
///
/// Exact symbol beats a name containing the query, which beats match score.
/// Ties keep provider order.
fn best_match<'a>(query: &str, matches: &'a [SymbolMatch]) -> Option<&'a SymbolMatch> {
    let query = query.trim().to_lowercase();
    let rank = |m: &SymbolMatch| {
        (
            m.symbol.to_lowercase() == query,
            m.name.to_lowercase().contains(&query),
        )
    };

    matches.iter().fold(None, |best: Option<&SymbolMatch>, candidate| match best {
        Some(current) => {
            let ordering = rank(candidate)
                .cmp(&rank(current))
                .then_with(|| candidate.score().total_cmp(&current.score()));
            if ordering == Ordering::Greater {
                Some(candidate)
            } else {
                Some(current)
            }
        }
        None => Some(candidate),
    })
}

/// Non-placeholder text, trimmed
fn text(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "-" && !v.eq_ignore_ascii_case("none"))
        .map(str::to_string)
}

fn build_market_data(
    symbol: &str,
    overview: &CompanyOverview,
    quote: Option<&GlobalQuote>,
    income: Option<&IncomeReport>,
) -> MarketData {
    let profile = CompanyProfile {
        symbol: symbol.to_string(),
        name: text(overview.name.as_ref()),
        description: text(overview.description.as_ref()),
        sector: text(overview.sector.as_ref()),
        industry: text(overview.industry.as_ref()),
        exchange: text(overview.exchange.as_ref()),
    };

    let num = |value: &Option<String>| parse_number(value.as_deref());

    let mut snapshot = MarketSnapshot {
        revenue_ttm: num(&overview.revenue_ttm),
        gross_profit_ttm: num(&overview.gross_profit_ttm),
        operating_margin: num(&overview.operating_margin_ttm),
        pe_ratio: num(&overview.pe_ratio),
        market_cap: num(&overview.market_cap),
        week_52_high: num(&overview.week_52_high),
        week_52_low: num(&overview.week_52_low),
        eps: num(&overview.eps),
        operating_margin_ttm: num(&overview.operating_margin_ttm),
        return_on_equity_ttm: num(&overview.return_on_equity_ttm),
        return_on_assets_ttm: num(&overview.return_on_assets_ttm),
        ..MarketSnapshot::default()
    };

    if let Some(quote) = quote {
        snapshot.price = num(&quote.price);
        snapshot.change_percent = num(&quote.change_percent);
        snapshot.volume = quote
            .volume
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok());
    }

    if let Some(income) = income {
        snapshot.total_revenue = num(&income.total_revenue);
        snapshot.gross_profit = num(&income.gross_profit);
        snapshot.operating_income = num(&income.operating_income);
        snapshot.net_income = num(&income.net_income);
    }

    MarketData { profile, snapshot }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol_match(symbol: &str, name: &str, score: &str) -> SymbolMatch {
        SymbolMatch {
            symbol: symbol.to_string(),
            name: name.to_string(),
            region: None,
            match_score: Some(score.to_string()),
        }
    }

    #[test]
    fn test_well_known_symbols() {
        assert_eq!(well_known_symbol("Tesla"), Some("TSLA"));
        assert_eq!(well_known_symbol("  FACEBOOK "), Some("META"));
        assert_eq!(well_known_symbol("Alphabet"), Some("GOOGL"));
        assert_eq!(well_known_symbol("Tesla Inc"), None);
    }

    #[test]
    fn test_best_match_prefers_exact_symbol() {
        let matches = vec![
            symbol_match("IBMX", "IBM Extra", "0.9"),
            symbol_match("IBM", "International Business Machines", "0.5"),
        ];
        assert_eq!(best_match("ibm", &matches).unwrap().symbol, "IBM");
    }

    #[test]
    fn test_best_match_prefers_name_containing_query() {
        let matches = vec![
            symbol_match("SNWF", "Snowy Flakes Ltd", "0.9"),
            symbol_match("SNOW", "Snowflake Inc", "0.6"),
        ];
        assert_eq!(best_match("Snowflake", &matches).unwrap().symbol, "SNOW");
    }

    #[test]
    fn test_best_match_falls_back_to_score() {
        let matches = vec![
            symbol_match("AAA", "Alpha", "0.3"),
            symbol_match("BBB", "Beta", "0.7"),
            symbol_match("CCC", "Gamma", "0.7"),
        ];
        // Equal scores keep provider order
        assert_eq!(best_match("zzz", &matches).unwrap().symbol, "BBB");
        assert!(best_match("zzz", &[]).is_none());
    }

    #[test]
    fn test_build_market_data() {
        let overview = CompanyOverview {
            symbol: "TSLA".to_string(),
            name: Some("Tesla Inc".to_string()),
            description: Some("Electric vehicles".to_string()),
            sector: Some("MANUFACTURING".to_string()),
            industry: Some("None".to_string()),
            pe_ratio: Some("62.5".to_string()),
            operating_margin_ttm: Some("0.082".to_string()),
            week_52_high: Some("299.29".to_string()),
            ..CompanyOverview::default()
        };
        let quote = GlobalQuote {
            symbol: Some("TSLA".to_string()),
            price: Some("248.4200".to_string()),
            volume: Some("98765432".to_string()),
            change_percent: Some("-1.2345%".to_string()),
        };

        let data = build_market_data("TSLA", &overview, Some(&quote), None);

        assert_eq!(data.profile.name.as_deref(), Some("Tesla Inc"));
        assert_eq!(data.profile.industry, None);
        assert_eq!(data.snapshot.pe_ratio, Some(62.5));
        assert_eq!(data.snapshot.operating_margin, Some(0.082));
        assert_eq!(data.snapshot.operating_margin_ttm, Some(0.082));
        assert_eq!(data.snapshot.price, Some(248.42));
        assert_eq!(data.snapshot.change_percent, Some(-1.2345));
        assert_eq!(data.snapshot.volume, Some(98_765_432));
        assert_eq!(data.snapshot.net_income, None);
        assert_eq!(data.snapshot.market_cap, None);
    }

    #[test]
    fn test_build_market_data_with_income() {
        let income = IncomeReport {
            total_revenue: Some("96773000000".to_string()),
            net_income: Some("None".to_string()),
            ..IncomeReport::default()
        };

        let data = build_market_data("TSLA", &CompanyOverview::default(), None, Some(&income));

        assert_eq!(data.profile.symbol, "TSLA");
        assert_eq!(data.snapshot.total_revenue, Some(96_773_000_000.0));
        assert_eq!(data.snapshot.net_income, None);
        assert_eq!(data.snapshot.price, None);
    }
}

//! Report assembly
//!
//! Turns the three adapter outcomes into a [`CompanyReport`]. Assembly is
//! total: every failed or missing value is replaced by its display default
//! (`"N/A"` for numbers, `""` for text, `[]` for lists).

use crate::model::{
    CompanyQuery, MarketData, MarketSnapshot, NarrativeAnalysis, NewsItem, ProviderFailure,
    ProviderResult,
};
use crate::report::{
    CompanyInfo, CompanyReport, Diagnostic, FinancialAnalysis, MarketSummary, NOT_AVAILABLE,
    NewsEntry, Section, SectionStatus,
};
use chrono::{SecondsFormat, Utc};

/// Result of one adapter together with the provider that produced it
#[derive(Debug, Clone)]
pub struct AdapterOutcome<T> {
    pub provider: &'static str,
    pub result: ProviderResult<T>,
}

impl<T> AdapterOutcome<T> {
    pub fn new(provider: &'static str, result: ProviderResult<T>) -> Self {
        Self { provider, result }
    }

    pub fn failure(&self) -> Option<&ProviderFailure> {
        self.result.as_ref().err()
    }
}

/// Build the final report from the three adapter outcomes
pub fn assemble(
    query: &CompanyQuery,
    market: AdapterOutcome<MarketData>,
    narrative: AdapterOutcome<NarrativeAnalysis>,
    news: AdapterOutcome<Vec<NewsItem>>,
) -> CompanyReport {
    let diagnostics = vec![
        diagnose(&market, Section::MarketData, |_| false),
        diagnose(&narrative, Section::FinancialAnalysis, |_| false),
        diagnose(&news, Section::NewsData, Vec::is_empty),
    ];
    let degraded = diagnostics
        .iter()
        .any(|d| d.status == SectionStatus::Failed);

    let mut sources: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.status == SectionStatus::Ok)
        .map(|d| d.provider.clone())
        .collect();

    let market = market.result.ok();
    let company_info = company_info(query, market.as_ref());
    let market_data = market_summary(market.map(|m| m.snapshot).unwrap_or_default());

    let (financial_analysis, potential_risks) = match narrative.result {
        Ok(n) => (
            FinancialAnalysis {
                financial_health: n.financial_health,
                market_position: n.market_position,
                growth_potential: n.growth_potential,
                key_metrics_analysis: n.key_metrics_analysis,
            },
            n.risks,
        ),
        Err(_) => (FinancialAnalysis::default(), Vec::new()),
    };

    let news_data: Vec<NewsEntry> = news
        .result
        .unwrap_or_default()
        .into_iter()
        .map(news_entry)
        .collect();
    sources.extend(
        news_data
            .iter()
            .filter(|n| !n.url.is_empty())
            .map(|n| n.url.clone()),
    );

    CompanyReport {
        company_info,
        market_data,
        financial_analysis,
        potential_risks,
        news_data,
        sources,
        diagnostics,
        degraded,
        generated_at: Utc::now(),
    }
}

fn diagnose<T>(
    outcome: &AdapterOutcome<T>,
    section: Section,
    is_empty: impl Fn(&T) -> bool,
) -> Diagnostic {
    let (status, error_kind, detail) = match &outcome.result {
        Ok(value) if is_empty(value) => (SectionStatus::Empty, None, None),
        Ok(_) => (SectionStatus::Ok, None, None),
        Err(failure) => (
            SectionStatus::Failed,
            Some(failure.kind),
            Some(failure.detail.clone()),
        ),
    };

    Diagnostic {
        provider: outcome.provider.to_string(),
        section,
        status,
        error_kind,
        detail,
    }
}

fn or_not_available(value: Option<&String>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), Clone::clone)
}

fn company_info(query: &CompanyQuery, market: Option<&MarketData>) -> CompanyInfo {
    let profile = market.map(|m| &m.profile);

    CompanyInfo {
        name: query.as_str().to_string(),
        ticker: profile
            .map(|p| p.symbol.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        description: or_not_available(profile.and_then(|p| p.description.as_ref())),
        sector: or_not_available(profile.and_then(|p| p.sector.as_ref())),
        industry: or_not_available(profile.and_then(|p| p.industry.as_ref())),
    }
}

fn market_summary(snapshot: MarketSnapshot) -> MarketSummary {
    MarketSummary {
        revenue_ttm: snapshot.revenue_ttm.into(),
        gross_profit_ttm: snapshot.gross_profit_ttm.into(),
        operating_margin: snapshot.operating_margin.into(),
        pe_ratio: snapshot.pe_ratio.into(),
        market_cap: snapshot.market_cap.into(),
        price: snapshot.price.into(),
        change_percent: snapshot.change_percent.into(),
        volume: snapshot.volume.into(),
        week_52_high: snapshot.week_52_high.into(),
        week_52_low: snapshot.week_52_low.into(),
        eps: snapshot.eps.into(),
        operating_margin_ttm: snapshot.operating_margin_ttm.into(),
        return_on_equity_ttm: snapshot.return_on_equity_ttm.into(),
        return_on_assets_ttm: snapshot.return_on_assets_ttm.into(),
        total_revenue: snapshot.total_revenue.into(),
        gross_profit: snapshot.gross_profit.into(),
        operating_income: snapshot.operating_income.into(),
        net_income: snapshot.net_income.into(),
    }
}

fn news_entry(item: NewsItem) -> NewsEntry {
    NewsEntry {
        title: item.title,
        description: item.description.unwrap_or_default(),
        url: item.url,
        published_at: item
            .published_at
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
        source: item.source.unwrap_or_default(),
    }
}

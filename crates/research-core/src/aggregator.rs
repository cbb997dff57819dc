//! Research aggregator
//!
//! Runs the three adapters for one company, each under its own timeout, and
//! folds whatever they return into a [`CompanyReport`]. The narrative call
//! waits for the market call (bounded by the market budget) so it can use
//! the market data as context; the news call runs alongside both.

use crate::adapters::{
    AlphaVantageMarketAdapter, LlmNarrativeAdapter, MarketDataAdapter, NarrativeAdapter,
    NewsAdapter, NewsApiAdapter,
};
use crate::api::{AlphaVantageClient, NewsApiClient};
use crate::assembler::{AdapterOutcome, assemble};
use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::model::{CompanyQuery, ProviderFailure, ProviderResult};
use crate::report::CompanyReport;
use crate::retry::RetryPolicy;
use research_llm::providers::{OpenAIConfig, OpenAIProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Time budget per adapter call, retries included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterTimeouts {
    pub market: Duration,
    pub news: Duration,
    pub narrative: Duration,
}

impl Default for AdapterTimeouts {
    fn default() -> Self {
        Self {
            market: Duration::from_secs(60),
            news: Duration::from_secs(30),
            narrative: Duration::from_secs(180),
        }
    }
}

/// Issues and reconciles the three provider calls of a research request
pub struct Aggregator {
    market: Arc<dyn MarketDataAdapter>,
    news: Arc<dyn NewsAdapter>,
    narrative: Arc<dyn NarrativeAdapter>,
    timeouts: AdapterTimeouts,
    retry: RetryPolicy,
}

impl Aggregator {
    /// Create an aggregator with default timeouts and no retries
    pub fn new(
        market: Arc<dyn MarketDataAdapter>,
        news: Arc<dyn NewsAdapter>,
        narrative: Arc<dyn NarrativeAdapter>,
    ) -> Self {
        Self {
            market,
            news,
            narrative,
            timeouts: AdapterTimeouts::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: AdapterTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeouts(&self) -> AdapterTimeouts {
        self.timeouts
    }

    /// Wire the Alpha Vantage, NewsAPI and OpenAI adapters from configuration
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let alpha_vantage_key =
            ResearchConfig::require_key(&config.alpha_vantage_api_key, "ALPHA_VANTAGE_API_KEY")?;
        let news_key = ResearchConfig::require_key(&config.news_api_key, "NEWS_API_KEY")?;
        let openai_key = ResearchConfig::require_key(&config.openai_api_key, "OPENAI_API_KEY")?;

        let market = AlphaVantageMarketAdapter::new(
            AlphaVantageClient::new(alpha_vantage_key, config.alpha_vantage_rate_limit)
                .with_client(http.clone())
                .with_base_url(&config.alpha_vantage_base_url),
        );

        let news = NewsApiAdapter::new(
            NewsApiClient::new(news_key)
                .with_client(http)
                .with_base_url(&config.news_api_base_url)
                .with_language(&config.news_language)
                .with_sort_by(&config.news_sort_by)
                .with_page_size(config.news_page_size),
        );

        let llm = OpenAIProvider::with_config(
            OpenAIConfig::new(openai_key)
                .with_api_base(&config.openai_api_base)
                .with_timeout(config.narrative_timeout.as_secs().max(1)),
        )?;
        let narrative = LlmNarrativeAdapter::new(Arc::new(llm), &config.openai_model);

        info!(
            model = %config.openai_model,
            max_attempts = config.max_attempts,
            "Research aggregator configured"
        );

        Ok(Self::new(Arc::new(market), Arc::new(news), Arc::new(narrative))
            .with_timeouts(AdapterTimeouts {
                market: config.market_timeout,
                news: config.news_timeout,
                narrative: config.narrative_timeout,
            })
            .with_retry_policy(config.retry_policy()))
    }

    /// Research one company
    ///
    /// Fails only for invalid input (before any provider is called) or when
    /// all three providers fail. Any other combination yields a report, with
    /// failed sections defaulted and recorded in its diagnostics.
    #[instrument(skip(self), fields(request_id = %Uuid::new_v4()))]
    pub async fn analyze(&self, company_name: &str) -> Result<CompanyReport> {
        let query = CompanyQuery::parse(company_name)?;
        let name = query.as_str();

        let market_then_narrative = async {
            let market = self
                .bounded(self.market.name(), self.timeouts.market, || {
                    self.market.fetch(name)
                })
                .await;
            let context = market.as_ref().ok();
            let narrative = self
                .bounded(self.narrative.name(), self.timeouts.narrative, || {
                    self.narrative.fetch(name, context)
                })
                .await;
            (market, narrative)
        };
        let news = self.bounded(self.news.name(), self.timeouts.news, || self.news.fetch(name));

        let ((market, narrative), news) = tokio::join!(market_then_narrative, news);

        match (market, news, narrative) {
            (Err(market), Err(news), Err(narrative)) => {
                warn!("All providers failed for {}", name);
                Err(ResearchError::AllProvidersFailed {
                    market,
                    news,
                    narrative,
                })
            }
            (market, news, narrative) => {
                let report = assemble(
                    &query,
                    AdapterOutcome::new(self.market.name(), market),
                    AdapterOutcome::new(self.narrative.name(), narrative),
                    AdapterOutcome::new(self.news.name(), news),
                );
                info!(degraded = report.degraded, "Report assembled for {}", name);
                Ok(report)
            }
        }
    }

    /// Run one adapter call under the retry policy and its time budget
    async fn bounded<T, F, Fut>(
        &self,
        provider: &'static str,
        budget: Duration,
        operation: F,
    ) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(budget, self.retry.execute(provider, operation)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => {
                warn!("Provider {} failed: {}", provider, failure);
                Err(failure)
            }
            Err(_) => {
                warn!("Provider {} timed out after {:?}", provider, budget);
                Err(ProviderFailure::timeout(budget))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockMarketDataAdapter, MockNewsAdapter};
    use crate::model::{
        CompanyProfile, ErrorKind, MarketData, MarketSnapshot, NarrativeAnalysis, NewsItem,
    };
    use crate::report::{DisplayValue, Section, SectionStatus};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    enum Reply {
        Result(ProviderResult<NarrativeAnalysis>),
        Hang,
    }

    /// Narrative adapter that records the context it was given
    struct FakeNarrative {
        reply: Reply,
        contexts: Mutex<Vec<Option<String>>>,
    }

    impl FakeNarrative {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.contexts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NarrativeAdapter for FakeNarrative {
        fn name(&self) -> &'static str {
            "openai"
        }

        async fn fetch(
            &self,
            _company_name: &str,
            market: Option<&MarketData>,
        ) -> ProviderResult<NarrativeAnalysis> {
            self.contexts
                .lock()
                .unwrap()
                .push(market.map(|m| m.profile.symbol.clone()));
            match &self.reply {
                Reply::Result(result) => result.clone(),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    /// Market adapter that never answers
    struct HangingMarket;

    #[async_trait]
    impl MarketDataAdapter for HangingMarket {
        fn name(&self) -> &'static str {
            "alpha_vantage"
        }

        async fn fetch(&self, _company_name: &str) -> ProviderResult<MarketData> {
            std::future::pending().await
        }
    }

    fn tesla_market() -> MarketData {
        MarketData {
            profile: CompanyProfile {
                symbol: "TSLA".to_string(),
                name: Some("Tesla Inc".to_string()),
                description: Some("Electric vehicles and energy storage".to_string()),
                sector: Some("MANUFACTURING".to_string()),
                industry: Some("MOTOR VEHICLES".to_string()),
                exchange: Some("NASDAQ".to_string()),
            },
            snapshot: MarketSnapshot {
                price: Some(248.42),
                volume: Some(98_765_432),
                pe_ratio: Some(62.5),
                ..MarketSnapshot::default()
            },
        }
    }

    fn tesla_narrative() -> NarrativeAnalysis {
        NarrativeAnalysis {
            financial_health: "Strong cash position".to_string(),
            market_position: "EV market leader".to_string(),
            growth_potential: "Energy storage and autonomy".to_string(),
            key_metrics_analysis: "Premium valuation".to_string(),
            risks: vec![
                "Intensifying competition".to_string(),
                "Key person dependency".to_string(),
            ],
        }
    }

    fn tesla_news() -> Vec<NewsItem> {
        ["https://example.com/1", "https://example.com/2", "https://example.com/3"]
            .iter()
            .enumerate()
            .map(|(i, url)| NewsItem {
                title: format!("Tesla story {i}"),
                description: Some("Summary".to_string()),
                url: (*url).to_string(),
                source: Some("Reuters".to_string()),
                published_at: None,
            })
            .collect()
    }

    fn market_mock(result: ProviderResult<MarketData>) -> MockMarketDataAdapter {
        let mut mock = MockMarketDataAdapter::new();
        mock.expect_name().return_const("alpha_vantage");
        mock.expect_fetch()
            .times(1)
            .returning(move |_| result.clone());
        mock
    }

    fn news_mock(result: ProviderResult<Vec<NewsItem>>) -> MockNewsAdapter {
        let mut mock = MockNewsAdapter::new();
        mock.expect_name().return_const("newsapi");
        mock.expect_fetch()
            .times(1)
            .returning(move |_| result.clone());
        mock
    }

    fn aggregator(
        market: MockMarketDataAdapter,
        news: MockNewsAdapter,
        narrative: Arc<FakeNarrative>,
    ) -> Aggregator {
        Aggregator::new(Arc::new(market), Arc::new(news), narrative)
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected_without_calls() {
        let mut market = MockMarketDataAdapter::new();
        market.expect_fetch().never();
        let mut news = MockNewsAdapter::new();
        news.expect_fetch().never();
        let narrative = FakeNarrative::new(Reply::Result(Ok(tesla_narrative())));

        let aggregator = aggregator(market, news, narrative.clone());

        for name in ["", "   ", "\n\t"] {
            let err = aggregator.analyze(name).await.unwrap_err();
            assert!(matches!(err, ResearchError::InvalidInput(_)));
            assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
        }
        assert_eq!(narrative.calls(), 0);
    }

    #[tokio::test]
    async fn test_tesla_all_providers_succeed() {
        let mut market = MockMarketDataAdapter::new();
        market.expect_name().return_const("alpha_vantage");
        market
            .expect_fetch()
            .withf(|name| name.trim() == "Tesla")
            .times(1)
            .returning(|_| Ok(tesla_market()));
        let narrative = FakeNarrative::new(Reply::Result(Ok(tesla_narrative())));

        let report = aggregator(market, news_mock(Ok(tesla_news())), narrative.clone())
            .analyze("  Tesla ")
            .await
            .unwrap();

        assert_eq!(report.company_info.name, "Tesla");
        assert_eq!(report.company_info.ticker, "TSLA");
        assert!(report.market_data.price.is_available());
        assert_eq!(report.market_data.volume, DisplayValue::from(Some(98_765_432_u64)));
        assert!(!report.financial_analysis.financial_health.is_empty());
        assert!(!report.financial_analysis.market_position.is_empty());
        assert!(!report.financial_analysis.growth_potential.is_empty());
        assert!(!report.financial_analysis.key_metrics_analysis.is_empty());
        assert_eq!(report.potential_risks.len(), 2);

        let titles: Vec<_> = report.news_data.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["Tesla story 0", "Tesla story 1", "Tesla story 2"]);
        assert!(!report.degraded);

        // Narrative received the market data as context
        assert_eq!(
            *narrative.contexts.lock().unwrap(),
            vec![Some("TSLA".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unknown_company_defaults_market_section() {
        let narrative = FakeNarrative::new(Reply::Result(Ok(tesla_narrative())));

        let report = aggregator(
            market_mock(Err(ProviderFailure::not_found("no ticker symbol matches"))),
            news_mock(Ok(tesla_news())),
            narrative.clone(),
        )
        .analyze("Zzzznonexistentcorp")
        .await
        .unwrap();

        let market = serde_json::to_value(&report.market_data).unwrap();
        assert!(market.as_object().unwrap().values().all(|v| v == &json!("N/A")));
        assert_eq!(report.company_info.name, "Zzzznonexistentcorp");
        assert_eq!(report.financial_analysis.market_position, "EV market leader");
        assert_eq!(report.news_data.len(), 3);
        assert!(report.degraded);

        let diagnostic = report.diagnostic(Section::MarketData).unwrap();
        assert_eq!(diagnostic.status, SectionStatus::Failed);
        assert_eq!(diagnostic.error_kind, Some(ErrorKind::NotFound));

        // Narrative still ran, without market context
        assert_eq!(*narrative.contexts.lock().unwrap(), vec![None::<String>]);
    }

    #[tokio::test]
    async fn test_all_providers_failed() {
        let narrative = FakeNarrative::new(Reply::Result(Err(ProviderFailure::upstream(
            "HTTP 503",
        ))));

        let err = aggregator(
            market_mock(Err(ProviderFailure::upstream("connection refused"))),
            news_mock(Err(ProviderFailure::upstream("HTTP 401"))),
            narrative,
        )
        .analyze("Tesla")
        .await
        .unwrap_err();

        match err {
            ResearchError::AllProvidersFailed {
                market,
                news,
                narrative,
            } => {
                assert_eq!(market.detail, "connection refused");
                assert_eq!(news.detail, "HTTP 401");
                assert_eq!(narrative.detail, "HTTP 503");
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_news_is_empty_list() {
        let narrative = FakeNarrative::new(Reply::Result(Ok(tesla_narrative())));

        let report = aggregator(market_mock(Ok(tesla_market())), news_mock(Ok(vec![])), narrative)
            .analyze("Tesla")
            .await
            .unwrap();

        assert!(report.news_data.is_empty());
        assert!(!report.degraded);
        assert_eq!(
            report.diagnostic(Section::NewsData).unwrap().status,
            SectionStatus::Empty
        );
        assert_eq!(serde_json::to_value(&report).unwrap()["news_data"], json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_narrative_times_out() {
        let narrative = FakeNarrative::new(Reply::Hang);
        let aggregator = aggregator(
            market_mock(Ok(tesla_market())),
            news_mock(Ok(tesla_news())),
            narrative,
        )
        .with_timeouts(AdapterTimeouts {
            narrative: Duration::from_secs(5),
            ..AdapterTimeouts::default()
        });

        let started = tokio::time::Instant::now();
        let report = aggregator.analyze("Tesla").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(report.financial_analysis.financial_health, "");
        assert!(report.potential_risks.is_empty());
        assert_eq!(report.company_info.ticker, "TSLA");
        assert_eq!(report.news_data.len(), 3);

        let diagnostic = report.diagnostic(Section::FinancialAnalysis).unwrap();
        assert_eq!(diagnostic.error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_market_runs_narrative_without_context() {
        let narrative = FakeNarrative::new(Reply::Result(Ok(tesla_narrative())));
        let aggregator = Aggregator::new(
            Arc::new(HangingMarket),
            Arc::new(news_mock(Ok(tesla_news()))),
            narrative.clone(),
        )
        .with_timeouts(AdapterTimeouts {
            market: Duration::from_secs(2),
            ..AdapterTimeouts::default()
        });

        let started = tokio::time::Instant::now();
        let report = aggregator.analyze("Tesla").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(*narrative.contexts.lock().unwrap(), vec![None::<String>]);

        let diagnostic = report.diagnostic(Section::MarketData).unwrap();
        assert_eq!(diagnostic.status, SectionStatus::Failed);
        assert_eq!(diagnostic.error_kind, Some(ErrorKind::Timeout));
        assert_eq!(report.company_info.ticker, "N/A");
        assert_eq!(report.market_data.price, DisplayValue::NotAvailable);

        assert_eq!(report.financial_analysis.market_position, "EV market leader");
        assert_eq!(report.potential_risks.len(), 2);
        assert_eq!(report.news_data.len(), 3);
        assert!(report.degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_transient_news_failure() {
        let mut news = MockNewsAdapter::new();
        news.expect_name().return_const("newsapi");
        let mut seq = mockall::Sequence::new();
        news.expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ProviderFailure::upstream("HTTP 502")));
        news.expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(tesla_news()));

        let narrative = FakeNarrative::new(Reply::Result(Ok(tesla_narrative())));
        let report = aggregator(market_mock(Ok(tesla_market())), news, narrative)
            .with_retry_policy(RetryPolicy::fast())
            .analyze("Tesla")
            .await
            .unwrap();

        assert_eq!(report.news_data.len(), 3);
        assert!(!report.degraded);
    }

    #[test]
    fn test_from_config_requires_keys() {
        let config = ResearchConfig::builder()
            .alpha_vantage_api_key("av")
            .openai_api_key("sk-test")
            .build()
            .unwrap();

        let err = Aggregator::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("NEWS_API_KEY"));
    }

    #[test]
    fn test_from_config_applies_timeouts() {
        let config = ResearchConfig::builder()
            .alpha_vantage_api_key("av")
            .news_api_key("news")
            .openai_api_key("sk-test")
            .narrative_timeout(Duration::from_secs(90))
            .build()
            .unwrap();

        let aggregator = Aggregator::from_config(&config).unwrap();
        assert_eq!(aggregator.timeouts().narrative, Duration::from_secs(90));
        assert_eq!(aggregator.timeouts().news, Duration::from_secs(30));
    }
}

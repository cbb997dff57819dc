//! Narrative adapter backed by an LLM provider
//!
//! The model is asked for one JSON object holding the four analysis
//! sections and a `risks` array. A response that does not contain all of
//! them is rejected as a whole; partial text is never passed through.

use super::NarrativeAdapter;
use crate::model::{ErrorKind, MarketData, NarrativeAnalysis, ProviderFailure, ProviderResult};
use crate::prompts::{NARRATIVE_SYSTEM_PROMPT, render_narrative_prompt};
use async_trait::async_trait;
use regex::Regex;
use research_llm::{CompletionRequest, LLMError, LLMProvider, Message, StopReason};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const SECTIONS: [&str; 4] = [
    "financial_health",
    "market_position",
    "growth_potential",
    "key_metrics_analysis",
];

/// Narrative adapter over any [`LLMProvider`]
pub struct LlmNarrativeAdapter {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl LlmNarrativeAdapter {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1500,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl NarrativeAdapter for LlmNarrativeAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, market), fields(model = %self.model, with_market = market.is_some()))]
    async fn fetch(
        &self,
        company_name: &str,
        market: Option<&MarketData>,
    ) -> ProviderResult<NarrativeAnalysis> {
        let prompt = render_narrative_prompt(company_name, market)
            .map_err(|e| ProviderFailure::upstream(format!("prompt rendering failed: {e}")))?;

        let request = CompletionRequest::builder(&self.model)
            .system(NARRATIVE_SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .json_output()
            .build();

        let response = self.provider.complete(request).await.map_err(llm_failure)?;
        debug!("Narrative used {} tokens", response.usage.total());

        if response.stop_reason != StopReason::EndTurn {
            warn!("Narrative generation stopped early: {:?}", response.stop_reason);
        }

        parse_narrative(response.message.text())
    }
}

fn llm_failure(err: LLMError) -> ProviderFailure {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        match err {
            LLMError::SerializationError(_) | LLMError::UnexpectedResponse(_) => {
                ErrorKind::MalformedResponse
            }
            _ => ErrorKind::UpstreamError,
        }
    };
    ProviderFailure::new(kind, err.to_string())
}

/// Remove a surrounding Markdown code fence, if any
fn strip_code_fences(text: &str) -> ProviderResult<&str> {
    let fence = Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*(.*?)\s*```\s*$")
        .map_err(|e| ProviderFailure::upstream(format!("invalid fence pattern: {e}")))?;

    Ok(fence
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| text.trim(), |body| body.as_str()))
}

fn required_section(object: &Map<String, Value>, key: &str) -> ProviderResult<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderFailure::malformed(format!("missing or blank section `{key}`")))
}

/// Parse model output into a [`NarrativeAnalysis`]
fn parse_narrative(text: &str) -> ProviderResult<NarrativeAnalysis> {
    let body = strip_code_fences(text)?;
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProviderFailure::malformed(format!("narrative is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| ProviderFailure::malformed("narrative is not a JSON object"))?;

    let [financial_health, market_position, growth_potential, key_metrics_analysis] =
        SECTIONS.map(|key| required_section(object, key));
    let (financial_health, market_position, growth_potential, key_metrics_analysis) = (
        financial_health?,
        market_position?,
        growth_potential?,
        key_metrics_analysis?,
    );

    let risks = object
        .get("risks")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderFailure::malformed("missing `risks` array"))?
        .iter()
        .map(|risk| {
            risk.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| ProviderFailure::malformed("`risks` must contain only strings"))
        })
        .filter(|risk| !matches!(risk, Ok(s) if s.is_empty()))
        .collect::<ProviderResult<Vec<_>>>()?;

    Ok(NarrativeAnalysis {
        financial_health,
        market_position,
        growth_potential,
        key_metrics_analysis,
        risks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_llm::{CompletionResponse, TokenUsage};
    use std::sync::Mutex;

    const VALID: &str = r#"{
        "financial_health": "Strong balance sheet",
        "market_position": "EV market leader",
        "growth_potential": "Energy storage expansion",
        "key_metrics_analysis": "P/E well above sector",
        "risks": ["Competition from BYD", "Regulatory credits decline"]
    }"#;

    /// Records requests and replies with a canned result
    struct ScriptedProvider {
        reply: Mutex<Option<research_llm::Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: research_llm::Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> research_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            let text = self.reply.lock().unwrap().take().unwrap()?;
            Ok(CompletionResponse {
                message: Message::assistant(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_parse_valid_narrative() {
        let analysis = parse_narrative(VALID).unwrap();
        assert_eq!(analysis.financial_health, "Strong balance sheet");
        assert_eq!(analysis.key_metrics_analysis, "P/E well above sector");
        assert_eq!(analysis.risks.len(), 2);
    }

    #[test]
    fn test_parse_fenced_narrative() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_narrative(&fenced).is_ok());

        let bare_fence = format!("```\n{VALID}\n```\n");
        assert!(parse_narrative(&bare_fence).is_ok());
    }

    #[test]
    fn test_missing_section_is_malformed() {
        let err = parse_narrative(
            r#"{"financial_health": "ok", "market_position": "ok", "growth_potential": "ok", "risks": []}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
        assert!(err.detail.contains("key_metrics_analysis"));
    }

    #[test]
    fn test_blank_section_is_malformed() {
        let err = parse_narrative(
            r#"{"financial_health": "  ", "market_position": "ok", "growth_potential": "ok", "key_metrics_analysis": "ok", "risks": []}"#,
        )
        .unwrap_err();
        assert!(err.detail.contains("financial_health"));
    }

    #[test]
    fn test_bad_risks_are_malformed() {
        let no_risks = r#"{"financial_health": "a", "market_position": "b", "growth_potential": "c", "key_metrics_analysis": "d"}"#;
        assert_eq!(
            parse_narrative(no_risks).unwrap_err().kind,
            ErrorKind::MalformedResponse
        );

        let numeric_risk = r#"{"financial_health": "a", "market_position": "b", "growth_potential": "c", "key_metrics_analysis": "d", "risks": [1]}"#;
        assert_eq!(
            parse_narrative(numeric_risk).unwrap_err().kind,
            ErrorKind::MalformedResponse
        );
    }

    #[test]
    fn test_prose_is_malformed() {
        let err = parse_narrative("Tesla is a strong company with many risks.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_llm_failure_mapping() {
        assert_eq!(
            llm_failure(LLMError::UnexpectedResponse("x".to_string())).kind,
            ErrorKind::MalformedResponse
        );
        assert_eq!(
            llm_failure(LLMError::AuthenticationFailed).kind,
            ErrorKind::UpstreamError
        );
        assert_eq!(
            llm_failure(LLMError::RateLimitExceeded("slow down".to_string())).kind,
            ErrorKind::UpstreamError
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_json_request() {
        let provider = ScriptedProvider::new(Ok(VALID.to_string()));
        let adapter = LlmNarrativeAdapter::new(provider.clone(), "gpt-4-1106-preview");

        let analysis = adapter.fetch("Tesla", None).await.unwrap();
        assert_eq!(analysis.market_position, "EV market leader");

        let requests = provider.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.model, "gpt-4-1106-preview");
        assert_eq!(request.max_tokens, 1500);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(
            request.response_format,
            Some(research_llm::ResponseFormat::JsonObject)
        );
        assert_eq!(request.system.as_deref(), Some(NARRATIVE_SYSTEM_PROMPT));
        assert!(request.messages[0].text().contains("Tesla"));
    }

    #[tokio::test]
    async fn test_fetch_maps_provider_errors() {
        let provider = ScriptedProvider::new(Err(LLMError::RequestFailed("HTTP 503".to_string())));
        let adapter = LlmNarrativeAdapter::new(provider, "gpt-4-1106-preview");

        let err = adapter.fetch("Tesla", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamError);
        assert!(err.detail.contains("HTTP 503"));
    }
}

//! Prompt templates for the narrative analysis
//!
//! Templates use MiniJinja syntax and are rendered per request.

use crate::model::MarketData;
use minijinja::Environment;
use minijinja::value::Value;
use serde::Serialize;

/// System prompt for the narrative model
pub const NARRATIVE_SYSTEM_PROMPT: &str = "You are a financial analyst and risk assessment specialist. \
Analyze the company and respond with a single JSON object only, no other text or formatting.";

const NARRATIVE_USER_TEMPLATE: &str = r#"Analyze the company "{{ company }}" and provide insights.
{% if market_context %}
Financial and market data:
{{ market_context }}
{% else %}
No market data is available for this company; base the analysis on public knowledge.
{% endif %}
Return a JSON object with exactly these keys:
{
  "financial_health": "Analysis of financial stability and performance",
  "market_position": "Analysis of competitive position and market share",
  "growth_potential": "Analysis of future growth opportunities",
  "key_metrics_analysis": "Analysis of important financial ratios and metrics",
  "risks": ["Risk statement", "..."]
}
Each analysis value must be a non-empty string. "risks" must list financial, operational, market and regulatory risks as plain strings."#;

#[derive(Serialize)]
struct NarrativeVars<'a> {
    company: &'a str,
    market_context: Option<String>,
}

/// Render the user prompt for the narrative model
///
/// Market data, when present, is embedded as pretty-printed JSON.
pub fn render_narrative_prompt(
    company: &str,
    market: Option<&MarketData>,
) -> Result<String, minijinja::Error> {
    let market_context = market.and_then(|m| serde_json::to_string_pretty(m).ok());
    let vars = NarrativeVars {
        company,
        market_context,
    };

    Environment::new().render_str(NARRATIVE_USER_TEMPLATE, Value::from_serialize(&vars))
}

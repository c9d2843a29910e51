//! Field-level sanitisation of parsed recommendations.
//!
//! Turns a loosely-typed `ParsedRecommendation` into a schema-valid
//! `Recommendation`: confidence clamped to [0, 100], labels normalised with
//! safe defaults, insights never empty. A BUY reported alongside BEARISH
//! sentiment (or SELL alongside BULLISH) keeps its labels but has its
//! confidence capped.

use tracing::{debug, warn};

use super::Override;
use crate::engine::parser::ParsedRecommendation;
use crate::types::{MarketSentiment, Recommendation, RiskLevel, MAX_CONFIDENCE};

/// Inserted when the model returns no usable insights.
pub const PLACEHOLDER_INSIGHT: &str = "No key insights provided by analysis";

/// Inserted when the model returns no reasoning.
pub const PLACEHOLDER_REASONING: &str = "No reasoning provided";

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Confidence ceiling applied to self-contradictory recommendations.
    pub contradiction_ceiling: u8,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            contradiction_ceiling: 40,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationValidator {
    config: ValidatorConfig,
}

impl RecommendationValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Sanitise a parsed candidate.
    ///
    /// Returns the recommendation and, when directional consistency had to
    /// be enforced, the override that was applied.
    pub fn validate(&self, parsed: ParsedRecommendation) -> (Recommendation, Option<Override>) {
        let mut confidence = clamp_confidence(parsed.confidence);

        let market_sentiment = parsed
            .market_sentiment
            .as_deref()
            .and_then(|s| s.parse::<MarketSentiment>().ok())
            .unwrap_or(MarketSentiment::Neutral);

        let risk_level = parsed
            .risk_level
            .as_deref()
            .and_then(|s| s.parse::<RiskLevel>().ok())
            .unwrap_or(RiskLevel::High);

        let reasoning = parsed
            .reasoning
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_REASONING.to_string());

        let mut key_insights: Vec<String> = parsed
            .key_insights
            .unwrap_or_default()
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if key_insights.is_empty() {
            debug!("LLM returned no insights, inserting placeholder");
            key_insights.push(PLACEHOLDER_INSIGHT.to_string());
        }

        let mut applied = None;
        if market_sentiment.contradicts(parsed.action)
            && confidence > self.config.contradiction_ceiling
        {
            warn!(
                action = %parsed.action,
                sentiment = %market_sentiment,
                confidence,
                ceiling = self.config.contradiction_ceiling,
                "Contradictory recommendation, capping confidence"
            );
            applied = Some(Override::ContradictionSuppressed {
                action: parsed.action,
                sentiment: market_sentiment,
                original_confidence: confidence,
                capped_to: self.config.contradiction_ceiling,
            });
            confidence = self.config.contradiction_ceiling;
        }

        let recommendation = Recommendation {
            action: parsed.action,
            confidence,
            reasoning,
            market_sentiment,
            key_insights,
            risk_level,
        };

        (recommendation, applied)
    }
}

/// Round and clamp a raw confidence into [0, 100]. Missing or NaN → 0.
fn clamp_confidence(raw: Option<f64>) -> u8 {
    match raw {
        Some(c) if c.is_finite() => c.round().clamp(0.0, f64::from(MAX_CONFIDENCE)) as u8,
        Some(c) if c == f64::INFINITY => MAX_CONFIDENCE,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

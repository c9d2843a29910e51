//! Business-rule overrides.
//!
//! Two ordered gates, each of which can only downgrade a directional
//! recommendation to HOLD:
//!
//! 1. Confidence threshold: any BUY/SELL below the threshold.
//! 2. High-risk ceiling: any surviving BUY/SELL rated HIGH risk whose
//!    confidence is below the ceiling, even if it cleared rule 1.
//!
//! Only the action, reasoning, and insights change. Confidence, sentiment,
//! and risk are left as validated.

use tracing::info;

use super::Override;
use crate::types::{Action, Recommendation, RiskLevel};

#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    /// Default minimum confidence for a directional call.
    pub confidence_threshold: u8,
    /// HIGH-risk calls need at least this confidence.
    pub high_risk_ceiling: u8,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 60,
            high_risk_ceiling: 80,
        }
    }
}

/// Stateless rule engine. `apply` is a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct BusinessRules {
    config: RuleConfig,
}

impl BusinessRules {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Apply both rules in order using `threshold` as the confidence gate.
    pub fn apply(
        &self,
        mut rec: Recommendation,
        threshold: u8,
    ) -> (Recommendation, Vec<Override>) {
        let mut applied = Vec::new();

        if rec.is_directional() && rec.confidence < threshold {
            let (original, confidence) = (rec.action, rec.confidence);
            info!(
                action = %original,
                confidence,
                threshold,
                "Confidence below threshold, downgrading to HOLD"
            );
            let note = format!(
                "Original recommendation {original} downgraded to HOLD: confidence {confidence} is below the required threshold of {threshold}."
            );
            let insight = format!(
                "Confidence {confidence} below threshold {threshold}; {original} downgraded to HOLD"
            );
            downgrade(&mut rec, &note, insight);
            applied.push(Override::BelowThreshold {
                original,
                confidence,
                threshold,
            });
        }

        let ceiling = self.config.high_risk_ceiling;
        if rec.is_directional() && rec.risk_level == RiskLevel::High && rec.confidence < ceiling {
            let (original, confidence) = (rec.action, rec.confidence);
            info!(
                action = %original,
                confidence,
                ceiling,
                "High risk below confidence ceiling, downgrading to HOLD"
            );
            let note = format!(
                "High-risk override: {original} downgraded to HOLD because risk is HIGH and confidence {confidence} is below {ceiling}."
            );
            let insight = format!(
                "High risk with confidence {confidence} below {ceiling}; {original} downgraded to HOLD"
            );
            downgrade(&mut rec, &note, insight);
            applied.push(Override::HighRiskCeiling {
                original,
                confidence,
                ceiling,
            });
        }

        (rec, applied)
    }
}

fn downgrade(rec: &mut Recommendation, note: &str, insight: String) {
    rec.action = Action::Hold;
    if rec.reasoning.is_empty() {
        rec.reasoning = note.to_string();
    } else {
        rec.reasoning = format!("{} {note}", rec.reasoning.trim_end());
    }
    rec.key_insights.push(insight);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Strategy layer: sanitisation of LLM candidates and business-rule
//! overrides that can only ever move a recommendation toward HOLD.

pub mod rules;
pub mod validator;

use std::fmt;

use crate::types::{Action, MarketSentiment};

// ---------------------------------------------------------------------------
// Override log
// ---------------------------------------------------------------------------

/// Record of every correction applied after parsing. Kept for the decision
/// trace so callers can see why the final answer differs from the LLM's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    /// Action and sentiment disagreed; confidence was capped.
    ContradictionSuppressed {
        action: Action,
        sentiment: MarketSentiment,
        original_confidence: u8,
        capped_to: u8,
    },
    /// Directional call below the confidence threshold.
    BelowThreshold {
        original: Action,
        confidence: u8,
        threshold: u8,
    },
    /// HIGH-risk directional call below the high-risk ceiling.
    HighRiskCeiling {
        original: Action,
        confidence: u8,
        ceiling: u8,
    },
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Override::ContradictionSuppressed {
                action,
                sentiment,
                original_confidence,
                capped_to,
            } => write!(
                f,
                "{action} with {sentiment} sentiment: confidence {original_confidence} capped to {capped_to}"
            ),
            Override::BelowThreshold {
                original,
                confidence,
                threshold,
            } => write!(f, "{original} → HOLD (confidence {confidence} < threshold {threshold})"),
            Override::HighRiskCeiling {
                original,
                confidence,
                ceiling,
            } => write!(f, "{original} → HOLD (HIGH risk, confidence {confidence} < {ceiling})"),
        }
    }
}

impl Override {
    /// Whether this override changed the action.
    pub fn is_downgrade(&self) -> bool {
        !matches!(self, Override::ContradictionSuppressed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_display() {
        let o = Override::BelowThreshold {
            original: Action::Buy,
            confidence: 50,
            threshold: 60,
        };
        assert_eq!(o.to_string(), "BUY → HOLD (confidence 50 < threshold 60)");
        assert!(o.is_downgrade());

        let o = Override::ContradictionSuppressed {
            action: Action::Sell,
            sentiment: MarketSentiment::Bullish,
            original_confidence: 90,
            capped_to: 40,
        };
        assert!(o.to_string().contains("capped to 40"));
        assert!(!o.is_downgrade());
    }
}

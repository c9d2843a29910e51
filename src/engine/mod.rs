//! Core engine: the one-way gate → prompt → LLM → parse → validate → rules
//! pipeline.
//!
//! Every failure along the way resolves to the conservative default
//! recommendation; callers never see an error value.

pub mod gate;
pub mod parser;
pub mod prompt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::llm::{OracleRequest, RecommendationOracle};
use crate::strategy::rules::{BusinessRules, RuleConfig};
use crate::strategy::validator::{RecommendationValidator, ValidatorConfig};
use crate::strategy::Override;
use crate::types::{Recommendation, SignalBundle};
use gate::{GateConfig, GateRejection, InputGate};
use parser::ParseError;
use prompt::{PromptComposer, DEFAULT_MAX_SAMPLE_TWEETS};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// All thresholds the pipeline uses, passed in explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub gate: GateConfig,
    pub validator: ValidatorConfig,
    pub rules: RuleConfig,
    pub max_sample_tweets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            validator: ValidatorConfig::default(),
            rules: RuleConfig::default(),
            max_sample_tweets: DEFAULT_MAX_SAMPLE_TWEETS,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// One analysis request from an upstream caller.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Target asset symbol, e.g. "BTC".
    pub symbol: String,
    #[serde(default)]
    pub bundle: Option<SignalBundle>,
    /// LLM model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Confidence threshold override for the business rules.
    #[serde(default)]
    pub confidence_threshold: Option<u8>,
}

impl AnalysisRequest {
    pub fn new(symbol: impl Into<String>, bundle: SignalBundle) -> Self {
        Self {
            symbol: symbol.into(),
            bundle: Some(bundle),
            model: None,
            confidence_threshold: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }
}

/// Why the pipeline fell back to the conservative default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("Insufficient data quality: {0}")]
    Rejected(#[from] GateRejection),

    #[error("LLM request failed: {0}")]
    Oracle(String),

    #[error("LLM returned an empty response")]
    EmptyReply,

    #[error("Failed to parse LLM response: {0}")]
    Parse(#[from] ParseError),
}

/// Full trace of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub recommendation: Recommendation,
    /// Set when the recommendation is the conservative default.
    pub failure: Option<FailureReason>,
    /// Whether an LLM request was issued.
    pub oracle_called: bool,
    /// Corrections applied after parsing, in order.
    pub overrides: Vec<Override>,
}

impl Decision {
    fn failed(reason: FailureReason, oracle_called: bool) -> Self {
        Self {
            recommendation: Recommendation::conservative_default(&reason.to_string()),
            failure: Some(reason),
            oracle_called,
            overrides: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Turns signal bundles into bounded, rule-checked recommendations.
///
/// Holds no per-call state: concurrent `analyze` calls are independent and
/// each issues at most one LLM request. Dropping an in-flight call drops
/// the outbound request with it.
pub struct DecisionEngine {
    oracle: Box<dyn RecommendationOracle>,
    gate: InputGate,
    composer: PromptComposer,
    validator: RecommendationValidator,
    rules: BusinessRules,
}

impl DecisionEngine {
    pub fn new(oracle: Box<dyn RecommendationOracle>, config: EngineConfig) -> Self {
        Self {
            oracle,
            gate: InputGate::new(config.gate),
            composer: PromptComposer::new(config.max_sample_tweets),
            validator: RecommendationValidator::new(config.validator),
            rules: BusinessRules::new(config.rules),
        }
    }

    /// Run the full pipeline and return only the final recommendation.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Recommendation {
        self.evaluate(request).await.recommendation
    }

    /// Run the full pipeline, checking freshness against the current time.
    pub async fn evaluate(&self, request: &AnalysisRequest) -> Decision {
        self.evaluate_at(request, Utc::now()).await
    }

    /// Run the full pipeline with an explicit validation time.
    pub async fn evaluate_at(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Decision {
        let span = info_span!(
            "analysis",
            id = %Uuid::new_v4(),
            symbol = %request.symbol,
            provider = self.oracle.provider(),
        );
        let decision = self.run(request, now).instrument(span.clone()).await;

        let _enter = span.enter();
        match &decision.failure {
            Some(reason) => warn!(reason = %reason, "Returning conservative default"),
            None => info!(
                recommendation = %decision.recommendation,
                overrides = decision.overrides.len(),
                downgraded = decision.overrides.iter().any(Override::is_downgrade),
                "Analysis complete"
            ),
        }
        decision
    }

    async fn run(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Decision {
        // 1. Input gate
        let bundle = match self.gate.check(request.bundle.as_ref(), now) {
            Ok(bundle) => bundle,
            Err(rejection) => return Decision::failed(rejection.into(), false),
        };

        // 2. Prompt
        let oracle_request = OracleRequest {
            system: PromptComposer::system_prompt().to_string(),
            prompt: self.composer.compose(bundle, request.symbol.trim()),
            model: request.model.clone(),
        };
        debug!(
            bundle = %bundle,
            prompt_chars = oracle_request.prompt.len(),
            model = ?oracle_request.model,
            "Prompt composed"
        );

        // 3. LLM call (the only await point)
        let reply = match self.oracle.complete(&oracle_request).await {
            Ok(reply) => reply,
            Err(e) => return Decision::failed(FailureReason::Oracle(format!("{e:#}")), true),
        };
        if reply.trim().is_empty() {
            return Decision::failed(FailureReason::EmptyReply, true);
        }

        // 4. Parse
        let parsed = match parser::parse_recommendation(&reply) {
            Ok(parsed) => parsed,
            Err(e) => return Decision::failed(e.into(), true),
        };

        // 5. Validate
        let mut overrides = Vec::new();
        let (candidate, suppressed) = self.validator.validate(parsed);
        overrides.extend(suppressed);

        // 6. Business rules
        let threshold = request
            .confidence_threshold
            .unwrap_or(self.rules.config().confidence_threshold);
        let (recommendation, downgrades) = self.rules.apply(candidate, threshold);
        overrides.extend(downgrades);

        Decision {
            recommendation,
            failure: None,
            oracle_called: true,
            overrides,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

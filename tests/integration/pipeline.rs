//! Full-pipeline scenarios: tweets or scraper output in, bounded
//! recommendation out.

use chrono::{Duration, Utc};
use tokio_test::assert_ok;

use sentiment_advisor::config::AppConfig;
use sentiment_advisor::data::{analyze_tweets, Tweet};
use sentiment_advisor::engine::{AnalysisRequest, DecisionEngine, EngineConfig, FailureReason};
use sentiment_advisor::strategy::Override;
use sentiment_advisor::types::{
    Action, LegacyAnalysis, LegacyScraperResult, MarketSentiment, RiskLevel, SignalBundle,
};

use crate::stub_oracle::StubOracle;

/// 80 tweets: 60 crypto-related (30 positive, 10 negative, 20 neutral).
fn tweet_batch() -> Vec<Tweet> {
    let mut tweets = Vec::new();
    for i in 0..30 {
        tweets.push(Tweet::by(format!("bull{}", i % 3), format!("Bitcoin looking bullish #BTC {i}")));
    }
    for i in 0..10 {
        tweets.push(Tweet::by("bear", format!("Crypto crash is coming #BTC #rekt {i}")));
    }
    for i in 0..20 {
        tweets.push(Tweet::new(format!("Ethereum gas fees today #ETH {i}")));
    }
    for i in 0..20 {
        tweets.push(Tweet::new(format!("Lunch break {i}")));
    }
    tweets
}

fn fresh_bundle() -> SignalBundle {
    analyze_tweets("bitcoin", &tweet_batch(), Utc::now() - Duration::minutes(5))
}

fn engine(stub: &StubOracle) -> DecisionEngine {
    DecisionEngine::new(Box::new(stub.clone()), EngineConfig::default())
}

const CONFIDENT_BUY: &str = r##"```json
{
  "recommendation": "BUY",
  "confidence": 82,
  "reasoning": "Positive tweets outnumber negative three to one.",
  "marketSentiment": "BULLISH",
  "keyInsights": ["50% of crypto tweets positive", "#BTC dominates"],
  "riskLevel": "MEDIUM"
}
```"##;

#[tokio::test]
async fn test_tweets_to_confident_buy() {
    let stub = StubOracle::new().reply(CONFIDENT_BUY);
    let engine = engine(&stub);

    let decision = engine.evaluate(&AnalysisRequest::new("BTC", fresh_bundle())).await;

    assert!(decision.failure.is_none());
    assert_eq!(decision.recommendation.action, Action::Buy);
    assert_eq!(decision.recommendation.confidence, 82);
    assert_eq!(decision.recommendation.key_insights.len(), 2);
    assert_eq!(stub.call_count(), 1);

    let prompt = &stub.requests()[0].prompt;
    assert!(prompt.starts_with("CRYPTO SYMBOL: BTC\n"));
    assert!(prompt.contains("- Total tweets analyzed: 80\n"));
    assert!(prompt.contains("- Crypto-related tweets: 60\n"));
    assert!(prompt.contains("- Positive tweets: 30 (50%)\n"));
    assert!(prompt.contains("- Negative tweets: 10 (17%)\n"));
    assert!(prompt.contains("- Neutral tweets: 20 (33%)\n"));
    assert!(prompt.contains("- Top hashtags: #BTC, #ETH, #rekt\n"));
    assert!(prompt.contains("INFLUENTIAL ACCOUNTS:"));
    assert!(prompt.contains("SAMPLE TWEETS:\n1. \"Bitcoin looking bullish #BTC 0\"\n"));
    assert!(prompt.contains("5. \"Bitcoin looking bullish #BTC 4\"\n"));
    assert!(!prompt.contains("6. \""));
    assert!(!prompt.contains("PRICE CONTEXT:"));
}

#[tokio::test]
async fn test_recommendation_serializes_with_oracle_schema() {
    let stub = StubOracle::new().reply(CONFIDENT_BUY);
    let rec = engine(&stub)
        .analyze(&AnalysisRequest::new("BTC", fresh_bundle()))
        .await;

    let json = assert_ok!(serde_json::to_value(&rec));
    assert_eq!(json["recommendation"], "BUY");
    assert_eq!(json["marketSentiment"], "BULLISH");
    assert_eq!(json["riskLevel"], "MEDIUM");
    assert_eq!(json["confidence"], 82);
    assert!(json["keyInsights"].is_array());
}

#[tokio::test]
async fn test_legacy_scraper_result_flows_through() {
    let legacy = LegacyScraperResult {
        query: "crypto".into(),
        total_tweets: 100,
        analysis: Some(LegacyAnalysis {
            total_crypto_tweets: 40,
            potentially_positive_tweets: 25,
            top_hashtags: Vec::new(),
        }),
    };
    let stub = StubOracle::new().reply(
        r#"{"recommendation":"hold","confidence":55,"reasoning":"Thin edge","marketSentiment":"neutral","keyInsights":[],"riskLevel":"low"}"#,
    );
    let engine = engine(&stub);

    let decision = engine
        .evaluate(&AnalysisRequest::new("ETH", legacy.into_bundle(Utc::now())))
        .await;

    let rec = &decision.recommendation;
    assert_eq!(rec.action, Action::Hold);
    assert_eq!(rec.confidence, 55);
    assert_eq!(rec.risk_level, RiskLevel::Low);
    assert_eq!(rec.key_insights, vec!["No key insights provided by analysis".to_string()]);
    assert!(decision.overrides.is_empty());

    let prompt = &stub.requests()[0].prompt;
    assert!(prompt.contains("- Positive tweets: 25 (63%)\n"));
    assert!(prompt.contains("- Negative tweets: 0 (0%)\n"));
    assert!(prompt.contains("- Neutral tweets: 15 (38%)\n"));
    assert!(prompt.contains("- Top hashtags: #crypto\n"));
}

#[tokio::test]
async fn test_stale_bundle_never_reaches_oracle() {
    let stub = StubOracle::new().reply(CONFIDENT_BUY);
    let engine = engine(&stub);
    let stale = analyze_tweets("bitcoin", &tweet_batch(), Utc::now() - Duration::hours(2));

    let decision = engine.evaluate(&AnalysisRequest::new("BTC", stale)).await;

    assert!(!decision.oracle_called);
    assert_eq!(stub.call_count(), 0);
    assert!(matches!(decision.failure, Some(FailureReason::Rejected(_))));
    assert_eq!(decision.recommendation.action, Action::Hold);
    assert_eq!(decision.recommendation.confidence, 0);
    assert_eq!(decision.recommendation.risk_level, RiskLevel::High);
}

#[tokio::test]
async fn test_transport_failure_yields_default() {
    let stub = StubOracle::new().fail("HTTP 503: upstream unavailable");
    let rec = engine(&stub)
        .analyze(&AnalysisRequest::new("BTC", fresh_bundle()))
        .await;

    assert_eq!(rec.action, Action::Hold);
    assert_eq!(rec.confidence, 0);
    assert_eq!(rec.market_sentiment, MarketSentiment::Neutral);
    assert!(rec.reasoning.contains("upstream unavailable"));
    assert_eq!(rec.key_insights.len(), 2);
}

#[tokio::test]
async fn test_truncated_reply_yields_default() {
    let stub = StubOracle::new().reply(r#"{"recommendation":"BUY","confidence":90,"reason"#);
    let decision = engine(&stub)
        .evaluate(&AnalysisRequest::new("BTC", fresh_bundle()))
        .await;

    assert!(matches!(decision.failure, Some(FailureReason::Parse(_))));
    assert_eq!(decision.recommendation.action, Action::Hold);
}

#[tokio::test]
async fn test_out_of_range_confidence_clamped_then_ruled() {
    let stub = StubOracle::new().reply(
        r#"{"recommendation":"SELL","confidence":150,"reasoning":"x","marketSentiment":"BULLISH","keyInsights":["a"],"riskLevel":"HIGH"}"#,
    );
    let decision = engine(&stub)
        .evaluate(&AnalysisRequest::new("BTC", fresh_bundle()))
        .await;

    // 150 → 100, contradiction caps to 40, threshold then downgrades.
    let rec = &decision.recommendation;
    assert_eq!(rec.action, Action::Hold);
    assert_eq!(rec.confidence, 40);
    assert_eq!(rec.market_sentiment, MarketSentiment::Bullish);
    assert_eq!(decision.overrides.len(), 2);
    assert!(matches!(
        decision.overrides[0],
        Override::ContradictionSuppressed { original_confidence: 100, capped_to: 40, .. }
    ));
    assert!(matches!(
        decision.overrides[1],
        Override::BelowThreshold { original: Action::Sell, confidence: 40, threshold: 60 }
    ));
}

#[tokio::test]
async fn test_concurrent_analyses_are_independent() {
    let stub_a = StubOracle::new().reply(CONFIDENT_BUY);
    let stub_b = StubOracle::new().fail("timeout");
    let engine_a = engine(&stub_a);
    let engine_b = engine(&stub_b);

    let req_a = AnalysisRequest::new("BTC", fresh_bundle());
    let req_b = AnalysisRequest::new("ETH", fresh_bundle()).with_model("anthropic/claude-3.5-haiku");
    let (a, b) = tokio::join!(engine_a.analyze(&req_a), engine_b.analyze(&req_b));

    assert_eq!(a.action, Action::Buy);
    assert_eq!(b.action, Action::Hold);
    assert_eq!(b.confidence, 0);
    assert_eq!(stub_b.requests()[0].model.as_deref(), Some("anthropic/claude-3.5-haiku"));
    assert_eq!(stub_a.requests()[0].model, None);
}

#[tokio::test]
async fn test_same_engine_concurrent_calls_each_reach_oracle() {
    let stub = StubOracle::new().reply(CONFIDENT_BUY).reply(CONFIDENT_BUY);
    let engine = engine(&stub);
    let request = AnalysisRequest::new("BTC", fresh_bundle());

    let (a, b) = tokio::join!(engine.analyze(&request), engine.analyze(&request));

    assert_eq!(a.action, Action::Buy);
    assert_eq!(b.action, Action::Buy);
    assert_eq!(stub.call_count(), 2);
    let requests = stub.requests();
    assert_eq!(requests[0], requests[1]);
}

#[tokio::test]
async fn test_config_thresholds_reach_engine() {
    let cfg = assert_ok!(AppConfig::from_toml(
        "[rules]\nconfidence_threshold = 90\n\n[gates]\nmin_total_tweets = 10\n"
    ));
    let stub = StubOracle::new().reply(CONFIDENT_BUY);
    let engine = DecisionEngine::new(Box::new(stub.clone()), cfg.engine_config());

    let decision = engine.evaluate(&AnalysisRequest::new("BTC", fresh_bundle())).await;
    assert_eq!(decision.recommendation.action, Action::Hold);
    assert_eq!(
        decision.overrides,
        vec![Override::BelowThreshold { original: Action::Buy, confidence: 82, threshold: 90 }]
    );
}

//! Shared types for the sentiment advisor.
//!
//! These types form the data model used across all modules: the
//! `SignalBundle` handed in by upstream scrapers, and the `Recommendation`
//! handed back to callers. Field names serialise in camelCase so the JSON
//! shape matches what the scraper emits and what the LLM is asked to return.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Signal bundle (input)
// ---------------------------------------------------------------------------

/// Structured sentiment/price input to the decision engine.
///
/// Constructed by the caller and treated as immutable once handed over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalBundle {
    /// The search query the tweets were collected for.
    pub query: String,
    pub total_tweets: u64,
    /// Sentiment breakdown. `None` means the scraper produced no analysis.
    #[serde(default)]
    pub analysis: Option<SentimentAnalysis>,
    /// When the underlying data was captured.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub price_data: Option<PriceSnapshot>,
}

impl SignalBundle {
    /// Crypto-relevant tweet count, or 0 when there is no analysis.
    pub fn crypto_tweets(&self) -> u64 {
        self.analysis.as_ref().map_or(0, |a| a.total_crypto_tweets)
    }

    /// Age of the data relative to `now`. Negative for future timestamps.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

impl fmt::Display for SignalBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" ({} tweets, {} crypto, captured {})",
            self.query,
            self.total_tweets,
            self.crypto_tweets(),
            self.timestamp.format("%Y-%m-%d %H:%M UTC"),
        )?;
        if let Some(price) = &self.price_data {
            write!(f, " at {price}")?;
        }
        Ok(())
    }
}

/// Sentiment analysis of the crypto-relevant subset of tweets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub total_crypto_tweets: u64,
    #[serde(default)]
    pub sentiment_breakdown: SentimentBreakdown,
    /// Qualitative trend label, e.g. "BULLISH" or "improving".
    #[serde(default)]
    pub sentiment_trend: Option<String>,
    #[serde(default)]
    pub top_hashtags: Vec<String>,
    #[serde(default)]
    pub influential_accounts: Option<Vec<String>>,
    #[serde(default)]
    pub sample_tweets: Option<Vec<String>>,
}

impl SentimentAnalysis {
    /// Neutral count, filling a missing bucket with whatever the positive
    /// and negative buckets leave of the crypto total.
    pub fn neutral_count(&self) -> u64 {
        let b = &self.sentiment_breakdown;
        b.neutral.unwrap_or_else(|| {
            self.total_crypto_tweets
                .saturating_sub(b.positive.saturating_add(b.negative))
        })
    }

    /// Sum of all three buckets (with the neutral gap filled).
    pub fn bucket_total(&self) -> u64 {
        let b = &self.sentiment_breakdown;
        b.positive
            .saturating_add(b.negative)
            .saturating_add(self.neutral_count())
    }
}

/// Positive / negative / neutral tweet counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SentimentBreakdown {
    #[serde(default)]
    pub positive: u64,
    #[serde(default)]
    pub negative: u64,
    #[serde(default)]
    pub neutral: Option<u64>,
}

/// Price context for the asset at capture time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub current_price: Decimal,
    pub price_24h_ago: Decimal,
    pub price_7d_ago: Decimal,
    /// Percent change over 24h (e.g. -3.5 for -3.5%).
    pub change_24h_pct: Decimal,
    pub change_7d_pct: Decimal,
}

impl fmt::Display for PriceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${} (24h: {:+}%, 7d: {:+}%)",
            self.current_price.round_dp(2),
            self.change_24h_pct.round_dp(2),
            self.change_7d_pct.round_dp(2),
        )
    }
}

// ---------------------------------------------------------------------------
// Legacy scraper shape
// ---------------------------------------------------------------------------

/// The simpler scraper output that only counts "potentially positive"
/// tweets. Projected onto the canonical `SignalBundle` before analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyScraperResult {
    pub query: String,
    #[serde(default)]
    pub total_tweets: u64,
    #[serde(default)]
    pub analysis: Option<LegacyAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAnalysis {
    #[serde(default)]
    pub total_crypto_tweets: u64,
    #[serde(default)]
    pub potentially_positive_tweets: u64,
    #[serde(default)]
    pub top_hashtags: Vec<String>,
}

/// Hashtag assumed when the legacy scraper supplied none.
const LEGACY_DEFAULT_HASHTAG: &str = "#crypto";

impl LegacyScraperResult {
    /// Project onto the canonical bundle. The legacy shape carries no
    /// capture time, so the caller supplies it.
    pub fn into_bundle(self, captured_at: DateTime<Utc>) -> SignalBundle {
        let analysis = self.analysis.map(|a| {
            let positive = a.potentially_positive_tweets;
            let top_hashtags = if a.top_hashtags.is_empty() {
                vec![LEGACY_DEFAULT_HASHTAG.to_string()]
            } else {
                a.top_hashtags
            };
            SentimentAnalysis {
                total_crypto_tweets: a.total_crypto_tweets,
                sentiment_breakdown: SentimentBreakdown {
                    positive,
                    negative: 0,
                    neutral: Some(a.total_crypto_tweets.saturating_sub(positive)),
                },
                sentiment_trend: None,
                top_hashtags,
                influential_accounts: None,
                sample_tweets: None,
            }
        });

        SignalBundle {
            query: self.query,
            total_tweets: self.total_tweets,
            analysis,
            timestamp: captured_at,
            price_data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Directional trading action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Attempt to parse a string into an Action (case-insensitive).
impl std::str::FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            _ => Err(anyhow::anyhow!("Unknown action: {s}")),
        }
    }
}

/// Overall market mood as reported by the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl MarketSentiment {
    /// Whether this sentiment points against the given action.
    /// HOLD never contradicts anything.
    pub fn contradicts(&self, action: Action) -> bool {
        matches!(
            (action, self),
            (Action::Buy, MarketSentiment::Bearish) | (Action::Sell, MarketSentiment::Bullish)
        )
    }
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketSentiment::Bullish => write!(f, "BULLISH"),
            MarketSentiment::Bearish => write!(f, "BEARISH"),
            MarketSentiment::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl std::str::FromStr for MarketSentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BULLISH" => Ok(MarketSentiment::Bullish),
            "BEARISH" => Ok(MarketSentiment::Bearish),
            "NEUTRAL" => Ok(MarketSentiment::Neutral),
            _ => Err(anyhow::anyhow!("Unknown market sentiment: {s}")),
        }
    }
}

/// Risk classification of the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            _ => Err(anyhow::anyhow!("Unknown risk level: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation (output)
// ---------------------------------------------------------------------------

/// Upper bound of the confidence scale.
pub const MAX_CONFIDENCE: u8 = 100;

/// Final trading recommendation returned to callers.
///
/// Invariants: `confidence <= 100` and `key_insights` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "recommendation")]
    pub action: Action,
    pub confidence: u8,
    pub reasoning: String,
    pub market_sentiment: MarketSentiment,
    pub key_insights: Vec<String>,
    pub risk_level: RiskLevel,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (conf: {}% | sentiment: {} | risk: {})",
            self.action, self.confidence, self.market_sentiment, self.risk_level,
        )
    }
}

impl Recommendation {
    /// The maximally conservative fallback: HOLD at zero confidence, high
    /// risk, with `cause` recorded in the reasoning and insights.
    pub fn conservative_default(cause: &str) -> Self {
        Recommendation {
            action: Action::Hold,
            confidence: 0,
            reasoning: format!("Unable to produce a recommendation: {cause}"),
            market_sentiment: MarketSentiment::Neutral,
            key_insights: vec![
                cause.to_string(),
                "Conservative default returned: HOLD with zero confidence".to_string(),
            ],
            risk_level: RiskLevel::High,
        }
    }

    /// Whether this is an actionable (non-HOLD) recommendation.
    pub fn is_directional(&self) -> bool {
        self.action != Action::Hold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Tweet-level sentiment analysis.
//!
//! Turns a batch of raw tweets into a `SignalBundle` using keyword
//! relevance and marker-word sentiment. Pure and deterministic: no
//! network access, no clock reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::types::{SentimentAnalysis, SentimentBreakdown, SignalBundle};

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

const CRYPTO_KEYWORDS: &[&str] = &[
    "bitcoin", "crypto", "ethereum", "blockchain", "altcoin", "trading", "defi", "nft",
];

const POSITIVE_MARKERS: &[&str] = &["🚀", "bullish", "moon", "pump", "breakout"];

const NEGATIVE_MARKERS: &[&str] = &["bearish", "dump", "crash", "rekt", "sell-off", "scam"];

const TOP_N: usize = 5;

/// Trend labels derived from the positive/negative split.
pub const TREND_BULLISH: &str = "BULLISH";
pub const TREND_BEARISH: &str = "BEARISH";
pub const TREND_MIXED: &str = "MIXED";

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// One scraped tweet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tweet {
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl Tweet {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: None,
        }
    }

    pub fn by(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: Some(author.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Positive,
    Negative,
    Neutral,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn contains_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}

/// Whether a tweet mentions any crypto keyword (case-insensitive).
pub fn is_crypto_related(text: &str) -> bool {
    contains_any(&text.to_lowercase(), CRYPTO_KEYWORDS)
}

fn tone(text: &str) -> Tone {
    let lower = text.to_lowercase();
    match (
        contains_any(&lower, POSITIVE_MARKERS),
        contains_any(&lower, NEGATIVE_MARKERS),
    ) {
        (true, false) => Tone::Positive,
        (false, true) => Tone::Negative,
        _ => Tone::Neutral,
    }
}

/// Hashtags in `text`: `#` followed by one or more word characters.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c != '#' {
            continue;
        }
        let mut end = start + 1;
        while let Some(&(i, next)) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                end = i + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        if end > start + 1 {
            tags.push(text[start..end].to_string());
        }
    }
    tags
}

/// The `n` most frequent items; ties keep first-appearance order.
fn top_by_frequency<I>(items: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items {
        let count = counts.entry(item.clone()).or_insert(0);
        if *count == 0 {
            order.push(item);
        }
        *count += 1;
    }
    // sort_by is stable, so equal counts stay in first-seen order
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(n);
    order
}

fn trend_label(positive: u64, negative: u64) -> &'static str {
    // Clear majority (at least 3:2) needed for a directional label.
    if positive * 2 > negative * 3 {
        TREND_BULLISH
    } else if negative * 2 > positive * 3 {
        TREND_BEARISH
    } else {
        TREND_MIXED
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Build a signal bundle from raw tweets captured at `captured_at`.
pub fn analyze_tweets(query: &str, tweets: &[Tweet], captured_at: DateTime<Utc>) -> SignalBundle {
    let crypto: Vec<&Tweet> = tweets.iter().filter(|t| is_crypto_related(&t.text)).collect();

    let mut breakdown = SentimentBreakdown::default();
    let mut neutral = 0u64;
    for tweet in &crypto {
        match tone(&tweet.text) {
            Tone::Positive => breakdown.positive += 1,
            Tone::Negative => breakdown.negative += 1,
            Tone::Neutral => neutral += 1,
        }
    }
    breakdown.neutral = Some(neutral);

    let top_hashtags = top_by_frequency(
        crypto.iter().flat_map(|t| extract_hashtags(&t.text)),
        TOP_N,
    );

    let influencers = top_by_frequency(
        crypto.iter().filter_map(|t| t.author.as_ref()).cloned(),
        TOP_N,
    );

    let samples: Vec<String> = crypto
        .iter()
        .map(|t| t.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(TOP_N)
        .collect();

    debug!(
        query,
        total = tweets.len(),
        crypto = crypto.len(),
        positive = breakdown.positive,
        negative = breakdown.negative,
        neutral,
        "Tweets analysed"
    );

    SignalBundle {
        query: query.to_string(),
        total_tweets: tweets.len() as u64,
        analysis: Some(SentimentAnalysis {
            total_crypto_tweets: crypto.len() as u64,
            sentiment_breakdown: breakdown,
            sentiment_trend: Some(trend_label(breakdown.positive, breakdown.negative).to_string()),
            top_hashtags,
            influential_accounts: Some(influencers).filter(|v| !v.is_empty()),
            sample_tweets: Some(samples).filter(|v| !v.is_empty()),
        }),
        timestamp: captured_at,
        price_data: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

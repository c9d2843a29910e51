//! Input quality gate.
//!
//! Rejects thin or stale signal bundles before any LLM call is made.
//! A recommendation built from a handful of tweets or hour-old data is
//! worse than none, so every check here fails closed.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::SignalBundle;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for the input gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    /// Minimum total tweets scraped.
    pub min_total_tweets: u64,
    /// Minimum crypto-relevant tweets.
    pub min_crypto_tweets: u64,
    /// Maximum age of the capture timestamp.
    pub max_data_age: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_total_tweets: 50,
            min_crypto_tweets: 20,
            max_data_age: Duration::hours(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why a bundle was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("No signal data supplied")]
    MissingBundle,

    #[error("Signal data has no sentiment analysis")]
    MissingAnalysis,

    #[error("Insufficient tweet volume: {actual} tweets (minimum {required})")]
    InsufficientVolume { actual: u64, required: u64 },

    #[error("Insufficient crypto-relevant tweets: {actual} (minimum {required})")]
    InsufficientRelevance { actual: u64, required: u64 },

    #[error("Inconsistent tweet counts: {counted} categorised vs {total} total")]
    InconsistentCounts { counted: u64, total: u64 },

    #[error("Stale data: captured {age_minutes} minutes ago (limit {limit_minutes} minutes)")]
    StaleData { age_minutes: i64, limit_minutes: i64 },
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Volume and freshness checks applied ahead of prompt construction.
#[derive(Debug, Clone, Default)]
pub struct InputGate {
    config: GateConfig,
}

impl InputGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Check a bundle against the gate at time `now`, handing back the
    /// accepted bundle.
    ///
    /// Checks run in a fixed order (presence, volume, relevance, count
    /// consistency, freshness) and the first failure is reported.
    pub fn check<'a>(
        &self,
        bundle: Option<&'a SignalBundle>,
        now: DateTime<Utc>,
    ) -> Result<&'a SignalBundle, GateRejection> {
        let result = self.evaluate(bundle, now);
        match &result {
            Ok(_) => debug!("Signal bundle passed input gate"),
            Err(reason) => warn!(reason = %reason, "Signal bundle rejected by input gate"),
        }
        result
    }

    fn evaluate<'a>(
        &self,
        bundle: Option<&'a SignalBundle>,
        now: DateTime<Utc>,
    ) -> Result<&'a SignalBundle, GateRejection> {
        let bundle = bundle.ok_or(GateRejection::MissingBundle)?;
        let analysis = bundle.analysis.as_ref().ok_or(GateRejection::MissingAnalysis)?;

        if bundle.total_tweets < self.config.min_total_tweets {
            return Err(GateRejection::InsufficientVolume {
                actual: bundle.total_tweets,
                required: self.config.min_total_tweets,
            });
        }

        if analysis.total_crypto_tweets < self.config.min_crypto_tweets {
            return Err(GateRejection::InsufficientRelevance {
                actual: analysis.total_crypto_tweets,
                required: self.config.min_crypto_tweets,
            });
        }

        let counted = analysis.bucket_total().max(analysis.total_crypto_tweets);
        if counted > bundle.total_tweets {
            return Err(GateRejection::InconsistentCounts {
                counted,
                total: bundle.total_tweets,
            });
        }

        let age = bundle.age_at(now);
        if age > self.config.max_data_age {
            return Err(GateRejection::StaleData {
                age_minutes: age.num_minutes(),
                limit_minutes: self.config.max_data_age.num_minutes(),
            });
        }

        Ok(bundle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

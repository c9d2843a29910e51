//! Prompt construction for the recommendation LLM.
//!
//! Renders a `SignalBundle` into a plain-text brief ending with an explicit
//! JSON output contract. Pure string building: the same bundle and symbol
//! always produce byte-identical text.

use crate::types::{PriceSnapshot, SentimentAnalysis, SignalBundle};

/// Default number of sample tweets quoted in the prompt.
pub const DEFAULT_MAX_SAMPLE_TWEETS: usize = 5;

/// The JSON object the LLM must return.
const OUTPUT_SCHEMA: &str = r#"{
  "recommendation": "BUY" or "SELL" or "HOLD",
  "confidence": [integer between 0-100],
  "reasoning": [concise explanation],
  "marketSentiment": "BULLISH" or "BEARISH" or "NEUTRAL",
  "keyInsights": [array of key observations from the data],
  "riskLevel": "LOW" or "MEDIUM" or "HIGH"
}"#;

/// Builds system and user prompts for a single analysis.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    max_sample_tweets: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLE_TWEETS)
    }
}

impl PromptComposer {
    pub fn new(max_sample_tweets: usize) -> Self {
        Self { max_sample_tweets }
    }

    /// Fixed system instruction: expert persona plus calibration rules.
    pub fn system_prompt() -> &'static str {
        "You are a cryptocurrency trading expert analysing Twitter sentiment and \
         price data. Your job is to turn noisy social signals into a cautious, \
         well-calibrated trading recommendation.\n\n\
         CALIBRATION RULES:\n\
         1. Reserve confidence of 80 or above for signals that are strongly \
            corroborated across sentiment, volume, and price action.\n\
         2. When signals are mixed or contradictory, recommend HOLD.\n\
         3. Treat high risk combined with low confidence as grounds for caution.\n\
         4. Your marketSentiment must be consistent with your recommendation.\n\
         5. You MUST respond ONLY with the JSON object specified in the prompt, \
            no other text."
    }

    /// Render the user prompt for `bundle` and the target `symbol`.
    pub fn compose(&self, bundle: &SignalBundle, symbol: &str) -> String {
        let mut prompt = String::with_capacity(2000);

        prompt.push_str(&format!("CRYPTO SYMBOL: {symbol}\n"));
        prompt.push_str("TWITTER SENTIMENT ANALYSIS:\n");
        prompt.push_str(&format!("- Query: \"{}\"\n", bundle.query));
        prompt.push_str(&format!("- Total tweets analyzed: {}\n", bundle.total_tweets));

        if let Some(analysis) = &bundle.analysis {
            self.push_analysis(&mut prompt, analysis);
        }

        if let Some(price) = &bundle.price_data {
            push_price(&mut prompt, price);
        }

        prompt.push_str(
            "\nBased on this data, provide a trading recommendation in the following JSON format:\n",
        );
        prompt.push_str(OUTPUT_SCHEMA);
        prompt.push_str("\n\nRespond ONLY with the JSON object, no other text.\n");

        prompt
    }

    fn push_analysis(&self, prompt: &mut String, analysis: &SentimentAnalysis) {
        let total = analysis.total_crypto_tweets;
        let breakdown = &analysis.sentiment_breakdown;
        let neutral = analysis.neutral_count();

        prompt.push_str(&format!("- Crypto-related tweets: {total}\n"));
        prompt.push_str(&format!(
            "- Positive tweets: {} ({}%)\n",
            breakdown.positive,
            percent_of(breakdown.positive, total)
        ));
        prompt.push_str(&format!(
            "- Negative tweets: {} ({}%)\n",
            breakdown.negative,
            percent_of(breakdown.negative, total)
        ));
        prompt.push_str(&format!(
            "- Neutral tweets: {} ({}%)\n",
            neutral,
            percent_of(neutral, total)
        ));

        if let Some(trend) = analysis.sentiment_trend.as_deref().filter(|t| !t.trim().is_empty()) {
            prompt.push_str(&format!("- Sentiment trend: {}\n", trend.trim()));
        }

        if analysis.top_hashtags.is_empty() {
            prompt.push_str("- Top hashtags: none\n");
        } else {
            prompt.push_str(&format!("- Top hashtags: {}\n", analysis.top_hashtags.join(", ")));
        }

        if let Some(accounts) = analysis.influential_accounts.as_ref().filter(|a| !a.is_empty()) {
            prompt.push_str("\nINFLUENTIAL ACCOUNTS:\n");
            for account in accounts {
                prompt.push_str(&format!("- {account}\n"));
            }
        }

        if let Some(samples) = analysis.sample_tweets.as_ref().filter(|s| !s.is_empty()) {
            prompt.push_str("\nSAMPLE TWEETS:\n");
            for (i, text) in samples.iter().take(self.max_sample_tweets).enumerate() {
                prompt.push_str(&format!("{}. \"{}\"\n", i + 1, single_line(text)));
            }
        }
    }
}

fn push_price(prompt: &mut String, price: &PriceSnapshot) {
    prompt.push_str("\nPRICE CONTEXT:\n");
    prompt.push_str(&format!("- Current price: ${}\n", price.current_price.round_dp(2)));
    prompt.push_str(&format!(
        "- 24h ago: ${} (change: {:+}%)\n",
        price.price_24h_ago.round_dp(2),
        price.change_24h_pct.round_dp(2)
    ));
    prompt.push_str(&format!(
        "- 7d ago: ${} (change: {:+}%)\n",
        price.price_7d_ago.round_dp(2),
        price.change_7d_pct.round_dp(2)
    ));
}

/// `part / total * 100`, rounded half-up. Zero when `total` is zero.
pub fn percent_of(part: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (part, total) = (u128::from(part), u128::from(total));
    ((200 * part + total) / (2 * total)) as u64
}

/// Collapse newlines so each sample stays on one prompt line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentimentBreakdown;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn full_bundle() -> SignalBundle {
        SignalBundle {
            query: "bitcoin OR btc".into(),
            total_tweets: 120,
            analysis: Some(SentimentAnalysis {
                total_crypto_tweets: 80,
                sentiment_breakdown: SentimentBreakdown {
                    positive: 50,
                    negative: 10,
                    neutral: None,
                },
                sentiment_trend: Some("BULLISH".into()),
                top_hashtags: vec!["#btc".into(), "#crypto".into()],
                influential_accounts: Some(vec!["@saylor".into()]),
                sample_tweets: Some(
                    (1..=7).map(|i| format!("tweet number {i}\nto the moon")).collect(),
                ),
            }),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            price_data: Some(PriceSnapshot {
                current_price: dec!(67000),
                price_24h_ago: dec!(66000),
                price_7d_ago: dec!(60000),
                change_24h_pct: dec!(1.52),
                change_7d_pct: dec!(11.67),
            }),
        }
    }

    fn bare_bundle() -> SignalBundle {
        SignalBundle {
            query: "eth".into(),
            total_tweets: 60,
            analysis: Some(SentimentAnalysis {
                total_crypto_tweets: 25,
                sentiment_breakdown: SentimentBreakdown {
                    positive: 5,
                    negative: 5,
                    neutral: Some(15),
                },
                sentiment_trend: None,
                top_hashtags: vec!["#eth".into()],
                influential_accounts: None,
                sample_tweets: Some(Vec::new()),
            }),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            price_data: None,
        }
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(50, 80), 63);
        assert_eq!(percent_of(10, 80), 13);
        assert_eq!(percent_of(20, 80), 25);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(5, 0), 0);
        assert_eq!(percent_of(0, 10), 0);
    }

    #[test]
    fn test_system_prompt_calibration() {
        let sp = PromptComposer::system_prompt();
        assert!(sp.contains("80"));
        assert!(sp.contains("HOLD"));
        assert!(sp.contains("JSON"));
    }

    #[test]
    fn test_compose_full_bundle() {
        let prompt = PromptComposer::default().compose(&full_bundle(), "BTC");
        assert!(prompt.starts_with("CRYPTO SYMBOL: BTC\n"));
        assert!(prompt.contains("- Query: \"bitcoin OR btc\""));
        assert!(prompt.contains("- Total tweets analyzed: 120"));
        assert!(prompt.contains("- Crypto-related tweets: 80"));
        assert!(prompt.contains("- Positive tweets: 50 (63%)"));
        assert!(prompt.contains("- Negative tweets: 10 (13%)"));
        assert!(prompt.contains("- Neutral tweets: 20 (25%)"));
        assert!(prompt.contains("- Sentiment trend: BULLISH"));
        assert!(prompt.contains("- Top hashtags: #btc, #crypto"));
        assert!(prompt.contains("INFLUENTIAL ACCOUNTS:\n- @saylor"));
        assert!(prompt.contains("PRICE CONTEXT:"));
        assert!(prompt.contains("- Current price: $67000"));
        assert!(prompt.contains("(change: +1.52%)"));
        assert!(prompt.contains("(change: +11.67%)"));
        assert!(prompt.trim_end().ends_with("Respond ONLY with the JSON object, no other text."));
    }

    #[test]
    fn test_compose_limits_samples_to_five() {
        let prompt = PromptComposer::default().compose(&full_bundle(), "BTC");
        assert!(prompt.contains("1. \"tweet number 1 to the moon\""));
        assert!(prompt.contains("5. \"tweet number 5 to the moon\""));
        assert!(!prompt.contains("tweet number 6"));
    }

    #[test]
    fn test_compose_omits_absent_sections() {
        let prompt = PromptComposer::default().compose(&bare_bundle(), "ETH");
        assert!(!prompt.contains("SAMPLE TWEETS"));
        assert!(!prompt.contains("INFLUENTIAL ACCOUNTS"));
        assert!(!prompt.contains("PRICE CONTEXT"));
        assert!(!prompt.contains("Sentiment trend"));
        assert!(prompt.contains("- Neutral tweets: 15 (60%)"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = PromptComposer::default();
        let bundle = full_bundle();
        assert_eq!(composer.compose(&bundle, "BTC"), composer.compose(&bundle, "BTC"));
    }

    #[test]
    fn test_compose_zero_crypto_tweets() {
        let mut bundle = bare_bundle();
        if let Some(a) = bundle.analysis.as_mut() {
            a.total_crypto_tweets = 0;
            a.sentiment_breakdown = SentimentBreakdown::default();
            a.top_hashtags.clear();
        }
        let prompt = PromptComposer::default().compose(&bundle, "ETH");
        assert!(prompt.contains("- Positive tweets: 0 (0%)"));
        assert!(prompt.contains("- Top hashtags: none"));
    }

    #[test]
    fn test_compose_contains_schema_contract() {
        let prompt = PromptComposer::default().compose(&bare_bundle(), "ETH");
        assert!(prompt.contains("\"recommendation\": \"BUY\" or \"SELL\" or \"HOLD\""));
        assert!(prompt.contains("\"keyInsights\""));
        assert!(prompt.contains("\"riskLevel\""));
    }
}

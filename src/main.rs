//! Sentiment Advisor CLI.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! reads one analysis request from a JSON file and prints the resulting
//! recommendation as JSON on stdout.
//!
//! Usage: `sentiment-advisor <request.json> [config.toml]`

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use sentiment_advisor::config::AppConfig;
use sentiment_advisor::data::{analyze_tweets, Tweet};
use sentiment_advisor::engine::{AnalysisRequest, DecisionEngine};
use sentiment_advisor::llm::anthropic::AnthropicClient;
use sentiment_advisor::llm::openrouter::OpenRouterClient;
use sentiment_advisor::llm::RecommendationOracle;
use sentiment_advisor::types::LegacyScraperResult;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Request file shape: an `AnalysisRequest`, optionally with its signal
/// data in one of the alternative forms. An explicit `bundle` wins over
/// `legacy`, which wins over `tweets`.
#[derive(Debug, Deserialize)]
struct RequestFile {
    #[serde(flatten)]
    request: AnalysisRequest,
    #[serde(default)]
    legacy: Option<LegacyScraperResult>,
    #[serde(default)]
    tweets: Option<TweetBatch>,
}

#[derive(Debug, Deserialize)]
struct TweetBatch {
    query: String,
    tweets: Vec<Tweet>,
}

impl RequestFile {
    fn into_request(self) -> AnalysisRequest {
        let now = Utc::now();
        let mut request = self.request;
        if request.bundle.is_none() {
            request.bundle = self
                .legacy
                .map(|legacy| legacy.into_bundle(now))
                .or_else(|| {
                    self.tweets
                        .map(|batch| analyze_tweets(&batch.query, &batch.tweets, now))
                });
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let mut args = std::env::args().skip(1);
    let request_path = args
        .next()
        .context("usage: sentiment-advisor <request.json> [config.toml]")?;
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        info!(path = %config_path, "No config file found, using defaults");
        AppConfig::default()
    };

    let contents = std::fs::read_to_string(&request_path)
        .with_context(|| format!("Failed to read request file: {request_path}"))?;
    let request = serde_json::from_str::<RequestFile>(&contents)
        .with_context(|| format!("Failed to parse request file: {request_path}"))?
        .into_request();

    let oracle = build_oracle(&cfg)?;
    let engine = DecisionEngine::new(oracle, cfg.engine_config());

    let recommendation = engine.analyze(&request).await;
    println!("{}", serde_json::to_string_pretty(&recommendation)?);

    Ok(())
}

/// Construct the configured LLM transport.
///
/// A missing API key is not fatal: the transport is still built and the
/// provider's auth failure resolves to the conservative default.
fn build_oracle(cfg: &AppConfig) -> Result<Box<dyn RecommendationOracle>> {
    let api_key = cfg.api_key().unwrap_or_else(|| {
        warn!(env = %cfg.llm.api_key_env, "No LLM API key configured");
        secrecy::SecretString::new(String::new())
    });

    let oracle: Box<dyn RecommendationOracle> = match cfg.llm.provider.as_str() {
        "anthropic" => {
            info!(model = %cfg.llm.model, "Using Anthropic LLM provider");
            Box::new(
                AnthropicClient::new(api_key, Some(cfg.llm.model.clone()), Some(cfg.llm.max_tokens))?
                    .with_temperature(cfg.llm.temperature),
            )
        }
        other => {
            if other != "openrouter" {
                warn!(provider = other, "Unknown LLM provider, defaulting to OpenRouter");
            }
            info!(
                model = %cfg.llm.model,
                fallback = ?cfg.llm.fallback_model,
                "Using OpenRouter LLM provider"
            );
            Box::new(
                OpenRouterClient::new(
                    api_key,
                    Some(cfg.llm.model.clone()),
                    cfg.llm.fallback_model.clone(),
                    Some(cfg.llm.max_tokens),
                )?
                .with_temperature(cfg.llm.temperature)
                .with_site(cfg.llm.site_url.clone(), cfg.llm.site_name.clone()),
            )
        }
    };
    Ok(oracle)
}

/// Initialise the `tracing` subscriber. Logs go to stderr so stdout stays
/// valid JSON.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sentiment_advisor=info"));

    let json_logging = std::env::var("ADVISOR_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

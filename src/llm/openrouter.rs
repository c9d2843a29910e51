//! OpenRouter LLM integration.
//!
//! Routes recommendation requests through OpenRouter's unified API, giving
//! access to multiple model providers with a single API key. Uses the
//! OpenAI-compatible chat completions format.
//!
//! Default model: Gemini 2.0 Flash (cheap, fast, good at strict JSON).
//! An optional fallback model is tried once the primary exhausts its retries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::{OracleRequest, RecommendationOracle};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model via OpenRouter.
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Low temperature keeps the JSON contract more reliable.
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Maximum retries on rate limit / server errors per model attempt.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Cost tables (approximate per-1K-token pricing via OpenRouter)
// ---------------------------------------------------------------------------

/// Returns (input_cost_per_1k, output_cost_per_1k) for known models.
fn model_costs(model: &str) -> (f64, f64) {
    match model {
        m if m.contains("gemini") && m.contains("flash") => (0.0001, 0.0004),
        m if m.contains("claude") && m.contains("sonnet") => (0.003, 0.015),
        m if m.contains("claude") && m.contains("haiku") => (0.0008, 0.004),
        m if m.contains("grok") => (0.003, 0.015),
        m if m.contains("gpt-4o-mini") => (0.00015, 0.0006),
        m if m.contains("gpt-4o") => (0.005, 0.015),
        // Conservative default
        _ => (0.005, 0.015),
    }
}

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Reply message. Some models answer with `"content": null`.
#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenRouterClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    default_model: String,
    fallback_model: Option<String>,
    max_tokens: u32,
    temperature: f32,
    site_url: Option<String>,
    site_name: Option<String>,
    total_cost: AtomicU64, // stored as cost * 1_000_000
    total_calls: AtomicU64,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client.
    ///
    /// - `api_key`: OpenRouter API key.
    /// - `default_model`: Model used when a request carries no override.
    /// - `fallback_model`: Optional model tried after the primary fails.
    /// - `max_tokens`: Max output tokens per request.
    pub fn new(
        api_key: SecretString,
        default_model: Option<String>,
        fallback_model: Option<String>,
        max_tokens: Option<u32>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build OpenRouter HTTP client")?;

        Ok(Self {
            http,
            api_key,
            base_url: OPENROUTER_API_URL.to_string(),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            fallback_model,
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: DEFAULT_TEMPERATURE,
            site_url: None,
            site_name: None,
            total_cost: AtomicU64::new(0),
            total_calls: AtomicU64::new(0),
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Attribution headers (`HTTP-Referer`, `X-Title`) sent with every call.
    pub fn with_site(mut self, url: Option<String>, name: Option<String>) -> Self {
        self.site_url = url;
        self.site_name = name;
        self
    }

    /// Point the client at a different chat-completions endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn build_request(&self, model: &str, request: &OracleRequest) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
        }
    }

    /// Send a chat completion request for a specific model,
    /// with retry + exponential backoff.
    async fn call_model(&self, model: &str, request: &OracleRequest) -> Result<String> {
        let body = self.build_request(model, request);
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, model, "Retrying OpenRouter API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let mut builder = self
                .http
                .post(&self.base_url)
                .header(
                    "Authorization",
                    format!("Bearer {}", self.api_key.expose_secret()),
                )
                .header("Content-Type", "application/json");
            if let Some(url) = &self.site_url {
                builder = builder.header("HTTP-Referer", url);
            }
            if let Some(name) = &self.site_name {
                builder = builder.header("X-Title", name);
            }

            match builder.json(&body).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse OpenRouter response")?;

                        let text = reply_text(&parsed);

                        // Use the actual model returned (may differ from requested)
                        let actual_model = parsed.model.as_deref().unwrap_or(model);
                        let cost = parsed
                            .usage
                            .map(|u| usage_cost(actual_model, &u))
                            .unwrap_or(0.0);

                        self.total_cost
                            .fetch_add((cost * 1_000_000.0) as u64, Ordering::Relaxed);
                        self.total_calls.fetch_add(1, Ordering::Relaxed);

                        info!(
                            model = actual_model,
                            chars = text.len(),
                            cost = format!("${:.5}", cost),
                            "OpenRouter completion received"
                        );
                        return Ok(text);
                    }

                    // Retryable errors: 429 (rate limit), 5xx
                    if status.as_u16() == 429 || status.is_server_error() {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(
                            status = %status,
                            attempt,
                            model,
                            error = %error_text,
                            "Retryable OpenRouter error"
                        );
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    // Non-retryable error
                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("OpenRouter API error {status} (model={model}): {error_text}");
                }
                Err(e) => {
                    warn!(attempt, model, error = %e, "OpenRouter request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "OpenRouter API failed after {} retries (model={}): {}",
            MAX_RETRIES,
            model,
            last_error.unwrap_or_default()
        )
    }

    /// Total cumulative cost across all calls.
    pub fn cumulative_cost(&self) -> f64 {
        self.total_cost.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Total number of successful API calls.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

/// Text of the first choice; empty when the model sent none.
fn reply_text(response: &ChatResponse) -> String {
    response
        .choices
        .first()
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.content.clone())
        .unwrap_or_default()
}

fn usage_cost(model: &str, usage: &ChatUsage) -> f64 {
    let (input_cost, output_cost) = model_costs(model);
    (usage.prompt_tokens as f64 / 1000.0) * input_cost
        + (usage.completion_tokens as f64 / 1000.0) * output_cost
}

// ---------------------------------------------------------------------------
// RecommendationOracle implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl RecommendationOracle for OpenRouterClient {
    async fn complete(&self, request: &OracleRequest) -> Result<String> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        debug!(model, prompt_chars = request.prompt.len(), "Requesting recommendation via OpenRouter");

        match self.call_model(model, request).await {
            Ok(text) => Ok(text),
            Err(primary_err) => match self.fallback_model.as_deref() {
                Some(fallback) if fallback != model => {
                    warn!(
                        primary = model,
                        fallback,
                        error = %primary_err,
                        "Primary model failed, falling back"
                    );
                    self.call_model(fallback, request).await.with_context(|| {
                        format!(
                            "Both primary ({model}) and fallback ({fallback}) models failed. Primary error: {primary_err}"
                        )
                    })
                }
                _ => Err(primary_err),
            },
        }
    }

    fn provider(&self) -> &'static str {
        "openrouter"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

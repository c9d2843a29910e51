//! LLM integration for trading recommendations.
//!
//! Defines the `RecommendationOracle` trait (prompt in, text out) and
//! provides transports for OpenRouter and Anthropic. Everything downstream
//! of the raw reply lives in `engine` so it can be tested with a stub.

pub mod anthropic;
pub mod openrouter;

use anyhow::Result;
use async_trait::async_trait;

/// One text-completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub system: String,
    pub prompt: String,
    /// Model override; the transport's default is used when `None`.
    pub model: Option<String>,
}

/// Abstraction over the external text-generation service.
///
/// Implementors own authentication, retries, and rate limiting. Dropping
/// the returned future cancels the in-flight request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationOracle: Send + Sync {
    /// Send a system instruction and user prompt, returning the raw reply.
    async fn complete(&self, request: &OracleRequest) -> Result<String>;

    /// Provider identifier for logging.
    fn provider(&self) -> &'static str;
}

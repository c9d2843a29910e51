//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so a missing section (or an empty file)
//! yields the stock thresholds. API keys are referenced by env-var name
//! and resolved at runtime.

use anyhow::{Context, Result};
use chrono::Duration;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::engine::gate::GateConfig;
use crate::engine::prompt::DEFAULT_MAX_SAMPLE_TWEETS;
use crate::engine::EngineConfig;
use crate::strategy::rules::RuleConfig;
use crate::strategy::validator::ValidatorConfig;

/// Largest freshness window `chrono::Duration` can represent, in seconds.
const MAX_DATA_AGE_SECS: u64 = (i64::MAX / 1000) as u64;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub gates: GatesConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// `openrouter` or `anthropic`.
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Fallback model for OpenRouter (used when primary model fails).
    pub fallback_model: Option<String>,
    /// Sent as `HTTP-Referer` to OpenRouter.
    pub site_url: Option<String>,
    /// Sent as `X-Title` to OpenRouter.
    pub site_name: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: crate::llm::openrouter::DEFAULT_MODEL.to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            max_tokens: 1000,
            temperature: 0.2,
            fallback_model: None,
            site_url: None,
            site_name: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GatesConfig {
    pub min_total_tweets: u64,
    pub min_crypto_tweets: u64,
    pub max_data_age_secs: u64,
}

impl Default for GatesConfig {
    fn default() -> Self {
        Self {
            min_total_tweets: 50,
            min_crypto_tweets: 20,
            max_data_age_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub confidence_threshold: u8,
    pub high_risk_ceiling: u8,
    pub contradiction_ceiling: u8,
    pub max_sample_tweets: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 60,
            high_risk_ceiling: 80,
            contradiction_ceiling: 40,
            max_sample_tweets: DEFAULT_MAX_SAMPLE_TWEETS,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.rules.confidence_threshold <= 100,
            "rules.confidence_threshold must be at most 100"
        );
        anyhow::ensure!(
            self.rules.high_risk_ceiling <= 100,
            "rules.high_risk_ceiling must be at most 100"
        );
        anyhow::ensure!(
            self.rules.contradiction_ceiling <= 100,
            "rules.contradiction_ceiling must be at most 100"
        );
        anyhow::ensure!(
            self.gates.max_data_age_secs <= MAX_DATA_AGE_SECS,
            "gates.max_data_age_secs is out of range"
        );
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The configured LLM API key, if its env var is set and non-empty.
    pub fn api_key(&self) -> Option<SecretString> {
        Self::resolve_env(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new)
    }

    /// Thresholds for the decision engine.
    pub fn engine_config(&self) -> EngineConfig {
        let max_age_secs = self.gates.max_data_age_secs.min(MAX_DATA_AGE_SECS) as i64;
        EngineConfig {
            gate: GateConfig {
                min_total_tweets: self.gates.min_total_tweets,
                min_crypto_tweets: self.gates.min_crypto_tweets,
                max_data_age: Duration::seconds(max_age_secs),
            },
            validator: ValidatorConfig {
                contradiction_ceiling: self.rules.contradiction_ceiling,
            },
            rules: RuleConfig {
                confidence_threshold: self.rules.confidence_threshold,
                high_risk_ceiling: self.rules.high_risk_ceiling,
            },
            max_sample_tweets: self.rules.max_sample_tweets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.llm.provider, "openrouter");
        assert_eq!(cfg.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let cfg = AppConfig::from_toml(
            r#"
            [llm]
            provider = "anthropic"
            model = "claude-sonnet-4-20250514"
            api_key_env = "ANTHROPIC_API_KEY"

            [gates]
            max_data_age_secs = 900

            [rules]
            confidence_threshold = 70
            "#,
        )
        .unwrap();

        assert_eq!(cfg.llm.provider, "anthropic");
        assert_eq!(cfg.llm.max_tokens, 1000);
        assert_eq!(cfg.gates.min_total_tweets, 50);

        let engine = cfg.engine_config();
        assert_eq!(engine.gate.max_data_age, Duration::minutes(15));
        assert_eq!(engine.rules.confidence_threshold, 70);
        assert_eq!(engine.rules.high_risk_ceiling, 80);
        assert_eq!(engine.validator.contradiction_ceiling, 40);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = AppConfig::from_toml("[rules]\nconfidence_threshold = 150\n").unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load("definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_api_key_absent_when_env_unset() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key_env = "SENTIMENT_ADVISOR_TEST_KEY_THAT_IS_NEVER_SET".into();
        assert!(cfg.api_key().is_none());
    }
}

//! Environment-driven configuration.
//!
//! Loaded once at process start; the core treats every value as fixed for
//! the lifetime of a run. API credentials come from the environment (or a
//! local `.env` file), tunables all have working defaults.

use crate::types::{ResearchError, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Full process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub research: ResearchConfig,
}

/// Credentials and call policy for the remote gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub model: String,
    pub serper_api_key: Option<String>,
    pub serper_url: String,
    pub call_timeout: Duration,
    pub retry_backoff: Duration,
}

/// Pipeline tunables for one research run.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    pub min_sub_questions: usize,
    pub max_sub_questions: usize,
    pub max_search_results: usize,
    pub max_sources_per_query: usize,
    pub max_concurrent_fetches: usize,
    pub global_time_budget: Duration,
    /// Slice of the budget that must remain for the synthesis call;
    /// anything less forces the degraded path.
    pub synthesis_reserve: Duration,
    pub fetch_timeout: Duration,
    pub extract_char_limit: usize,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            min_sub_questions: 2,
            max_sub_questions: 3,
            max_search_results: 6,
            max_sources_per_query: 3,
            max_concurrent_fetches: 5,
            global_time_budget: Duration::from_secs(120),
            synthesis_reserve: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(10),
            extract_char_limit: 1200,
            max_output_tokens: 1500,
            temperature: 0.3,
        }
    }
}

impl Config {
    /// Load from the environment, reading a `.env` file when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let research = ResearchConfig {
            min_sub_questions: parsed_var("MIN_SUB_QUESTIONS", 2)?,
            max_sub_questions: parsed_var("MAX_SUB_QUESTIONS", 3)?,
            max_search_results: parsed_var("MAX_SEARCH_RESULTS", 6)?,
            max_sources_per_query: parsed_var("MAX_SOURCES_PER_QUERY", 3)?,
            max_concurrent_fetches: parsed_var("MAX_CONCURRENT_FETCHES", 5)?,
            global_time_budget: Duration::from_secs(parsed_var("GLOBAL_TIME_BUDGET_SECS", 120)?),
            synthesis_reserve: Duration::from_secs(parsed_var("SYNTHESIS_RESERVE_SECS", 20)?),
            fetch_timeout: Duration::from_secs(parsed_var("FETCH_TIMEOUT_SECS", 10)?),
            extract_char_limit: parsed_var("EXTRACT_CHAR_LIMIT", 1200)?,
            max_output_tokens: parsed_var("MAX_OUTPUT_TOKENS", 1500)?,
            temperature: parsed_var("TEMPERATURE", 0.3)?,
        };
        research.validate()?;

        Ok(Config {
            gateway: GatewayConfig {
                openai_api_key: env::var("OPENAI_API_KEY").ok(),
                openai_api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("SIFT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                serper_api_key: env::var("SERPER_API_KEY").ok(),
                serper_url: env::var("SERPER_URL")
                    .unwrap_or_else(|_| crate::gateway::SerperSearch::DEFAULT_ENDPOINT.to_string()),
                call_timeout: Duration::from_secs(parsed_var("CALL_TIMEOUT_SECS", 30)?),
                retry_backoff: Duration::from_millis(parsed_var("RETRY_BACKOFF_MS", 500)?),
            },
            research,
        })
    }
}

impl GatewayConfig {
    /// The generation API key, required to build the real gateway.
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ResearchError::Configuration("OPENAI_API_KEY not set".to_string()))
    }

    /// The search API key, required to build the real gateway.
    pub fn require_serper_key(&self) -> Result<&str> {
        self.serper_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ResearchError::Configuration("SERPER_API_KEY not set".to_string()))
    }
}

impl ResearchConfig {
    /// Reject bound combinations the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.min_sub_questions < 1 {
            return Err(ResearchError::Configuration(
                "MIN_SUB_QUESTIONS must be at least 1".to_string(),
            ));
        }
        if self.min_sub_questions > self.max_sub_questions {
            return Err(ResearchError::Configuration(format!(
                "MIN_SUB_QUESTIONS ({}) exceeds MAX_SUB_QUESTIONS ({})",
                self.min_sub_questions, self.max_sub_questions
            )));
        }
        if self.max_sources_per_query == 0 || self.max_search_results == 0 {
            return Err(ResearchError::Configuration(
                "search and source caps must be nonzero".to_string(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ResearchError::Configuration(
                "MAX_CONCURRENT_FETCHES must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parsed_var<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ResearchError::Configuration(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_are_valid() {
        assert!(ResearchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_minimum() {
        let config = ResearchConfig {
            min_sub_questions: 0,
            ..ResearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = ResearchConfig {
            min_sub_questions: 5,
            max_sub_questions: 2,
            ..ResearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_fetch_concurrency() {
        let config = ResearchConfig {
            max_concurrent_fetches: 0,
            ..ResearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_keys_are_reported() {
        let config = GatewayConfig {
            openai_api_key: None,
            openai_api_base: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            serper_api_key: Some(String::new()),
            serper_url: "https://google.serper.dev/search".into(),
            call_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(500),
        };
        assert!(config.require_openai_key().is_err());
        assert!(config.require_serper_key().is_err());
    }
}

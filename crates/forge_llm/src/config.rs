//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Attempts per request for transient failures.
    pub max_retries: u32,
    /// Backoff before retry `n` is `retry_delay_ms * 2^n`.
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_tokens: None,
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Defaults overridden by `OPENAI_API_KEY`, `FORGE_LLM_MODEL` and
    /// `FORGE_LLM_BASE_URL`.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply environment overrides on top of `self`.
    pub fn merge_env(mut self) -> Self {
        if let Some(key) = non_empty_var("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty_var("FORGE_LLM_MODEL") {
            self.model = model;
        }
        if let Some(url) = non_empty_var("FORGE_LLM_BASE_URL") {
            self.base_url = url;
        }
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// The API key, or [`LlmError::NotConfigured`] when it is missing.
    pub fn require_api_key(&self) -> LlmResult<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(LlmError::NotConfigured(
                "set OPENAI_API_KEY or pass an API key in the configuration".to_string(),
            )),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(
            config.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let config = LlmConfig::default();
        assert!(matches!(
            config.require_api_key(),
            Err(LlmError::NotConfigured(_))
        ));

        let config = config.with_api_key("sk-test");
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = LlmConfig::default()
            .with_api_key("sk-secret")
            .with_base_url("http://localhost:8080/v1/");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}

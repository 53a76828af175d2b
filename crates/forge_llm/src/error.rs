//! Error types for LLM calls.

use thiserror::Error;

/// Result type alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur while talking to a model.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Structured output for '{name}' did not match the schema: {message}")]
    Decode { name: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    pub fn decode(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

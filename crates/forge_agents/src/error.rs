//! Error types for the agents.

use thiserror::Error;

use forge_core::CoreError;
use forge_llm::LlmError;
use forge_tools::ToolError;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while an agent runs.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Architecture failed: {0}")]
    Architecture(String),

    #[error("Step {index} ({filepath}) failed after {attempts} attempt(s): {message}")]
    StepFailed {
        index: usize,
        filepath: String,
        attempts: u32,
        message: String,
    },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl AgentError {
    pub fn planning(message: impl Into<String>) -> Self {
        Self::Planning(message.into())
    }

    pub fn architecture(message: impl Into<String>) -> Self {
        Self::Architecture(message.into())
    }

    /// Whether the failure happened before any code was written.
    pub fn is_design_failure(&self) -> bool {
        matches!(self, Self::Planning(_) | Self::Architecture(_))
    }
}

//! Error types for the core module.

use thiserror::Error;

use crate::stage::StageId;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed error raised by a stage implementation.
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Stage not registered: {0}")]
    StageNotFound(StageId),

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: StageId,
        #[source]
        source: StageError,
    },

    #[error("Recursion limit of {limit} reached without hitting a stop condition")]
    RecursionLimit { limit: usize },

    #[error("Missing pipeline state: {0}")]
    MissingState(&'static str),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid task plan: {0}")]
    InvalidTaskPlan(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Wrap an error raised inside a stage.
    pub fn stage_failed(stage: StageId, source: impl Into<StageError>) -> Self {
        Self::StageFailed {
            stage,
            source: source.into(),
        }
    }

    /// The stage that failed, if this error came from one.
    pub fn failed_stage(&self) -> Option<StageId> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

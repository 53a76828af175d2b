//! Stage definitions and routing.
//!
//! A run is a fixed graph of three stages:
//!
//! ```text
//! planner ──▶ architect ──▶ coder ──▶ END
//!                             ▲  │
//!                             └──┘ (while steps remain)
//! ```
//!
//! Routing is a plain function of the pipeline state, see [`route_after`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::state::PipelineState;

/// Stage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Planner,
    Architect,
    Coder,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Planner => "planner",
            StageId::Architect => "architect",
            StageId::Coder => "coder",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StageId::Planner => "Turns the request into a project plan",
            StageId::Architect => "Breaks the plan into ordered implementation steps",
            StageId::Coder => "Implements one step per invocation with file tools",
        }
    }

    /// The stage every run starts with.
    pub fn entry() -> Self {
        StageId::Planner
    }

    pub fn all() -> Vec<Self> {
        vec![StageId::Planner, StageId::Architect, StageId::Coder]
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where control goes after a stage returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Stage(StageId),
    End,
}

/// True once the coder has consumed every step.
pub fn is_terminal(state: &PipelineState) -> bool {
    state.is_done()
        || state
            .coder_state
            .as_ref()
            .map_or(false, |coder| coder.is_done())
}

/// Decide the next stage after `stage` has run against `state`.
pub fn route_after(stage: StageId, state: &PipelineState) -> Route {
    match stage {
        StageId::Planner => Route::Stage(StageId::Architect),
        StageId::Architect => Route::Stage(StageId::Coder),
        StageId::Coder if is_terminal(state) => Route::End,
        StageId::Coder => Route::Stage(StageId::Coder),
    }
}

/// Trait for stage implementations.
///
/// A stage receives exclusive access to the pipeline state for the duration
/// of one invocation. Any error aborts the whole run.
#[async_trait]
pub trait Stage: Send + Sync {
    /// The stage this implementation handles.
    fn id(&self) -> StageId;

    /// Run one invocation.
    async fn execute(&self, state: &mut PipelineState) -> Result<(), StageError>;
}

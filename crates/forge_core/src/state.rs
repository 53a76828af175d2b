//! Pipeline state threaded through every stage of a run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{ImplementationStep, Plan, StepOutcome, TaskPlan};

/// Overall status of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    #[default]
    Pending,
    Running,
    Done,
}

/// Iteration cursor over a [`TaskPlan`].
///
/// `current_step_idx` is the only progress marker. It moves forward by one per
/// coder invocation and never exceeds the step count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoderState {
    pub task_plan: Arc<TaskPlan>,
    pub current_step_idx: usize,
    pub outcomes: Vec<StepOutcome>,
}

impl CoderState {
    pub fn new(task_plan: Arc<TaskPlan>) -> Self {
        Self {
            task_plan,
            current_step_idx: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.task_plan.len()
    }

    /// Terminal once every step has been consumed.
    pub fn is_done(&self) -> bool {
        self.current_step_idx >= self.step_count()
    }

    /// The step the next invocation will work on.
    pub fn current_step(&self) -> Option<&ImplementationStep> {
        self.task_plan.step(self.current_step_idx)
    }

    /// Record the outcome of the current step and move to the next one.
    ///
    /// Does nothing once the state is terminal.
    pub fn advance(&mut self, outcome: StepOutcome) {
        if self.is_done() {
            return;
        }
        self.outcomes.push(outcome);
        self.current_step_idx += 1;
    }

    pub fn remaining(&self) -> usize {
        self.step_count().saturating_sub(self.current_step_idx)
    }
}

/// Mutable state owned by the stage currently executing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub run_id: Uuid,
    pub user_prompt: String,
    pub plan: Option<Arc<Plan>>,
    pub task_plan: Option<Arc<TaskPlan>>,
    pub coder_state: Option<CoderState>,
    pub status: PipelineStatus,
    /// Stage invocations performed so far.
    pub invocations: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_prompt: user_prompt.into(),
            plan: None,
            task_plan: None,
            coder_state: None,
            status: PipelineStatus::Pending,
            invocations: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == PipelineStatus::Done
    }

    pub fn require_plan(&self) -> CoreResult<Arc<Plan>> {
        self.plan
            .clone()
            .ok_or(CoreError::MissingState("plan must be computed before the task plan"))
    }

    pub fn require_task_plan(&self) -> CoreResult<Arc<TaskPlan>> {
        self.task_plan
            .clone()
            .ok_or(CoreError::MissingState("task plan must be computed before coding"))
    }

    /// The coder cursor, created from the task plan on first use.
    pub fn coder_state_mut(&mut self) -> CoreResult<&mut CoderState> {
        if self.coder_state.is_none() {
            let task_plan = self.require_task_plan()?;
            self.coder_state = Some(CoderState::new(task_plan));
        }
        self.coder_state
            .as_mut()
            .ok_or(CoreError::MissingState("coder state"))
    }

    /// Outcomes recorded so far, in step order.
    pub fn outcomes(&self) -> &[StepOutcome] {
        self.coder_state
            .as_ref()
            .map(|c| c.outcomes.as_slice())
            .unwrap_or(&[])
    }
}

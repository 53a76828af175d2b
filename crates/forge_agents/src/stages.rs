//! [`Stage`] implementations wiring the agents into the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use forge_core::{PipelineState, PipelineStatus, Stage, StageError, StageId};

use crate::architect::ArchitectAgent;
use crate::coder::CoderAgent;
use crate::planner::PlannerAgent;

pub struct PlannerStage {
    agent: PlannerAgent,
}

impl PlannerStage {
    pub fn new(agent: PlannerAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Stage for PlannerStage {
    fn id(&self) -> StageId {
        StageId::Planner
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let plan = self.agent.plan(&state.user_prompt).await?;
        state.plan = Some(Arc::new(plan));
        Ok(())
    }
}

pub struct ArchitectStage {
    agent: ArchitectAgent,
}

impl ArchitectStage {
    pub fn new(agent: ArchitectAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Stage for ArchitectStage {
    fn id(&self) -> StageId {
        StageId::Architect
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let plan = state.require_plan()?;
        let task_plan = self.agent.design(plan).await?;
        state.task_plan = Some(Arc::new(task_plan));
        state.coder_state = None;
        Ok(())
    }
}

/// Runs one implementation step per invocation.
pub struct CoderStage {
    agent: CoderAgent,
}

impl CoderStage {
    pub fn new(agent: CoderAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Stage for CoderStage {
    fn id(&self) -> StageId {
        StageId::Coder
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let coder = state.coder_state_mut()?;
        let status = self.agent.step(coder).await?;

        if status == PipelineStatus::Done {
            debug!("Coder reports done");
            state.status = PipelineStatus::Done;
        }
        Ok(())
    }
}

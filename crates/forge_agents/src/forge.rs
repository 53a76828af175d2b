//! Entry point tying the agents, tools and executor together.

use std::sync::Arc;

use tracing::info;

use forge_core::{CoreResult, PipelineExecutor, PipelineState, StageRegistry, TaskPlan};
use forge_llm::{LlmClient, TracedLlm};
use forge_tools::ToolBox;

use crate::architect::ArchitectAgent;
use crate::coder::{CoderAgent, CoderConfig};
use crate::error::AgentResult;
use crate::planner::PlannerAgent;
use crate::stages::{ArchitectStage, CoderStage, PlannerStage};

/// Registry with the planner, architect and coder stages.
pub fn build_registry(
    llm: Arc<dyn LlmClient>,
    tools: ToolBox,
    coder: CoderConfig,
) -> StageRegistry {
    StageRegistry::new()
        .with_stage(Arc::new(PlannerStage::new(PlannerAgent::new(llm.clone()))))
        .with_stage(Arc::new(ArchitectStage::new(ArchitectAgent::new(llm.clone()))))
        .with_stage(Arc::new(CoderStage::new(CoderAgent::with_config(
            llm, tools, coder,
        ))))
}

/// The planner → architect → coder pipeline.
///
/// Every model call goes through [`TracedLlm`], so runs are logged without
/// the client having to do it.
pub struct Forge {
    llm: Arc<dyn LlmClient>,
    tools: ToolBox,
    executor: PipelineExecutor,
}

impl Forge {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolBox) -> Self {
        Self::with_config(llm, tools, CoderConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmClient>, tools: ToolBox, coder: CoderConfig) -> Self {
        let llm: Arc<dyn LlmClient> = Arc::new(TracedLlm::new(llm));
        let registry = build_registry(llm.clone(), tools.clone(), coder);
        Self {
            llm,
            tools,
            executor: PipelineExecutor::new(Arc::new(registry)),
        }
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// Run the whole pipeline for `prompt`.
    pub async fn run(
        &self,
        prompt: impl Into<String>,
        recursion_limit: usize,
    ) -> CoreResult<PipelineState> {
        self.run_state(PipelineState::new(prompt), recursion_limit).await
    }

    /// Run the pipeline on a state the caller created, so its `run_id` is
    /// known even if the run fails.
    pub async fn run_state(
        &self,
        state: PipelineState,
        recursion_limit: usize,
    ) -> CoreResult<PipelineState> {
        info!(model = self.llm.model(), run_id = %state.run_id, "Forging: {}", state.user_prompt);
        self.executor.run(state, recursion_limit).await
    }
}

/// Run only the planner and architect for `prompt`; nothing is written.
pub async fn design(llm: Arc<dyn LlmClient>, prompt: &str) -> AgentResult<TaskPlan> {
    let llm: Arc<dyn LlmClient> = Arc::new(TracedLlm::new(llm));
    let plan = PlannerAgent::new(llm.clone()).plan(prompt).await?;
    ArchitectAgent::new(llm).design(Arc::new(plan)).await
}

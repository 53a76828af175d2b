//! # forge_agents
//!
//! LLM-backed stages for the codeforge pipeline.
//!
//! | Agent | Stage | Output |
//! |-------|-------|--------|
//! | [`PlannerAgent`] | [`PlannerStage`] | [`Plan`](forge_core::Plan) |
//! | [`ArchitectAgent`] | [`ArchitectStage`] | [`TaskPlan`](forge_core::TaskPlan) |
//! | [`CoderAgent`] | [`CoderStage`] | one file per step, via tools |
//!
//! [`Forge`] wires them into a [`PipelineExecutor`](forge_core::PipelineExecutor):
//!
//! ```rust,ignore
//! let tools = ToolBox::new(ProjectRoot::in_cwd("generated_project")?);
//! let forge = Forge::new(Arc::new(OpenAiClient::from_env()?), tools);
//! let state = forge.run("Build a colourful todo app", 100).await?;
//! ```

pub mod architect;
pub mod coder;
pub mod error;
pub mod forge;
pub mod planner;
pub mod prompts;
pub mod react;
pub mod stages;

pub use architect::ArchitectAgent;
pub use coder::{CoderAgent, CoderConfig, FailurePolicy};
pub use error::{AgentError, AgentResult};
pub use forge::{build_registry, design, Forge};
pub use planner::PlannerAgent;
pub use react::{AgentTranscript, ToolCallingAgent, DEFAULT_MAX_TOOL_TURNS};
pub use stages::{ArchitectStage, CoderStage, PlannerStage};

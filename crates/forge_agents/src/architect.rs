//! Architect agent: [`Plan`] to [`TaskPlan`].

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use forge_core::{ImplementationStep, Plan, TaskPlan};
use forge_llm::{structured_output, ChatMessage, LlmClient, LlmError, StructuredMethod};

use crate::error::{AgentError, AgentResult};
use crate::prompts::architect_prompt;

/// What the model is asked to return. The plan itself is attached
/// afterwards, so anything the model echoes back for it is ignored.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename = "TaskPlan")]
struct TaskPlanDraft {
    /// A list of steps to be taken to implement the task
    implementation_steps: Vec<ImplementationStep>,
}

/// Breaks a plan down into ordered implementation steps.
pub struct ArchitectAgent {
    llm: Arc<dyn LlmClient>,
}

impl ArchitectAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Produce a validated task plan whose embedded plan is `plan`.
    pub async fn design(&self, plan: Arc<Plan>) -> AgentResult<TaskPlan> {
        let messages = vec![ChatMessage::user(architect_prompt(&plan))];

        let draft = match structured_output::<TaskPlanDraft>(
            self.llm.as_ref(),
            messages,
            StructuredMethod::FunctionCalling,
        )
        .await
        {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                return Err(AgentError::architecture(
                    "Architect did not return a valid response.",
                ))
            }
            Err(LlmError::Decode { message, .. }) => {
                return Err(AgentError::architecture(format!(
                    "malformed task plan: {}",
                    message
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let task_plan = TaskPlan::new(plan, draft.implementation_steps);
        task_plan
            .validate()
            .map_err(|e| AgentError::architecture(e.to_string()))?;

        let undeclared = task_plan.undeclared_paths();
        if !undeclared.is_empty() {
            warn!(
                "Task plan targets files the plan never declared: {}",
                undeclared.join(", ")
            );
        }

        info!(steps = task_plan.len(), "Task plan ready");
        Ok(task_plan)
    }
}
